use std::{fmt, str::FromStr};

use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const BANKS: [&str; 10] = [
    "Access Bank",
    "Ecobank Nigeria",
    "Fidelity Bank",
    "First Bank of Nigeria",
    "Guaranty Trust Bank",
    "Stanbic IBTC Bank",
    "Sterling Bank",
    "United Bank for Africa",
    "Wema Bank",
    "Zenith Bank",
];

pub const ACCOUNT_NUMBER_LEN: usize = 10;

/// In-progress transfer input. Fields hold raw user input; nothing is parsed
/// until the draft is validated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TransferDraft {
    pub bank: String,
    pub account_number: String,
    pub amount: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum FieldError {
    #[display("Please select a bank")]
    BankNotSelected,
    #[display("Bank is not in the list of supported banks")]
    UnknownBank,
    #[display("Account number must be exactly 10 digits")]
    AccountNumberLength,
    #[display("Account number must be digits only")]
    AccountNumberNotNumeric,
    #[display("Amount must be greater than 0")]
    AmountNotPositive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldErrors(pub Vec<FieldError>);

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join("; "))
    }
}

/// The `(account number, bank)` pair a recipient lookup is keyed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupKey {
    pub account_number: String,
    pub bank: String,
}

impl TransferDraft {
    /// Every field error, in form order. Empty when the draft can advance.
    pub fn field_errors(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if self.bank.is_empty() {
            errors.push(FieldError::BankNotSelected);
        } else if !BANKS.contains(&self.bank.as_str()) {
            errors.push(FieldError::UnknownBank);
        }

        if self.account_number.chars().count() != ACCOUNT_NUMBER_LEN {
            errors.push(FieldError::AccountNumberLength);
        }
        if !is_all_digits(&self.account_number) {
            errors.push(FieldError::AccountNumberNotNumeric);
        }

        if self.parsed_amount().is_none() {
            errors.push(FieldError::AmountNotPositive);
        }

        errors
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let errors = self.field_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(FieldErrors(errors))
        }
    }

    /// The amount as a strictly positive decimal, if the input allows it.
    pub fn parsed_amount(&self) -> Option<Decimal> {
        parse_amount(&self.amount).filter(|amount| *amount > Decimal::ZERO)
    }

    /// Present only when the pair has the shape a lookup accepts.
    pub fn lookup_key(&self) -> Option<LookupKey> {
        let shaped = self.account_number.len() == ACCOUNT_NUMBER_LEN
            && is_all_digits(&self.account_number)
            && !self.bank.is_empty();

        shaped.then(|| LookupKey {
            account_number: self.account_number.clone(),
            bank: self.bank.clone(),
        })
    }

    pub fn masked_account_number(&self) -> String {
        mask_account_number(&self.account_number)
    }
}

fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn parse_amount(input: &str) -> Option<Decimal> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

pub fn mask_account_number(account_number: &str) -> String {
    let chars: Vec<char> = account_number.chars().collect();
    let visible = chars.len().min(4);
    let hidden = chars.len() - visible;

    "*".repeat(hidden) + &chars[hidden..].iter().collect::<String>()
}
