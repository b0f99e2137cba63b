use serde::Deserialize;

use crate::domain::{
    props::RequestId,
    transfer::state::ResolutionFailure,
};

#[derive(Debug, Clone, Deserialize)]
pub enum TransferCommand {
    SelectBank(SelectBankPayload),
    EnterAccountNumber(EnterAccountNumberPayload),
    EnterAmount(EnterAmountPayload),
    CompleteRecipientLookup(CompleteRecipientLookupPayload),
    ProceedToOtp,
    TickOtpCountdown,
    EnterOtpCode(EnterOtpCodePayload),
    SubmitOtp,
    CompleteOtpConfirmation(CompleteOtpConfirmationPayload),
    CancelOtp,
    AcknowledgeReceipt,
    AbandonTransfer,
}

impl TransferCommand {
    /// Commands issued by background jobs rather than by the user. They may
    /// arrive after the state they target has moved on.
    pub fn is_completion(&self) -> bool {
        matches!(
            self,
            TransferCommand::CompleteRecipientLookup(_)
                | TransferCommand::TickOtpCountdown
                | TransferCommand::CompleteOtpConfirmation(_)
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectBankPayload {
    pub bank: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnterAccountNumberPayload {
    pub account_number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnterAmountPayload {
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum LookupOutcome {
    Found(String),
    Failed(ResolutionFailure),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompleteRecipientLookupPayload {
    pub request_id: RequestId,
    pub outcome: LookupOutcome,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnterOtpCodePayload {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum ConfirmationOutcome {
    Confirmed { reference: String },
    Rejected { reason: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompleteOtpConfirmationPayload {
    pub outcome: ConfirmationOutcome,
}
