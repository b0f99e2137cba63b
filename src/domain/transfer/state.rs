use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::domain::{
    props::{Amount, RequestId},
    transfer::draft::TransferDraft,
};

pub const OTP_TTL_SECONDS: u32 = 300;
pub const OTP_CODE_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum Step {
    Details,
    Otp,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum ResolutionFailure {
    #[display("No account holder found for these details")]
    NotFound,
    #[display("Recipient lookup unavailable: {_0}")]
    Unavailable(String),
}

/// Recipient name lookup for the current `(account number, bank)` pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum RecipientResolution {
    #[default]
    Absent,
    Resolving {
        request_id: RequestId,
    },
    Resolved {
        request_id: RequestId,
        name: String,
    },
    Failed {
        request_id: RequestId,
        failure: ResolutionFailure,
    },
}

impl RecipientResolution {
    pub fn is_resolving(&self) -> bool {
        matches!(self, RecipientResolution::Resolving { .. })
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            RecipientResolution::Resolved { name, .. } => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub request_id: RequestId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtpChallenge {
    pub code: String,
    pub remaining_seconds: u32,
    pub is_submitting: bool,
    pub rejection: Option<String>,
}

impl OtpChallenge {
    pub fn issue(ttl_seconds: u32) -> Self {
        OtpChallenge {
            code: String::new(),
            remaining_seconds: ttl_seconds,
            is_submitting: false,
            rejection: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_seconds == 0
    }

    pub fn can_submit(&self) -> bool {
        self.code.len() == OTP_CODE_LEN && !self.is_submitting && !self.is_expired()
    }

    /// `m:ss` as shown next to the input.
    pub fn expires_in(&self) -> String {
        format!(
            "{}:{:02}",
            self.remaining_seconds / 60,
            self.remaining_seconds % 60
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub reference: String,
    pub amount: Amount,
    pub recipient: String,
    pub bank: String,
    pub account_number: String,
    pub masked_account_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkflowState {
    Details {
        draft: TransferDraft,
        resolution: RecipientResolution,
    },
    Otp {
        draft: TransferDraft,
        recipient: Recipient,
        challenge: OtpChallenge,
    },
    Success {
        draft: TransferDraft,
        recipient: Recipient,
        receipt: TransferReceipt,
    },
}

impl Default for WorkflowState {
    fn default() -> Self {
        WorkflowState::Details {
            draft: TransferDraft::default(),
            resolution: RecipientResolution::Absent,
        }
    }
}

impl WorkflowState {
    pub fn step(&self) -> Step {
        match self {
            WorkflowState::Details { .. } => Step::Details,
            WorkflowState::Otp { .. } => Step::Otp,
            WorkflowState::Success { .. } => Step::Success,
        }
    }

    pub fn draft(&self) -> &TransferDraft {
        match self {
            WorkflowState::Details { draft, .. }
            | WorkflowState::Otp { draft, .. }
            | WorkflowState::Success { draft, .. } => draft,
        }
    }

    /// Whether the Details step may advance: valid draft, resolved name and
    /// no lookup in flight.
    pub fn can_proceed(&self) -> bool {
        match self {
            WorkflowState::Details { draft, resolution } => {
                draft.validate().is_ok()
                    && resolution.name().is_some()
                    && !resolution.is_resolving()
            }
            _ => false,
        }
    }

    pub fn challenge(&self) -> Option<&OtpChallenge> {
        match self {
            WorkflowState::Otp { challenge, .. } => Some(challenge),
            _ => None,
        }
    }

    pub fn receipt(&self) -> Option<&TransferReceipt> {
        match self {
            WorkflowState::Success { receipt, .. } => Some(receipt),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(draft: TransferDraft, resolution: RecipientResolution) -> WorkflowState {
        WorkflowState::Details { draft, resolution }
    }

    fn valid_draft() -> TransferDraft {
        TransferDraft {
            bank: "Wema Bank".to_owned(),
            account_number: "0123456789".to_owned(),
            amount: "100".to_owned(),
        }
    }

    fn resolved() -> RecipientResolution {
        RecipientResolution::Resolved {
            request_id: RequestId(1),
            name: "Ngozi Nwosu".to_owned(),
        }
    }

    #[test]
    fn proceed_needs_valid_draft_and_resolved_name() {
        assert!(details(valid_draft(), resolved()).can_proceed());

        assert!(!details(valid_draft(), RecipientResolution::Absent).can_proceed());
        assert!(
            !details(
                valid_draft(),
                RecipientResolution::Resolving {
                    request_id: RequestId(2)
                }
            )
            .can_proceed()
        );
        assert!(
            !details(
                valid_draft(),
                RecipientResolution::Failed {
                    request_id: RequestId(1),
                    failure: ResolutionFailure::NotFound,
                }
            )
            .can_proceed()
        );

        let mut zero_amount = valid_draft();
        zero_amount.amount = "0".to_owned();
        assert!(!details(zero_amount, resolved()).can_proceed());
    }

    #[test]
    fn resolving_never_exposes_a_name() {
        let resolving = RecipientResolution::Resolving {
            request_id: RequestId(3),
        };

        assert!(resolving.is_resolving());
        assert_eq!(resolving.name(), None);
        assert!(!resolved().is_resolving());
        assert_eq!(resolved().name(), Some("Ngozi Nwosu"));
    }

    #[test]
    fn challenge_submission_rules() {
        let mut challenge = OtpChallenge::issue(OTP_TTL_SECONDS);
        assert!(!challenge.can_submit());
        assert_eq!(challenge.expires_in(), "5:00");

        challenge.code = "123456".to_owned();
        assert!(challenge.can_submit());

        challenge.remaining_seconds = 0;
        assert!(challenge.is_expired());
        assert!(!challenge.can_submit());
        assert_eq!(challenge.expires_in(), "0:00");
    }
}
