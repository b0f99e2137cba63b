use derive_more::Display;

use crate::domain::transfer::{draft::FieldErrors, state::Step};

#[derive(Debug, PartialEq, Display)]
pub enum TransferError {
    #[display("Action not available in the {_0} step")]
    WrongStep(Step),
    #[display("Transfer details are invalid: {_0}")]
    InvalidDraft(FieldErrors),
    #[display("Recipient name has not been resolved")]
    RecipientUnresolved,
    #[display("Recipient lookup still in progress")]
    RecipientLookupPending,
    #[display("OTP must be 6 digits")]
    IncompleteOtp,
    #[display("OTP has expired")]
    OtpExpired,
    #[display("OTP confirmation already in progress")]
    OtpSubmissionInProgress,
    #[display("Transfer workflow has already been closed")]
    WorkflowDiscarded,
}

impl std::error::Error for TransferError {}
