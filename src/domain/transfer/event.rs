use cqrs_es::DomainEvent;
use serde::{Deserialize, Serialize};

use crate::domain::{
    props::RequestId,
    transfer::{
        draft::TransferDraft,
        state::{ResolutionFailure, TransferReceipt},
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum TransferEvent {
    DraftEdited(DraftEditedPayload),
    RecipientLookupStarted(RecipientLookupStartedPayload),
    RecipientCleared,
    RecipientResolved(RecipientResolvedPayload),
    RecipientLookupFailed(RecipientLookupFailedPayload),
    OtpChallengeIssued(OtpChallengeIssuedPayload),
    OtpCountdownTicked(OtpCountdownTickedPayload),
    OtpCodeEntered(OtpCodeEnteredPayload),
    OtpSubmitted(OtpSubmittedPayload),
    OtpRejected(OtpRejectedPayload),
    OtpCancelled,
    TransferCompleted(TransferCompletedPayload),
    ReceiptAcknowledged,
    TransferAbandoned,
}

impl DomainEvent for TransferEvent {
    fn event_type(&self) -> String {
        let event_type: &str = match self {
            TransferEvent::DraftEdited(_) => "DraftEdited",
            TransferEvent::RecipientLookupStarted(_) => "RecipientLookupStarted",
            TransferEvent::RecipientCleared => "RecipientCleared",
            TransferEvent::RecipientResolved(_) => "RecipientResolved",
            TransferEvent::RecipientLookupFailed(_) => "RecipientLookupFailed",
            TransferEvent::OtpChallengeIssued(_) => "OtpChallengeIssued",
            TransferEvent::OtpCountdownTicked(_) => "OtpCountdownTicked",
            TransferEvent::OtpCodeEntered(_) => "OtpCodeEntered",
            TransferEvent::OtpSubmitted(_) => "OtpSubmitted",
            TransferEvent::OtpRejected(_) => "OtpRejected",
            TransferEvent::OtpCancelled => "OtpCancelled",
            TransferEvent::TransferCompleted(_) => "TransferCompleted",
            TransferEvent::ReceiptAcknowledged => "ReceiptAcknowledged",
            TransferEvent::TransferAbandoned => "TransferAbandoned",
        };
        event_type.to_string()
    }

    fn event_version(&self) -> String {
        "1.0".to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DraftEditedPayload {
    pub draft: TransferDraft,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipientLookupStartedPayload {
    pub request_id: RequestId,
    pub account_number: String,
    pub bank: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipientResolvedPayload {
    pub request_id: RequestId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipientLookupFailedPayload {
    pub request_id: RequestId,
    pub failure: ResolutionFailure,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OtpChallengeIssuedPayload {
    pub expires_in_seconds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OtpCountdownTickedPayload {
    pub remaining_seconds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OtpCodeEnteredPayload {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OtpSubmittedPayload {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OtpRejectedPayload {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferCompletedPayload {
    pub receipt: TransferReceipt,
}
