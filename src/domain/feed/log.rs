use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::feed::error::FeedError;

/// One row of the micro-debit log as the transaction service sends it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionLogEntry {
    pub narration: String,
    pub amount: Decimal,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionLogResponse {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<Vec<TransactionLogEntry>>,
}

impl TransactionLogResponse {
    /// Entries of a successful response. `status: false` or a missing `data`
    /// field is a failure whatever the message says.
    pub fn into_entries(self) -> Result<Vec<TransactionLogEntry>, FeedError> {
        match (self.status, self.data) {
            (true, Some(entries)) => Ok(entries),
            _ => Err(FeedError::Rejected(self.message)),
        }
    }
}
