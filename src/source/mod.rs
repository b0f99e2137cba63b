use async_trait::async_trait;

use crate::domain::feed::{error::FeedError, log::TransactionLogEntry};

pub mod file;
pub mod http;

/// Read side of the transaction log. One call, no parameters.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn fetch_logs(&self) -> Result<Vec<TransactionLogEntry>, FeedError>;
}
