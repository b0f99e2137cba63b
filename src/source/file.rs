use async_trait::async_trait;

use crate::{
    csv,
    domain::feed::{error::FeedError, log::TransactionLogEntry},
    source::TransactionSource,
};

/// Transaction log exported to CSV with `narration,amount,createdAt` columns.
pub struct CsvTransactionSource {
    file_path: String,
}

impl CsvTransactionSource {
    pub fn new(file_path: impl Into<String>) -> Self {
        CsvTransactionSource {
            file_path: file_path.into(),
        }
    }
}

#[async_trait]
impl TransactionSource for CsvTransactionSource {
    async fn fetch_logs(&self) -> Result<Vec<TransactionLogEntry>, FeedError> {
        let file_path = self.file_path.clone();

        tokio::task::spawn_blocking(move || {
            csv::read_input::<TransactionLogEntry>(&file_path)
                .map_err(|e| FeedError::Malformed(e.to_string()))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| FeedError::Malformed(e.to_string()))
        })
        .await
        .map_err(|e| FeedError::Transport(e.to_string()))?
    }
}
