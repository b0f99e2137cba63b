use async_trait::async_trait;
use color_eyre::eyre::Result;
use reqwest::{Client, header::CONTENT_TYPE};
use tracing::{debug, warn};

use crate::{
    config::ApiSettings,
    domain::feed::{
        error::FeedError,
        log::{TransactionLogEntry, TransactionLogResponse},
    },
    source::TransactionSource,
};

pub struct HttpTransactionSource {
    client: Client,
    url: String,
    access_token: Option<String>,
}

impl HttpTransactionSource {
    pub fn new(api: &ApiSettings) -> Result<Self> {
        let client = Client::builder().timeout(api.timeout()).build()?;

        Ok(HttpTransactionSource {
            client,
            url: api.logs_url(),
            access_token: api.access_token.clone(),
        })
    }
}

#[async_trait]
impl TransactionSource for HttpTransactionSource {
    async fn fetch_logs(&self) -> Result<Vec<TransactionLogEntry>, FeedError> {
        debug!("Fetching transaction log from {}", self.url);

        let mut request = self
            .client
            .get(&self.url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Transaction log request failed with {}", status);
            return Err(FeedError::Status(status.as_u16()));
        }

        response
            .json::<TransactionLogResponse>()
            .await
            .map_err(|e| FeedError::Malformed(e.to_string()))?
            .into_entries()
    }
}
