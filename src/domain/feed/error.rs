use derive_more::Display;

#[derive(Debug, Clone, PartialEq, Display)]
pub enum FeedError {
    #[display("Could not reach transaction service: {_0}")]
    Transport(String),
    #[display("Transaction service returned {_0}")]
    Status(u16),
    #[display("Transaction service rejected the request: {_0}")]
    Rejected(String),
    #[display("Could not read transaction log: {_0}")]
    Malformed(String),
    #[display("Transaction totals are out of range")]
    TotalsOverflow,
}

impl std::error::Error for FeedError {}
