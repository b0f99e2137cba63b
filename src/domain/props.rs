use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shrinkwraprs::Shrinkwrap;

#[derive(Shrinkwrap, Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Display, Hash)]
pub struct WorkflowId(pub String);

#[derive(Shrinkwrap, Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Display, Hash)]
pub struct Amount(pub Decimal);

// Generation token attached to every recipient lookup.
#[derive(
    Shrinkwrap, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Display, Hash,
)]
pub struct RequestId(pub u64);

impl RequestId {
    pub fn next(self) -> Self {
        RequestId(self.0 + 1)
    }
}

impl WorkflowId {
    pub fn generate() -> Self {
        WorkflowId(format!("Transfer-{}", uuid::Uuid::new_v4()))
    }
}
