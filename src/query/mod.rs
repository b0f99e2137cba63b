pub mod receipt;
pub mod workflow;
