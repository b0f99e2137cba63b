pub mod error;
pub mod log;
pub mod record;
pub mod view;
