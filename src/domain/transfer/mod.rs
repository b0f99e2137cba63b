pub mod aggregate;
pub mod command;
pub mod draft;
pub mod error;
pub mod event;
pub mod state;
