use tracing::info;

/// Page-level navigation the transfer flow hands control back to.
pub trait Navigator: Send + Sync {
    fn to_transactions(&self);
    fn back(&self);
}

pub struct LogNavigator {}

impl Navigator for LogNavigator {
    fn to_transactions(&self) {
        info!("Navigating to transactions list");
    }

    fn back(&self) {
        info!("Navigating back");
    }
}
