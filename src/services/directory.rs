use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::transfer::command::LookupOutcome;

pub const RECIPIENT_NAMES: [&str; 8] = [
    "Adaeze Okafor",
    "Chinedu Eze",
    "Funmilayo Adeyemi",
    "Ibrahim Musa",
    "Ngozi Nwosu",
    "Oluwaseun Balogun",
    "Tunde Bakare",
    "Zainab Abubakar",
];

/// Maps an account/bank pair to the account holder's name.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    async fn resolve(&self, account_number: &str, bank: &str) -> LookupOutcome;
}

/// Stand-in for a name enquiry service: waits, then picks one of
/// [`RECIPIENT_NAMES`] at random.
pub struct SimulatedDirectory {
    delay: Duration,
}

impl SimulatedDirectory {
    pub fn new(delay: Duration) -> Self {
        SimulatedDirectory { delay }
    }
}

#[async_trait]
impl RecipientDirectory for SimulatedDirectory {
    async fn resolve(&self, account_number: &str, bank: &str) -> LookupOutcome {
        tokio::time::sleep(self.delay).await;

        let name = RECIPIENT_NAMES[rand::random_range(0..RECIPIENT_NAMES.len())];
        debug!("Resolved {} at {} to {}", account_number, bank, name);

        LookupOutcome::Found(name.to_owned())
    }
}
