use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::transfer::command::ConfirmationOutcome;

/// Confirms a one-time passcode against the bank and issues a reference.
#[async_trait]
pub trait OtpConfirmer: Send + Sync {
    async fn confirm(&self, code: &str) -> ConfirmationOutcome;
}

/// Accepts any code after a fixed processing delay.
pub struct SimulatedConfirmer {
    delay: Duration,
}

impl SimulatedConfirmer {
    pub fn new(delay: Duration) -> Self {
        SimulatedConfirmer { delay }
    }
}

#[async_trait]
impl OtpConfirmer for SimulatedConfirmer {
    async fn confirm(&self, _code: &str) -> ConfirmationOutcome {
        tokio::time::sleep(self.delay).await;

        let reference = format!("REF-{}", rand::random_range(0..1_000_000u32));
        debug!("OTP confirmed with {}", reference);

        ConfirmationOutcome::Confirmed { reference }
    }
}
