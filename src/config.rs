use std::{path::Path, time::Duration};

use color_eyre::eyre::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "banking-client";
const ENV_PREFIX: &str = "BANKING_CLIENT";

/// Runtime settings, layered: defaults, then `banking-client.toml`, then
/// `BANKING_CLIENT_*` environment variables (`__` separates sections).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub feed: FeedSettings,
    pub transfer: TransferSettings,
    pub database: DatabaseSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub logs_path: String,
    /// Bearer token of the signed-in session.
    pub access_token: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedSettings {
    /// Read the transaction log from this CSV file instead of the API.
    pub log_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransferSettings {
    pub lookup_delay_ms: u64,
    pub confirmation_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            logs_path: "/api/mandate/micro-debit/logs".to_string(),
            access_token: None,
            timeout_seconds: 30,
        }
    }
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            lookup_delay_ms: 1500,
            confirmation_delay_ms: 5000,
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
        }
    }
}

impl ApiSettings {
    pub fn logs_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.logs_path.trim_start_matches('/')
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl TransferSettings {
    pub fn lookup_delay(&self) -> Duration {
        Duration::from_millis(self.lookup_delay_ms)
    }

    pub fn confirmation_delay(&self) -> Duration {
        Duration::from_millis(self.confirmation_delay_ms)
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
        }

        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// `file` may omit its extension; a missing file is not an error.
    pub fn load_from(file: &Path) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(file).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }
}
