use crate::application_impl::TokenCleanupOptions;
use crate::application_port::StoreFailurePolicy;
use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub log: Log,
    pub storage: Storage,
    pub cleanup: Cleanup,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Deserialize)]
pub struct Storage {
    pub backend: String, // "mysql" or "memory"
    pub dsn: Option<String>,
    #[serde(default)]
    pub sync_schema: bool,
    #[serde(default)]
    pub failure_policy: StoreFailurePolicy,
}

// the dsn carries credentials
impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("backend", &self.backend)
            .field("dsn", &self.dsn.as_ref().map(|_| "<redacted>"))
            .field("sync_schema", &self.sync_schema)
            .field("failure_policy", &self.failure_policy)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct Cleanup {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    pub interval_secs: u64,
    pub batch_size: i64,
    #[serde(default = "default_max_batches")]
    pub max_batches_per_sweep: i64,
    #[serde(default)]
    pub notification: NotificationKind,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    None,
    Log,
}

fn enabled_by_default() -> bool {
    true
}

fn default_max_batches() -> i64 {
    TokenCleanupOptions::default().max_batches_per_sweep
}

impl Cleanup {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn options(&self) -> TokenCleanupOptions {
        TokenCleanupOptions {
            batch_size: self.batch_size,
            max_batches_per_sweep: self.max_batches_per_sweep,
        }
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Loads the settings file, then applies `CADENCE__SECTION__KEY` overrides
/// from the environment.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(Environment::with_prefix("CADENCE").separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    if settings.cleanup.interval_secs == 0 {
        return Err(anyhow!("cleanup.interval_secs must be positive"));
    }

    Ok(settings)
}
