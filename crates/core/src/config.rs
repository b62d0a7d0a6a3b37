use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::errors::CoreError;
use crate::storage::encryption::KdfParams;

/// Env var pointing at an alternative config file.
pub const CONFIG_PATH_ENV: &str = "FINANCE_LEDGER_CONFIG";

/// Env var overriding `backend_url`.
pub const BACKEND_URL_ENV: &str = "FINANCE_LEDGER_BACKEND_URL";

const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";

/// What a goal payment records when it exceeds the amount still needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverpaymentPolicy {
    /// Only the amount that completes the goal is budget-checked and recorded.
    /// Paying into a completed goal is rejected.
    #[default]
    ClampToRemaining,
    /// The full requested amount is budget-checked and recorded while the goal
    /// is clamped at its target; the excess counts as spent.
    RecordRequested,
}

/// Ledger store settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// When set, ledger records are sealed with a key derived from it.
    #[serde(default)]
    pub passphrase: Option<String>,

    /// Argon2id parameters used when sealing new records.
    #[serde(default)]
    pub kdf: KdfParams,
}

/// Application configuration, read from `config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Where ledger records are kept; platform data dir when absent.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the quote/advice backend.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Display currency for amounts. The ledger itself is single-currency.
    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub goal_overpayment: OverpaymentPolicy,
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_currency() -> String {
    "INR".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            backend_url: default_backend_url(),
            currency: default_currency(),
            store: StoreConfig::default(),
            goal_overpayment: OverpaymentPolicy::default(),
        }
    }
}

impl LedgerConfig {
    /// Load the config from `$FINANCE_LEDGER_CONFIG` or the platform config
    /// dir. A missing file yields the defaults.
    pub fn load() -> Result<Self, CoreError> {
        let path = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => PathBuf::from(path),
            Err(_) => Self::default_config_path()?,
        };

        let mut config = if path.exists() {
            Self::load_from_path(&path)?
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };

        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            config.backend_url = url;
        }
        Ok(config)
    }

    pub fn default_config_path() -> Result<PathBuf, CoreError> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.config_dir().join("config.yaml"))
    }

    /// Directory holding ledger records.
    pub fn default_data_path(&self) -> Result<PathBuf, CoreError> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let dirs = Self::project_dirs()?;
        Ok(dirs.data_dir().join("ledgers"))
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        let config: Self = serde_yaml::from_str(&raw).map_err(|e| {
            CoreError::Config(format!("Failed to parse config file {}: {e}", path.display()))
        })?;
        config.validate()?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.backend_url.trim().is_empty() {
            return Err(CoreError::Config("backend_url must not be empty".into()));
        }
        self.store.kdf.check().map_err(CoreError::Config)
    }

    fn project_dirs() -> Result<ProjectDirs, CoreError> {
        ProjectDirs::from("dev", "finance-ledger", "finance-ledger")
            .ok_or_else(|| CoreError::Config("Could not determine project directories".into()))
    }
}
