//! Configuration for the message-to-ledger pipeline
//!
//! Config is loaded with a three-layer resolution:
//! 1. Explicit path (`--config`), or the override in the data dir
//!    (~/.local/share/kitty/config.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//! 3. Environment variables override individual values

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/kitty.toml");

pub const TARGET_CONVERSATION_ENV: &str = "KITTY_TARGET_CONVERSATION";
pub const STORE_PATH_ENV: &str = "KITTY_STORE_PATH";
pub const SPENDING_ANALYSIS_ENV: &str = "KITTY_SPENDING_ANALYSIS";
pub const MESSAGES_SHEET_ENV: &str = "KITTY_MESSAGES_SHEET";
pub const SPENDING_SHEET_ENV: &str = "KITTY_SPENDING_SHEET";

/// Names of the three sheets in the ledger workbook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetNames {
    pub messages: String,
    pub monthly: String,
    pub individual: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            messages: "Messages".to_string(),
            monthly: "Spending Analysis".to_string(),
            individual: "Individual Spending".to_string(),
        }
    }
}

/// Retry settings for writing the workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistSettings {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for PersistSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 1000,
        }
    }
}

impl PersistSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.backoff_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Conversation whose messages are tracked
    pub target_conversation: String,
    /// Path of the ledger workbook
    pub store_path: PathBuf,
    /// Whether monthly/individual aggregates are maintained
    #[serde(default = "default_true")]
    pub spending_analysis: bool,
    /// Ordered item patterns: group 1 is the label, group 2 the amount
    pub item_patterns: Vec<String>,
    /// Ordered bare number patterns
    pub number_patterns: Vec<String>,
    pub spending_keywords: Vec<String>,
    #[serde(default)]
    pub sheets: SheetNames,
    #[serde(default)]
    pub persist: PersistSettings,
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        // The embedded file is covered by tests, so a parse failure here is a build defect
        Self::from_toml(DEFAULT_CONFIG).unwrap_or_else(|e| {
            warn!("Embedded config is invalid: {}", e);
            Self {
                target_conversation: String::new(),
                store_path: PathBuf::from("kitty.db"),
                spending_analysis: true,
                item_patterns: vec![],
                number_patterns: vec![],
                spending_keywords: vec![],
                sheets: SheetNames::default(),
                persist: PersistSettings::default(),
            }
        })
    }
}

impl Config {
    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration (explicit path, then data dir override, then embedded default)
    /// and apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let content = match path {
            Some(path) => fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read config {}: {}", path.display(), e))
            })?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(default_path) => {
                    debug!("Using config override at {}", default_path.display());
                    fs::read_to_string(&default_path)?
                }
                None => DEFAULT_CONFIG.to_string(),
            },
        };

        let mut config = Self::from_toml(&content)?;
        config.apply_env();
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(target) = lookup(TARGET_CONVERSATION_ENV) {
            self.target_conversation = target;
        }
        if let Some(path) = lookup(STORE_PATH_ENV) {
            self.store_path = PathBuf::from(path);
        }
        if let Some(flag) = lookup(SPENDING_ANALYSIS_ENV) {
            self.spending_analysis = flag.trim().eq_ignore_ascii_case("true");
        }
        if let Some(name) = lookup(MESSAGES_SHEET_ENV) {
            self.sheets.messages = name;
        }
        if let Some(name) = lookup(SPENDING_SHEET_ENV) {
            self.sheets.monthly = name;
        }
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("kitty").join("config.toml"))
}
