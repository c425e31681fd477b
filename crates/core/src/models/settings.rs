use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::errors::CoreError;

/// Longest history range accepted for charts (10 years).
pub const MAX_HISTORY_DAYS: u32 = 3650;

/// Largest accepted staleness tolerance (10 years).
pub const MAX_QUOTE_AGE_HOURS: u64 = 24 * 3650;

/// Environment variable that overrides the Alpha Vantage key from the file.
pub const ALPHAVANTAGE_KEY_ENV: &str = "ALPHAVANTAGE_API_KEY";

/// Quote source kinds that can be listed in `providers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Yahoo Finance, no API key needed
    Yahoo,
    /// Alpha Vantage, requires `api_keys.alphavantage`
    AlphaVantage,
    /// Local price-history CSV at `price_history_path`
    Csv,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Yahoo => write!(f, "yahoo"),
            ProviderKind::AlphaVantage => write!(f, "alphavantage"),
            ProviderKind::Csv => write!(f, "csv"),
        }
    }
}

/// User-configurable settings, read from a TOML file.
///
/// Every field has a default, so an empty file (or no file) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// CSV file holding the lot ledger
    pub ledger_path: PathBuf,

    /// Optional price-history CSV used by the `csv` provider
    pub price_history_path: Option<PathBuf>,

    /// Per-symbol quote lookup timeout
    pub quote_timeout_secs: u64,

    /// Quotes older than this are treated as unavailable. Unset accepts any age.
    pub max_quote_age_hours: Option<u64>,

    /// Default range for history charts
    pub history_days: u32,

    /// Quote sources in fallback order
    pub providers: Vec<ProviderKind>,

    /// API keys by provider name (e.g. "alphavantage")
    pub api_keys: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from("portfolio.csv"),
            price_history_path: None,
            quote_timeout_secs: 10,
            max_quote_age_hours: None,
            history_days: 365,
            providers: vec![ProviderKind::Yahoo],
            api_keys: HashMap::new(),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text and validate them.
    pub fn from_toml_str(text: &str) -> Result<Self, CoreError> {
        let settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Apply environment overrides (currently the Alpha Vantage key).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var(ALPHAVANTAGE_KEY_ENV) {
            if !key.trim().is_empty() {
                self.api_keys.insert("alphavantage".into(), key.trim().to_string());
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.quote_timeout_secs == 0 {
            return Err(CoreError::Config(
                "quote_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.history_days == 0 || self.history_days > MAX_HISTORY_DAYS {
            return Err(CoreError::Config(format!(
                "history_days must be between 1 and {MAX_HISTORY_DAYS}, got {}",
                self.history_days
            )));
        }
        if let Some(hours) = self.max_quote_age_hours {
            if hours == 0 || hours > MAX_QUOTE_AGE_HOURS {
                return Err(CoreError::Config(format!(
                    "max_quote_age_hours must be between 1 and {MAX_QUOTE_AGE_HOURS}, got {hours}"
                )));
            }
        }
        if self.providers.is_empty() {
            return Err(CoreError::Config("at least one provider is required".into()));
        }
        if self.providers.contains(&ProviderKind::Csv) && self.price_history_path.is_none() {
            return Err(CoreError::Config(
                "the csv provider needs price_history_path".into(),
            ));
        }
        Ok(())
    }

    pub fn quote_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.quote_timeout_secs)
    }

    pub fn max_quote_age(&self) -> Option<chrono::Duration> {
        self.max_quote_age_hours
            .map(|h| chrono::Duration::hours(i64::try_from(h.min(MAX_QUOTE_AGE_HOURS)).unwrap_or(0)))
    }
}
