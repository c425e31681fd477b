use thiserror::Error;

/// Unified error type for the entire stock-portfolio-core library.
/// Every fallible public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Ledger / File ───────────────────────────────────────────────
    #[error("Invalid lot: {0}")]
    InvalidLot(String),

    #[error("Ledger row {line}: {reason}")]
    LedgerRow { line: u64, reason: String },

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("File I/O error: {0}")]
    FileIO(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // ── Quote Source / Network ──────────────────────────────────────
    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("No quote provider configured")]
    NoProvider,

    #[error("Price not available for {symbol} on {date}")]
    PriceNotAvailable { symbol: String, date: String },

    #[error("Quote lookup for {symbol} timed out after {seconds}s")]
    Timeout { symbol: String, seconds: u64 },

    #[error("Quote for {symbol} is stale (as of {as_of})")]
    StaleQuote { symbol: String, as_of: String },

    // ── Business Logic ──────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Lot not found at index {0}")]
    LotNotFound(usize),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<csv::Error> for CoreError {
    fn from(e: csv::Error) -> Self {
        if e.is_io_error() {
            return CoreError::FileIO(e.to_string());
        }
        CoreError::Csv(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(e: toml::de::Error) -> Self {
        CoreError::Config(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // Strip query parameters: reqwest errors carry the full URL, API key included.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
