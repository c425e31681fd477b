use tracing::{info, warn};

use super::alphavantage::AlphaVantageProvider;
use super::csv_history::CsvQuoteSource;
use super::traits::QuoteSource;
use super::yahoo_finance::YahooFinanceProvider;
use crate::errors::CoreError;
use crate::models::settings::{ProviderKind, Settings};

/// Ordered list of quote sources.
///
/// Lookups try sources in registration order and fall back to the next one
/// when a source fails.
pub struct QuoteSourceRegistry {
    sources: Vec<Box<dyn QuoteSource>>,
}

impl QuoteSourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Build the registry described by `settings.providers`.
    ///
    /// A provider that cannot be constructed (missing API key, unreadable
    /// CSV) is skipped with a warning; an empty result is an error.
    pub fn from_settings(settings: &Settings) -> Result<Self, CoreError> {
        let mut registry = Self::new();

        for kind in &settings.providers {
            match kind {
                ProviderKind::Yahoo => match YahooFinanceProvider::new() {
                    Ok(yahoo) => registry.register(Box::new(yahoo)),
                    Err(e) => warn!("Yahoo Finance unavailable: {e}"),
                },
                ProviderKind::AlphaVantage => match settings.api_keys.get("alphavantage") {
                    Some(key) => {
                        registry.register(Box::new(AlphaVantageProvider::new(key.clone())))
                    }
                    None => warn!("Alpha Vantage listed but no api_keys.alphavantage set"),
                },
                ProviderKind::Csv => {
                    let Some(path) = &settings.price_history_path else {
                        warn!("CSV provider listed but no price_history_path set");
                        continue;
                    };
                    match CsvQuoteSource::load(path) {
                        Ok(csv) => registry.register(Box::new(csv)),
                        Err(e) => warn!("Price history {} unreadable: {e}", path.display()),
                    }
                }
            }
        }

        if registry.is_empty() {
            return Err(CoreError::NoProvider);
        }
        info!("Quote sources: {}", registry.names().join(", "));
        Ok(registry)
    }

    /// Register a new quote source at the end of the fallback chain.
    pub fn register(&mut self, source: Box<dyn QuoteSource>) {
        self.sources.push(source);
    }

    /// Register a source ahead of every existing one.
    pub fn register_first(&mut self, source: Box<dyn QuoteSource>) {
        self.sources.insert(0, source);
    }

    pub fn sources(&self) -> impl Iterator<Item = &dyn QuoteSource> {
        self.sources.iter().map(|s| s.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Default for QuoteSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
