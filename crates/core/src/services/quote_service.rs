use chrono::{DateTime, NaiveDate, Utc};
use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::models::price::{PricePoint, Quote, QuoteBook};
use crate::models::settings::Settings;
use crate::providers::registry::QuoteSourceRegistry;
use crate::providers::traits::QuoteSource;

/// Default per-symbol lookup budget.
pub const DEFAULT_QUOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Looks up quotes across the registered sources.
///
/// - Sources are tried in order; the first valid quote wins.
/// - Each symbol gets its own timeout covering the whole fallback chain.
/// - Symbols are looked up concurrently and the call returns only once
///   every symbol has either a quote or a failure reason.
///
/// Nothing is cached: every call goes back to the sources.
pub struct QuoteService {
    registry: QuoteSourceRegistry,
    timeout: Duration,
    max_age: Option<chrono::Duration>,
}

impl QuoteService {
    pub fn new(registry: QuoteSourceRegistry) -> Self {
        Self {
            registry,
            timeout: DEFAULT_QUOTE_TIMEOUT,
            max_age: None,
        }
    }

    /// Build the service (registry, timeout, staleness) from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, CoreError> {
        let registry = QuoteSourceRegistry::from_settings(settings)?;
        Ok(Self::new(registry)
            .with_timeout(settings.quote_timeout())
            .with_max_age(settings.max_quote_age()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Quotes older than `max_age` (relative to the lookup time) are rejected.
    pub fn with_max_age(mut self, max_age: Option<chrono::Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn registry(&self) -> &QuoteSourceRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut QuoteSourceRegistry {
        &mut self.registry
    }

    /// Latest quote for one symbol, as of `now` for staleness purposes.
    pub async fn fetch_quote(&self, symbol: &str, now: DateTime<Utc>) -> Result<Quote, CoreError> {
        let symbol = symbol.trim().to_uppercase();
        match tokio::time::timeout(self.timeout, self.fetch_with_fallback(&symbol, now)).await {
            Ok(result) => result,
            Err(_) => Err(CoreError::Timeout {
                symbol,
                seconds: self.timeout.as_secs(),
            }),
        }
    }

    /// Quotes for every symbol, looked up concurrently.
    ///
    /// Never fails as a whole: a symbol whose lookup errors or times out is
    /// recorded in `QuoteBook::unavailable` with the reason.
    pub async fn fetch_quotes(&self, symbols: &[String], now: DateTime<Utc>) -> QuoteBook {
        let lookups = symbols.iter().map(|symbol| async move {
            let result = self.fetch_quote(symbol, now).await;
            (symbol.trim().to_uppercase(), result)
        });

        let mut book = QuoteBook::new();
        for (symbol, result) in join_all(lookups).await {
            match result {
                Ok(quote) => {
                    debug!("Quote {symbol}: {} as of {}", quote.price, quote.as_of);
                    book.insert_quote(quote);
                }
                Err(e) => {
                    warn!("Price unavailable for {symbol}: {e}");
                    book.mark_unavailable(symbol, e.to_string());
                }
            }
        }
        book
    }

    /// Daily closes for a symbol with source fallback.
    ///
    /// The first source returning a non-empty series wins. If every source
    /// answers with an empty series the result is empty; if every source
    /// fails the last error is returned.
    pub async fn fetch_history(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let symbol = symbol.trim().to_uppercase();
        let lookup = async {
            let mut last_error = None;
            let mut saw_empty = false;
            for source in self.registry.sources() {
                match source.fetch_history(&symbol, from, to).await {
                    Ok(points) if !points.is_empty() => return Ok(points),
                    Ok(_) => saw_empty = true,
                    Err(e) => {
                        debug!("{} history failed for {symbol}: {e}", source.name());
                        last_error = Some(e);
                    }
                }
            }
            if saw_empty {
                return Ok(Vec::new());
            }
            Err(last_error.unwrap_or(CoreError::NoProvider))
        };
        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(result) => result,
            Err(_) => Err(CoreError::Timeout {
                symbol,
                seconds: self.timeout.as_secs(),
            }),
        }
    }

    async fn fetch_with_fallback(&self, symbol: &str, now: DateTime<Utc>) -> Result<Quote, CoreError> {
        let mut last_error = None;
        for source in self.registry.sources() {
            match self.fetch_from(source, symbol, now).await {
                Ok(quote) => return Ok(quote),
                Err(e) => {
                    debug!("{} failed for {symbol}: {e}", source.name());
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(CoreError::NoProvider))
    }

    async fn fetch_from(
        &self,
        source: &dyn QuoteSource,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> Result<Quote, CoreError> {
        let quote = source.fetch(symbol).await?;
        if quote.symbol != symbol {
            return Err(CoreError::Api {
                provider: source.name().to_string(),
                message: format!("asked for {symbol}, got a quote for {}", quote.symbol),
            });
        }
        if let Some(max_age) = self.max_age {
            if now - quote.as_of > max_age {
                return Err(CoreError::StaleQuote {
                    symbol: symbol.to_string(),
                    as_of: quote.as_of.to_rfc3339(),
                });
            }
        }
        Ok(quote)
    }
}
