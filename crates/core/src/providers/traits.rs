use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::price::{PricePoint, Quote};

/// Abstraction over every market-data provider.
///
/// Yahoo Finance, Alpha Vantage and local CSV history each implement this
/// trait. Callers treat any `Err` identically: the symbol is "price
/// unavailable" for this refresh.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Human-readable name of this source (for logs/errors).
    fn name(&self) -> &str;

    /// Get the latest quote for a symbol.
    async fn fetch(&self, symbol: &str) -> Result<Quote, CoreError>;

    /// Get daily closes for a date range (inclusive), sorted by date.
    /// May return fewer points than calendar days (weekends, holidays,
    /// partial data).
    async fn fetch_history(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError>;
}
