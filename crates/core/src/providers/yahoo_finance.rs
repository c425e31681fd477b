use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use time::OffsetDateTime;

use super::traits::QuoteSource;
use crate::errors::CoreError;
use crate::models::price::{PricePoint, Quote};

const PROVIDER: &str = "Yahoo Finance";

/// Yahoo Finance quote source for stocks, ETFs and indices.
///
/// - **Free**: No API key required.
/// - **Data**: Latest quote + full daily history.
///
/// Uses the `yahoo_finance_api` crate. Prices are in the listing's native
/// currency; no conversion happens here.
pub struct YahooFinanceProvider {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooFinanceProvider {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| api_error(
            format!("Failed to create connector: {e}"),
        ))?;
        Ok(Self { connector })
    }

    /// Midnight UTC of `date` as a `time::OffsetDateTime`.
    fn to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime, CoreError> {
        let month = time::Month::try_from(date.month() as u8)
            .map_err(|e| api_error(format!("Invalid month in {date}: {e}")))?;
        let odt = time::Date::from_calendar_date(date.year(), month, date.day() as u8)
            .map_err(|e| api_error(format!("Invalid date {date}: {e}")))?
            .midnight()
            .assume_utc();
        Ok(odt)
    }

    fn timestamp_to_naive_date(ts: i64) -> Option<NaiveDate> {
        chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
    }
}

fn api_error(message: String) -> CoreError {
    CoreError::Api {
        provider: PROVIDER.into(),
        message,
    }
}

/// Convert a provider float into an exact decimal, rejecting NaN/inf and negatives.
pub(crate) fn price_from_f64(symbol: &str, raw: f64, provider: &str) -> Result<Decimal, CoreError> {
    if !raw.is_finite() || raw < 0.0 {
        return Err(CoreError::Api {
            provider: provider.into(),
            message: format!(
                "Invalid price returned for {symbol}: {raw} (must be finite and non-negative)"
            ),
        });
    }
    Decimal::from_f64(raw).ok_or_else(|| CoreError::Api {
        provider: provider.into(),
        message: format!("Price for {symbol} does not fit a decimal: {raw}"),
    })
}

#[async_trait]
impl QuoteSource for YahooFinanceProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn fetch(&self, symbol: &str) -> Result<Quote, CoreError> {
        let resp = self
            .connector
            .get_latest_quotes(symbol, "1d")
            .await
            .map_err(|e| api_error(format!("Failed to fetch latest quote for {symbol}: {e}")))?;

        let last = resp
            .last_quote()
            .map_err(|e| api_error(format!("No quote data for {symbol}: {e}")))?;

        let price = price_from_f64(symbol, last.close, PROVIDER)?;
        let as_of = chrono::DateTime::from_timestamp(last.timestamp, 0)
            .ok_or_else(|| api_error(format!("Invalid quote timestamp for {symbol}")))?;

        Quote::new(symbol, price, as_of)
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let start = Self::to_offset_datetime(from)?;
        let end = Self::to_offset_datetime(to + chrono::Duration::days(1))?; // inclusive end

        let resp = self
            .connector
            .get_quote_history(symbol, start, end)
            .await
            .map_err(|e| api_error(format!("Failed to fetch history range for {symbol}: {e}")))?;

        let quotes = resp
            .quotes()
            .map_err(|e| api_error(format!("Failed to parse quotes for {symbol}: {e}")))?;

        // Bars with a bad timestamp or price are dropped, not fatal: partial history is still useful.
        let mut points: Vec<PricePoint> = quotes
            .iter()
            .filter_map(|q| {
                let date = Self::timestamp_to_naive_date(q.timestamp)?;
                if date < from || date > to {
                    return None;
                }
                let price = price_from_f64(symbol, q.close, PROVIDER).ok()?;
                Some(PricePoint { date, price })
            })
            .collect();
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);

        Ok(points)
    }
}
