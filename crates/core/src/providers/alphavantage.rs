use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use super::traits::QuoteSource;
use crate::errors::CoreError;
use crate::models::price::{PricePoint, Quote};

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER: &str = "Alpha Vantage";

/// Alpha Vantage quote source for stocks.
///
/// - **Free tier**: 25 requests/day (across ALL endpoints).
/// - **Requires**: API key (settings `api_keys.alphavantage`).
/// - **History**: compact daily series (last 100 trading days).
///
/// Prices come back as strings and are parsed straight into decimals.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
}

impl AlphaVantageProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
        }
    }
}

// ── Alpha Vantage API response types ────────────────────────────────

#[derive(Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
}

#[derive(Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "07. latest trading day")]
    latest_trading_day: Option<String>,
}

#[derive(Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyData>>,
}

#[derive(Deserialize)]
struct DailyData {
    #[serde(rename = "4. close")]
    close: String,
}

fn api_error(message: String) -> CoreError {
    CoreError::Api {
        provider: PROVIDER.into(),
        message,
    }
}

fn parse_price(symbol: &str, raw: &str) -> Result<Decimal, CoreError> {
    let price = Decimal::from_str(raw.trim())
        .map_err(|e| api_error(format!("Invalid price format for {symbol}: {e}")))?;
    if price < Decimal::ZERO {
        return Err(api_error(format!("Negative price returned for {symbol}: {price}")));
    }
    Ok(price)
}

#[async_trait]
impl QuoteSource for AlphaVantageProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn fetch(&self, symbol: &str) -> Result<Quote, CoreError> {
        let resp: GlobalQuoteResponse = self
            .client
            .get(BASE_URL)
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", &symbol.to_uppercase()),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| api_error(format!("Failed to parse quote for {symbol}: {e}")))?;

        let quote = resp.global_quote.ok_or_else(|| {
            api_error(format!("No quote data for {symbol}. API limit may be exceeded."))
        })?;
        let price_str = quote.price.ok_or_else(|| {
            api_error(format!("No price in quote for {symbol}. API limit may be exceeded."))
        })?;
        let price = parse_price(symbol, &price_str)?;

        // The endpoint only reports the trading day; stamp it at midnight UTC.
        let as_of = quote
            .latest_trading_day
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| Utc.from_utc_datetime(&dt))
            .unwrap_or_else(Utc::now);

        Quote::new(symbol, price, as_of)
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let time_series = self.fetch_daily_series(symbol).await?;

        let mut points: Vec<PricePoint> = time_series
            .iter()
            .filter_map(|(date_str, data)| {
                let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;
                if date >= from && date <= to {
                    let price = parse_price(symbol, &data.close).ok()?;
                    Some(PricePoint { date, price })
                } else {
                    None
                }
            })
            .collect();

        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}

impl AlphaVantageProvider {
    async fn fetch_daily_series(
        &self,
        symbol: &str,
    ) -> Result<HashMap<String, DailyData>, CoreError> {
        let resp: TimeSeriesResponse = self
            .client
            .get(BASE_URL)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", &symbol.to_uppercase()),
                ("outputsize", "compact"),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| api_error(format!("Failed to parse time series for {symbol}: {e}")))?;

        resp.time_series.ok_or_else(|| {
            api_error(format!("No time series data for {symbol}. API limit may be exceeded."))
        })
    }
}
