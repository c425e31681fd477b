use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::errors::CoreError;

/// Latest known price for a symbol. Fetched per refresh, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: Decimal,
    pub as_of: DateTime<Utc>,
}

impl Quote {
    /// Build a quote, rejecting negative prices.
    pub fn new(
        symbol: impl Into<String>,
        price: Decimal,
        as_of: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        let symbol = symbol.into().trim().to_uppercase();
        if price < Decimal::ZERO {
            return Err(CoreError::ValidationError(format!(
                "price for {symbol} must not be negative, got {price}"
            )));
        }
        Ok(Self {
            symbol,
            price,
            as_of,
        })
    }
}

/// A single price data point (date → closing price).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: Decimal,
}

/// One daily OHLCV bar, as stored in price-history CSV files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
}

impl PriceBar {
    pub fn close_point(&self) -> PricePoint {
        PricePoint {
            date: self.date,
            price: self.close,
        }
    }
}

/// Result of looking up quotes for a set of symbols.
///
/// Every requested symbol lands in exactly one of the two maps. The
/// failure reason is kept for display; the engine only sees `quotes`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteBook {
    pub quotes: HashMap<String, Quote>,
    pub unavailable: BTreeMap<String, String>,
}

impl QuoteBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_quote(&mut self, quote: Quote) {
        self.unavailable.remove(&quote.symbol);
        self.quotes.insert(quote.symbol.clone(), quote);
    }

    pub fn mark_unavailable(&mut self, symbol: impl Into<String>, reason: impl Into<String>) {
        let symbol = symbol.into();
        self.quotes.remove(&symbol);
        self.unavailable.insert(symbol, reason.into());
    }

    pub fn get(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.get(symbol)
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty() && self.unavailable.is_empty()
    }
}
