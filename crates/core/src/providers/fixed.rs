use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

use super::traits::QuoteSource;
use crate::errors::CoreError;
use crate::models::price::{PricePoint, Quote};

/// In-memory quote source with manually entered prices.
///
/// Used for price overrides on the command line and as a deterministic
/// source in tests. Symbols without a price fail with `PriceNotAvailable`.
pub struct FixedQuoteSource {
    prices: HashMap<String, Decimal>,
    history: HashMap<String, Vec<PricePoint>>,
    as_of: DateTime<Utc>,
}

impl FixedQuoteSource {
    pub fn new(as_of: DateTime<Utc>) -> Self {
        Self {
            prices: HashMap::new(),
            history: HashMap::new(),
            as_of,
        }
    }

    pub fn with_price(mut self, symbol: &str, price: Decimal) -> Self {
        self.prices.insert(symbol.trim().to_uppercase(), price);
        self
    }

    pub fn with_history(mut self, symbol: &str, mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        self.history.insert(symbol.trim().to_uppercase(), points);
        self
    }

    /// Parse `SYMBOL=PRICE` pairs, e.g. from `--price AAPL=185.2`.
    pub fn parse_overrides(pairs: &[String], as_of: DateTime<Utc>) -> Result<Self, CoreError> {
        let mut source = Self::new(as_of);
        for pair in pairs {
            let (symbol, price) = pair.split_once('=').ok_or_else(|| {
                CoreError::ValidationError(format!("expected SYMBOL=PRICE, got '{pair}'"))
            })?;
            let price: Decimal = price.trim().parse().map_err(|_| {
                CoreError::ValidationError(format!("invalid price in '{pair}'"))
            })?;
            if price < Decimal::ZERO {
                return Err(CoreError::ValidationError(format!(
                    "price must not be negative in '{pair}'"
                )));
            }
            let symbol = crate::models::lot::normalize_symbol(symbol)?;
            source = source.with_price(&symbol, price);
        }
        Ok(source)
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty() && self.history.is_empty()
    }
}

#[async_trait]
impl QuoteSource for FixedQuoteSource {
    fn name(&self) -> &str {
        "Fixed prices"
    }

    async fn fetch(&self, symbol: &str) -> Result<Quote, CoreError> {
        let symbol = symbol.to_uppercase();
        let price = self
            .prices
            .get(&symbol)
            .copied()
            .ok_or_else(|| CoreError::PriceNotAvailable {
                symbol: symbol.clone(),
                date: "latest".into(),
            })?;
        Quote::new(symbol, price, self.as_of)
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let symbol = symbol.to_uppercase();
        let points = self
            .history
            .get(&symbol)
            .ok_or_else(|| CoreError::PriceNotAvailable {
                symbol: symbol.clone(),
                date: format!("{from}..{to}"),
            })?;
        Ok(points
            .iter()
            .filter(|p| p.date >= from && p.date <= to)
            .cloned()
            .collect())
    }
}
