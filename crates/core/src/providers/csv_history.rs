use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use std::collections::BTreeMap;
use std::path::Path;

use super::traits::QuoteSource;
use crate::errors::CoreError;
use crate::models::price::{PriceBar, PricePoint, Quote};
use crate::storage::price_history::PriceHistoryStore;

/// Offline quote source backed by imported price-history bars.
///
/// `fetch` answers with the most recent close of the symbol; `fetch_history`
/// with the closes inside the requested range.
pub struct CsvQuoteSource {
    closes: BTreeMap<String, Vec<PricePoint>>,
}

impl CsvQuoteSource {
    pub fn from_bars(bars: &[PriceBar]) -> Self {
        let mut closes: BTreeMap<String, Vec<PricePoint>> = BTreeMap::new();
        for bar in bars {
            closes
                .entry(bar.symbol.clone())
                .or_default()
                .push(bar.close_point());
        }
        for points in closes.values_mut() {
            points.sort_by_key(|p| p.date);
            // Keep the last bar imported for a given day.
            points.reverse();
            points.dedup_by_key(|p| p.date);
            points.reverse();
        }
        Self { closes }
    }

    /// Load a price-history CSV. Rejected rows are logged by the store and skipped.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let load = PriceHistoryStore::load(path)?;
        Ok(Self::from_bars(&load.bars))
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.closes.keys().map(String::as_str).collect()
    }
}

#[async_trait]
impl QuoteSource for CsvQuoteSource {
    fn name(&self) -> &str {
        "CSV history"
    }

    async fn fetch(&self, symbol: &str) -> Result<Quote, CoreError> {
        let symbol = symbol.to_uppercase();
        let last = self
            .closes
            .get(&symbol)
            .and_then(|points| points.last())
            .ok_or_else(|| CoreError::PriceNotAvailable {
                symbol: symbol.clone(),
                date: "latest".into(),
            })?;
        let as_of = last
            .date
            .and_hms_opt(0, 0, 0)
            .map(|dt| Utc.from_utc_datetime(&dt))
            .ok_or_else(|| CoreError::PriceNotAvailable {
                symbol: symbol.clone(),
                date: last.date.to_string(),
            })?;
        Quote::new(symbol, last.price, as_of)
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let symbol = symbol.to_uppercase();
        let points = self
            .closes
            .get(&symbol)
            .ok_or_else(|| CoreError::PriceNotAvailable {
                symbol: symbol.clone(),
                date: format!("{from}..{to}"),
            })?;
        // Points are date-sorted; binary search both range boundaries.
        let start = points.partition_point(|p| p.date < from);
        let end = points.partition_point(|p| p.date <= to);
        Ok(points[start..end.max(start)].to_vec())
    }
}
