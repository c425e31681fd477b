use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::valuation_service::overflow_checked;
use crate::errors::CoreError;
use crate::models::history::{PerformanceSeries, ValuePoint};
use crate::models::lot::Lot;
use crate::models::price::PricePoint;

/// Generates chart-ready time series from lots and price histories.
///
/// The core computes all the numbers; the frontend only renders.
pub struct HistoryService;

impl HistoryService {
    pub fn new() -> Self {
        Self
    }

    /// Close prices of one symbol inside `[from, to]`, date-ordered, one per day.
    pub fn performance_series(
        &self,
        symbol: &str,
        points: &[PricePoint],
        from: NaiveDate,
        to: NaiveDate,
    ) -> PerformanceSeries {
        let mut points: Vec<PricePoint> = points
            .iter()
            .filter(|p| p.date >= from && p.date <= to)
            .cloned()
            .collect();
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        PerformanceSeries {
            symbol: symbol.to_uppercase(),
            points,
        }
    }

    /// Portfolio value on every trading day in `[from, to]`.
    ///
    /// Trading days are the union of the dates present in `histories`. For
    /// each day:
    /// 1. Hold the lots acquired on or before that day.
    /// 2. Price each held symbol at its last close on or before that day
    ///    (closes before `from` count, so pass a little lead-in history).
    /// 3. Sum quantity × close; symbols with no close yet are listed as unpriced.
    ///
    /// When nothing held can be priced on a day, the previous day's value is
    /// carried forward.
    pub fn portfolio_value_series(
        &self,
        lots: &[Lot],
        histories: &HashMap<String, Vec<PricePoint>>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ValuePoint>, CoreError> {
        let mut sorted: HashMap<&str, Vec<&PricePoint>> = HashMap::new();
        for (symbol, points) in histories {
            let mut refs: Vec<&PricePoint> = points.iter().collect();
            refs.sort_by_key(|p| p.date);
            sorted.insert(symbol.as_str(), refs);
        }

        let trading_days: BTreeSet<NaiveDate> = sorted
            .values()
            .flat_map(|points| points.iter().map(|p| p.date))
            .filter(|d| *d >= from && *d <= to)
            .collect();

        let mut lots_by_date: Vec<&Lot> = lots.iter().collect();
        lots_by_date.sort_by_key(|l| l.acquisition_date());

        let mut series = Vec::with_capacity(trading_days.len());
        let mut held: BTreeMap<&str, Decimal> = BTreeMap::new();
        let mut invested = Decimal::ZERO;
        let mut next_lot = 0;
        let mut last_value = Decimal::ZERO;

        for date in trading_days {
            // Holdings are built incrementally as acquisition dates pass.
            while next_lot < lots_by_date.len() && lots_by_date[next_lot].acquisition_date() <= date {
                let lot = lots_by_date[next_lot];
                let qty = held.entry(lot.symbol()).or_insert(Decimal::ZERO);
                *qty = overflow_checked(qty.checked_add(lot.quantity()), lot.symbol(), "quantity")?;
                let lot_cost = overflow_checked(lot.cost_basis_total(), lot.symbol(), "cost basis")?;
                invested =
                    overflow_checked(invested.checked_add(lot_cost), lot.symbol(), "invested")?;
                next_lot += 1;
            }

            let mut market_value = Decimal::ZERO;
            let mut unpriced = Vec::new();
            for (&symbol, &quantity) in &held {
                match last_close_on_or_before(sorted.get(symbol), date) {
                    Some(close) => {
                        let value =
                            overflow_checked(quantity.checked_mul(close), symbol, "market value")?;
                        market_value =
                            overflow_checked(market_value.checked_add(value), symbol, "market value")?;
                    }
                    None => unpriced.push(symbol.to_string()),
                }
            }

            // Carry forward when holdings exist but none could be priced.
            if !held.is_empty() && unpriced.len() == held.len() {
                market_value = last_value;
            } else {
                last_value = market_value;
            }

            series.push(ValuePoint {
                date,
                market_value,
                invested,
                unpriced,
            });
        }

        Ok(series)
    }
}

impl Default for HistoryService {
    fn default() -> Self {
        Self::new()
    }
}

fn last_close_on_or_before(points: Option<&Vec<&PricePoint>>, date: NaiveDate) -> Option<Decimal> {
    let points = points?;
    let idx = points.partition_point(|p| p.date <= date);
    idx.checked_sub(1).map(|i| points[i].price)
}
