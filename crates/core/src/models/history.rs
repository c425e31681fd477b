use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::price::PricePoint;

/// A single point of the portfolio value line chart.
///
/// The core generates these; the frontend just renders them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValuePoint {
    pub date: NaiveDate,

    /// Market value of the lots held on `date`, using the last known close
    pub market_value: Decimal,

    /// Cost basis of the lots acquired on or before `date`
    pub invested: Decimal,

    /// Symbols held on `date` that had no close on or before it
    pub unpriced: Vec<String>,
}

/// Close prices of one symbol over a range, for the performance line chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerformanceSeries {
    pub symbol: String,
    pub points: Vec<PricePoint>,
}

impl PerformanceSeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Change from the first to the last close as a fraction.
    /// `None` with fewer than two points or a zero first close.
    pub fn change_ratio(&self) -> Option<Decimal> {
        let first = self.points.first()?.price;
        let last = self.points.last()?.price;
        if self.points.len() < 2 || first.is_zero() {
            return None;
        }
        Some((last - first) / first)
    }
}
