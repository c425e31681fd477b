use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use super::allocation::AllocationResult;
use super::position::Position;
use super::valuation::ValuationResult;

/// One row of the report: a position with its valuation and allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLine {
    pub position: Position,
    pub valuation: ValuationResult,
    pub allocation: AllocationResult,
}

impl ReportLine {
    pub fn symbol(&self) -> &str {
        &self.position.symbol
    }
}

/// Portfolio-level totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortfolioTotals {
    /// Cost basis of every position, priced or not
    pub total_cost_basis: Decimal,

    /// Cost basis of priced positions only
    pub priced_cost_basis: Decimal,

    /// Sum of defined market values. `None` when nothing could be priced.
    pub total_market_value: Option<Decimal>,

    /// Sum of defined per-position gains. `None` when nothing could be priced.
    pub total_gain_loss: Option<Decimal>,

    /// total_gain_loss / priced_cost_basis as a fraction
    pub total_gain_loss_ratio: Option<Decimal>,

    pub priced_positions: usize,
    pub unavailable_positions: usize,
}

/// Immutable, display-ready portfolio report.
///
/// Lines are ordered by descending market value; unpriced positions come
/// last in alphabetical order. Rebuilt wholesale on every refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub lines: Vec<ReportLine>,
    pub totals: PortfolioTotals,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, symbol: &str) -> Option<&ReportLine> {
        self.lines.iter().find(|l| l.symbol() == symbol)
    }

    /// Symbols flagged "price unavailable", alphabetical.
    pub fn unavailable_symbols(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|l| !l.valuation.is_priced())
            .map(|l| l.symbol())
            .collect()
    }

    /// Pie-chart data: (symbol, weight) for every weighted position.
    pub fn allocation_slices(&self) -> Vec<AllocationSlice> {
        self.lines
            .iter()
            .filter_map(|l| {
                l.allocation.weight.map(|weight| AllocationSlice {
                    symbol: l.symbol().to_string(),
                    weight,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationSlice {
    pub symbol: String,
    pub weight: Decimal,
}

/// A report together with the reason each unpriced symbol failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshOutcome {
    pub report: Report,
    pub quote_failures: BTreeMap<String, String>,
}
