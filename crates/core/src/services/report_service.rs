use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::HashMap;

use super::allocation_service::AllocationService;
use super::valuation_service::{overflow_checked, ValuationService};
use crate::errors::CoreError;
use crate::models::lot::Lot;
use crate::models::price::Quote;
use crate::models::report::{PortfolioTotals, Report, ReportLine};

/// Builds the display-ready report from lots and quotes.
///
/// Runs valuation, then allocation, zips both by symbol, orders the lines
/// and sums the totals. Pure: the same lots and quotes always produce an
/// identical report.
pub struct ReportService {
    valuation_service: ValuationService,
    allocation_service: AllocationService,
}

impl ReportService {
    pub fn new() -> Self {
        Self {
            valuation_service: ValuationService::new(),
            allocation_service: AllocationService::new(),
        }
    }

    pub fn assemble(
        &self,
        lots: &[Lot],
        quotes: &HashMap<String, Quote>,
    ) -> Result<Report, CoreError> {
        let valuations = self.valuation_service.value(lots, quotes)?;
        let allocations = self.allocation_service.allocate(&valuations)?;

        let mut by_symbol: HashMap<String, _> = allocations
            .into_iter()
            .map(|a| (a.symbol.clone(), a))
            .collect();

        let mut lines = Vec::with_capacity(valuations.len());
        for (position, valuation) in valuations {
            let allocation = by_symbol.remove(&position.symbol).ok_or_else(|| {
                CoreError::ValidationError(format!("no allocation for {}", position.symbol))
            })?;
            lines.push(ReportLine {
                position,
                valuation,
                allocation,
            });
        }

        lines.sort_by(compare_lines);
        let totals = Self::totals(&lines)?;

        Ok(Report { lines, totals })
    }

    /// Sum only defined values. Unpriced positions still count toward
    /// `total_cost_basis`.
    fn totals(lines: &[ReportLine]) -> Result<PortfolioTotals, CoreError> {
        let mut total_cost_basis = Decimal::ZERO;
        let mut priced_cost_basis = Decimal::ZERO;
        let mut market_value = Decimal::ZERO;
        let mut gain_loss = Decimal::ZERO;
        let mut priced_positions = 0;

        for line in lines {
            let symbol = line.symbol();
            let cost = line.valuation.cost_basis_total;
            total_cost_basis = overflow_checked(total_cost_basis.checked_add(cost), symbol, "total cost basis")?;

            if let (Some(value), Some(gain)) = (line.valuation.market_value, line.valuation.gain_loss) {
                priced_positions += 1;
                priced_cost_basis =
                    overflow_checked(priced_cost_basis.checked_add(cost), symbol, "priced cost basis")?;
                market_value = overflow_checked(market_value.checked_add(value), symbol, "total market value")?;
                gain_loss = overflow_checked(gain_loss.checked_add(gain), symbol, "total gain/loss")?;
            }
        }

        let any_priced = priced_positions > 0;
        let total_gain_loss_ratio = if any_priced && !priced_cost_basis.is_zero() {
            Some(overflow_checked(
                gain_loss.checked_div(priced_cost_basis),
                "portfolio",
                "total gain/loss ratio",
            )?)
        } else {
            None
        };

        Ok(PortfolioTotals {
            total_cost_basis,
            priced_cost_basis,
            total_market_value: any_priced.then_some(market_value),
            total_gain_loss: any_priced.then_some(gain_loss),
            total_gain_loss_ratio,
            priced_positions,
            unavailable_positions: lines.len() - priced_positions,
        })
    }
}

impl Default for ReportService {
    fn default() -> Self {
        Self::new()
    }
}

/// Priced lines first by descending market value (ties by symbol), then
/// unpriced lines alphabetically.
fn compare_lines(a: &ReportLine, b: &ReportLine) -> Ordering {
    match (a.valuation.market_value, b.valuation.market_value) {
        (Some(va), Some(vb)) => vb.cmp(&va).then_with(|| a.symbol().cmp(b.symbol())),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.symbol().cmp(b.symbol()),
    }
}
