use rust_decimal::Decimal;

use super::valuation_service::overflow_checked;
use crate::errors::CoreError;
use crate::models::allocation::AllocationResult;
use crate::models::position::Position;
use crate::models::valuation::ValuationResult;

/// Derives each position's weight in the priced portfolio.
pub struct AllocationService;

impl AllocationService {
    pub fn new() -> Self {
        Self
    }

    /// Weight of every valuation, in input order.
    ///
    /// The denominator is the sum of defined market values. Unpriced
    /// positions get no weight and are flagged `excluded`. When the
    /// denominator is zero every weight is undefined.
    pub fn allocate(
        &self,
        valuations: &[(Position, ValuationResult)],
    ) -> Result<Vec<AllocationResult>, CoreError> {
        let mut total = Decimal::ZERO;
        for (position, valuation) in valuations {
            if let Some(value) = valuation.market_value {
                total = overflow_checked(total.checked_add(value), &position.symbol, "total market value")?;
            }
        }

        Ok(valuations
            .iter()
            .map(|(position, valuation)| {
                let weight = match valuation.market_value {
                    Some(value) if !total.is_zero() => value.checked_div(total),
                    _ => None,
                };
                AllocationResult {
                    symbol: position.symbol.clone(),
                    weight,
                    excluded: valuation.market_value.is_none(),
                }
            })
            .collect())
    }
}

impl Default for AllocationService {
    fn default() -> Self {
        Self::new()
    }
}
