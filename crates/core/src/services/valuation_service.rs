use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

use crate::errors::CoreError;
use crate::models::lot::Lot;
use crate::models::position::Position;
use crate::models::price::Quote;
use crate::models::valuation::{PriceStatus, ValuationResult};

/// Turns lots and quotes into per-position valuations.
///
/// Pure business logic: no I/O, no clock, no API calls. Identical inputs
/// always give identical outputs.
pub struct ValuationService;

impl ValuationService {
    pub fn new() -> Self {
        Self
    }

    /// Group lots by symbol into positions, sorted by symbol.
    ///
    /// quantity = Σ qᵢ, cost_basis_total = Σ qᵢ·cᵢ and
    /// average_cost = cost_basis_total / quantity, all in exact decimal.
    pub fn build_positions(&self, lots: &[Lot]) -> Result<Vec<Position>, CoreError> {
        let mut grouped: BTreeMap<&str, Vec<&Lot>> = BTreeMap::new();
        for lot in lots {
            lot.validate()?;
            grouped.entry(lot.symbol()).or_default().push(lot);
        }

        grouped
            .into_iter()
            .map(|(symbol, lots)| Self::aggregate(symbol, &lots))
            .collect()
    }

    /// Value every position against its quote.
    ///
    /// A position without a quote is `PriceStatus::Unavailable` with every
    /// market figure undefined.
    pub fn value(
        &self,
        lots: &[Lot],
        quotes: &HashMap<String, Quote>,
    ) -> Result<Vec<(Position, ValuationResult)>, CoreError> {
        self.build_positions(lots)?
            .into_iter()
            .map(|position| {
                let valuation = self.value_position(&position, quotes.get(&position.symbol))?;
                Ok((position, valuation))
            })
            .collect()
    }

    /// Value one position against an optional quote.
    pub fn value_position(
        &self,
        position: &Position,
        quote: Option<&Quote>,
    ) -> Result<ValuationResult, CoreError> {
        let Some(quote) = quote else {
            return Ok(ValuationResult {
                symbol: position.symbol.clone(),
                status: PriceStatus::Unavailable,
                current_price: None,
                quote_as_of: None,
                market_value: None,
                cost_basis_total: position.cost_basis_total,
                gain_loss: None,
                gain_loss_ratio: None,
            });
        };

        if quote.price < Decimal::ZERO {
            return Err(CoreError::ValidationError(format!(
                "negative price {} for {}",
                quote.price, position.symbol
            )));
        }

        let market_value = overflow_checked(
            position.quantity.checked_mul(quote.price),
            &position.symbol,
            "market value",
        )?;
        let gain_loss = overflow_checked(
            market_value.checked_sub(position.cost_basis_total),
            &position.symbol,
            "gain/loss",
        )?;
        // Zero cost basis (gifted shares): the ratio is undefined, not infinite.
        let gain_loss_ratio = if position.cost_basis_total.is_zero() {
            None
        } else {
            Some(overflow_checked(
                gain_loss.checked_div(position.cost_basis_total),
                &position.symbol,
                "gain/loss ratio",
            )?)
        };

        Ok(ValuationResult {
            symbol: position.symbol.clone(),
            status: PriceStatus::Priced,
            current_price: Some(quote.price),
            quote_as_of: Some(quote.as_of),
            market_value: Some(market_value),
            cost_basis_total: position.cost_basis_total,
            gain_loss: Some(gain_loss),
            gain_loss_ratio,
        })
    }

    fn aggregate(symbol: &str, lots: &[&Lot]) -> Result<Position, CoreError> {
        let mut quantity = Decimal::ZERO;
        let mut cost_basis_total = Decimal::ZERO;
        for lot in lots {
            quantity = overflow_checked(quantity.checked_add(lot.quantity()), symbol, "quantity")?;
            let lot_cost = overflow_checked(lot.cost_basis_total(), symbol, "cost basis")?;
            cost_basis_total =
                overflow_checked(cost_basis_total.checked_add(lot_cost), symbol, "cost basis")?;
        }

        // Every lot has a positive quantity, so the sum is positive.
        let average_cost = overflow_checked(
            cost_basis_total.checked_div(quantity),
            symbol,
            "average cost",
        )?;

        let first_acquired = lots.iter().map(|l| l.acquisition_date()).min();
        let last_acquired = lots.iter().map(|l| l.acquisition_date()).max();
        let (Some(first_acquired), Some(last_acquired)) = (first_acquired, last_acquired) else {
            return Err(CoreError::InvalidLot(format!("{symbol}: position without lots")));
        };

        Ok(Position {
            symbol: symbol.to_string(),
            quantity,
            average_cost,
            cost_basis_total,
            lot_count: lots.len(),
            first_acquired,
            last_acquired,
        })
    }
}

impl Default for ValuationService {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn overflow_checked(
    value: Option<Decimal>,
    symbol: &str,
    what: &str,
) -> Result<Decimal, CoreError> {
    value.ok_or_else(|| {
        CoreError::ValidationError(format!("{symbol}: {what} is out of decimal range"))
    })
}
