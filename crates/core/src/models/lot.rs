use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::errors::CoreError;

/// A single purchase record: `quantity` shares of `symbol` bought at
/// `cost_basis_per_share` on `acquisition_date`.
///
/// Lots are immutable once built. The only way to obtain one is through
/// [`Lot::new`], which validates every field, so a `Lot` that exists is
/// always safe to feed into the valuation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lot {
    symbol: String,
    quantity: Decimal,
    cost_basis_per_share: Decimal,
    acquisition_date: NaiveDate,
}

impl Lot {
    /// Build a validated lot. The symbol is trimmed and uppercased.
    ///
    /// Rejects an empty symbol, a symbol containing whitespace or commas,
    /// a non-positive quantity and a negative cost basis.
    pub fn new(
        symbol: impl Into<String>,
        quantity: Decimal,
        cost_basis_per_share: Decimal,
        acquisition_date: NaiveDate,
    ) -> Result<Self, CoreError> {
        let symbol = normalize_symbol(&symbol.into())?;
        let lot = Self {
            symbol,
            quantity,
            cost_basis_per_share,
            acquisition_date,
        };
        lot.validate()?;
        Ok(lot)
    }

    /// Re-check the numeric invariants of this lot.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.quantity <= Decimal::ZERO {
            return Err(CoreError::InvalidLot(format!(
                "{}: quantity must be positive, got {}",
                self.symbol, self.quantity
            )));
        }
        if self.cost_basis_per_share < Decimal::ZERO {
            return Err(CoreError::InvalidLot(format!(
                "{}: cost basis per share must not be negative, got {}",
                self.symbol, self.cost_basis_per_share
            )));
        }
        Ok(())
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn cost_basis_per_share(&self) -> Decimal {
        self.cost_basis_per_share
    }

    pub fn acquisition_date(&self) -> NaiveDate {
        self.acquisition_date
    }

    /// Total amount paid for this lot (quantity × cost per share), or `None`
    /// when the product does not fit in a `Decimal`.
    pub fn cost_basis_total(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.cost_basis_per_share)
    }
}

/// Trim and uppercase a ticker, rejecting empty or malformed input.
pub fn normalize_symbol(raw: &str) -> Result<String, CoreError> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(CoreError::InvalidLot("symbol must not be empty".into()));
    }
    if symbol.chars().any(|c| c.is_whitespace() || c == ',') {
        return Err(CoreError::InvalidLot(format!(
            "symbol '{symbol}' contains whitespace or commas"
        )));
    }
    Ok(symbol)
}
