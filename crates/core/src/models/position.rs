use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// Aggregate of all lots sharing one symbol.
///
/// Built fresh by the valuation engine on every refresh and never updated
/// in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Position {
    pub symbol: String,

    /// Sum of lot quantities (exact decimal sum)
    pub quantity: Decimal,

    /// Weighted-average cost per share: cost_basis_total / quantity
    pub average_cost: Decimal,

    /// Sum of quantity × cost per share over all lots
    pub cost_basis_total: Decimal,

    /// Number of lots folded into this position
    pub lot_count: usize,

    /// Earliest acquisition date among the lots
    pub first_acquired: NaiveDate,

    /// Latest acquisition date among the lots
    pub last_acquired: NaiveDate,
}
