use rust_decimal::Decimal;
use serde::Serialize;

/// Share of one position in the total priced market value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationResult {
    pub symbol: String,

    /// Weight in [0, 1]. `None` when the position has no market value or
    /// when no position in the portfolio is priced.
    pub weight: Option<Decimal>,

    /// Set when the position was left out of the denominator for lack of a price.
    pub excluded: bool,
}
