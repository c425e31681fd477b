use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Whether a position could be priced on this refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PriceStatus {
    Priced,
    /// No valid, timely quote was obtained. Market figures are undefined.
    Unavailable,
}

impl std::fmt::Display for PriceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceStatus::Priced => write!(f, "Priced"),
            PriceStatus::Unavailable => write!(f, "Price unavailable"),
        }
    }
}

/// Valuation of one position against its quote.
///
/// Undefined figures are `None`, never zero: a zero market value would read
/// as a total loss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValuationResult {
    pub symbol: String,
    pub status: PriceStatus,

    /// Price used for valuation
    pub current_price: Option<Decimal>,

    /// Timestamp of the quote behind `current_price`
    pub quote_as_of: Option<DateTime<Utc>>,

    /// quantity × current_price
    pub market_value: Option<Decimal>,

    /// Total cost basis of the position (always defined)
    pub cost_basis_total: Decimal,

    /// market_value − cost_basis_total
    pub gain_loss: Option<Decimal>,

    /// gain_loss / cost_basis_total as a fraction (0.05 = 5%).
    /// `None` when unpriced or when the cost basis is zero.
    pub gain_loss_ratio: Option<Decimal>,
}

impl ValuationResult {
    pub fn is_priced(&self) -> bool {
        self.status == PriceStatus::Priced
    }
}
