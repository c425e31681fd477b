use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

use crate::errors::CoreError;
use crate::models::lot::Lot;

/// Column headers of the lot ledger CSV, in order.
pub const LEDGER_HEADERS: [&str; 4] = [
    "symbol",
    "quantity",
    "cost_basis_per_share",
    "acquisition_date",
];

/// Date format used in every CSV file of the tracker.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A CSV row that failed validation, with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowRejection {
    pub line: u64,
    pub reason: String,
}

impl std::fmt::Display for RowRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

impl From<RowRejection> for CoreError {
    fn from(r: RowRejection) -> Self {
        CoreError::LedgerRow {
            line: r.line,
            reason: r.reason,
        }
    }
}

/// Outcome of reading a ledger: valid lots plus the rows that were rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerLoad {
    pub lots: Vec<Lot>,
    pub rejected: Vec<RowRejection>,
}

impl LedgerLoad {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Raw ledger row: every field kept as text so that each one can be
/// validated with its own error message.
#[derive(Debug, Deserialize)]
struct LedgerRecord {
    symbol: String,
    quantity: String,
    cost_basis_per_share: String,
    acquisition_date: String,
}

impl LedgerRecord {
    fn into_lot(self) -> Result<Lot, String> {
        let quantity = parse_decimal("quantity", &self.quantity)?;
        if quantity <= Decimal::ZERO {
            return Err(format!("quantity must be positive, got {quantity}"));
        }
        let cost = parse_decimal("cost_basis_per_share", &self.cost_basis_per_share)?;
        let date = parse_date("acquisition_date", &self.acquisition_date)?;
        Lot::new(self.symbol, quantity, cost, date).map_err(|e| e.to_string())
    }

    fn from_lot(lot: &Lot) -> Self {
        Self {
            symbol: lot.symbol().to_string(),
            quantity: lot.quantity().normalize().to_string(),
            cost_basis_per_share: lot.cost_basis_per_share().normalize().to_string(),
            acquisition_date: lot.acquisition_date().format(DATE_FORMAT).to_string(),
        }
    }
}

pub(crate) fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(format!("{field} is empty"));
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| format!("{field} is not a number: '{raw}'"))
}

pub(crate) fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| format!("{field} must be YYYY-MM-DD, got '{}'", raw.trim()))
}

pub(crate) fn reject(rejected: &mut Vec<RowRejection>, line: u64, reason: String) {
    warn!("Rejected CSV row {line}: {reason}");
    rejected.push(RowRejection { line, reason });
}

/// CSV-backed lot ledger.
///
/// Reads validate every row and report rejects per line instead of failing
/// the whole file. Writes replace the file wholesale.
pub struct LedgerStore;

impl LedgerStore {
    /// Read lots from any CSV source with a header row.
    pub fn read<R: Read>(reader: R) -> Result<LedgerLoad, CoreError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        for required in LEDGER_HEADERS {
            if !headers.iter().any(|h| h.eq_ignore_ascii_case(required)) {
                return Err(CoreError::Csv(format!(
                    "ledger is missing the '{required}' column"
                )));
            }
        }
        // Header matching is case-insensitive; normalize so serde finds the fields.
        let headers: csv::StringRecord = headers.iter().map(|h| h.to_lowercase()).collect();

        let mut load = LedgerLoad::default();
        for result in rdr.records() {
            let record = match result {
                Ok(record) => record,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or(0);
                    reject(&mut load.rejected, line, e.to_string());
                    continue;
                }
            };
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let outcome = record
                .deserialize::<LedgerRecord>(Some(&headers))
                .map_err(|e| e.to_string())
                .and_then(LedgerRecord::into_lot);
            match outcome {
                Ok(lot) => load.lots.push(lot),
                Err(reason) => reject(&mut load.rejected, line, reason),
            }
        }
        Ok(load)
    }

    /// Load the ledger file. A missing file is an empty ledger.
    pub fn load(path: impl AsRef<Path>) -> Result<LedgerLoad, CoreError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No ledger at {}, starting empty", path.display());
            return Ok(LedgerLoad::default());
        }
        let file = std::fs::File::open(path)?;
        let load = Self::read(file)?;
        info!(
            "Loaded {} lots from {} ({} rejected)",
            load.lots.len(),
            path.display(),
            load.rejected.len()
        );
        Ok(load)
    }

    /// Write lots as CSV (header included).
    pub fn write<W: Write>(writer: W, lots: &[Lot]) -> Result<(), CoreError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(LEDGER_HEADERS)?;
        for lot in lots {
            let record = LedgerRecord::from_lot(lot);
            wtr.write_record([
                record.symbol,
                record.quantity,
                record.cost_basis_per_share,
                record.acquisition_date,
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Replace the ledger file with `lots`.
    ///
    /// Written through a sibling temp file that is renamed over the target.
    pub fn save(path: impl AsRef<Path>, lots: &[Lot]) -> Result<(), CoreError> {
        let path = path.as_ref();
        let tmp = path.with_extension("csv.tmp");
        {
            let file = std::fs::File::create(&tmp)?;
            Self::write(std::io::BufWriter::new(file), lots)?;
        }
        std::fs::rename(&tmp, path)?;
        info!("Saved {} lots to {}", lots.len(), path.display());
        Ok(())
    }
}
