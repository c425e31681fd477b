use rust_decimal::Decimal;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::errors::CoreError;
use crate::models::history::ValuePoint;
use crate::models::report::Report;
use super::ledger::DATE_FORMAT;

/// Column headers of the exported report CSV.
pub const REPORT_HEADERS: [&str; 11] = [
    "symbol",
    "quantity",
    "average_cost",
    "cost_basis_total",
    "current_price",
    "market_value",
    "gain_loss",
    "gain_loss_ratio",
    "weight",
    "status",
    "lot_count",
];

fn cell(value: Option<Decimal>) -> String {
    value.map(|v| v.normalize().to_string()).unwrap_or_default()
}

/// Writes reports in machine-readable form.
///
/// Numbers are raw decimals; undefined values are empty cells. Currency
/// symbols and rounding are left to whatever reads the file.
pub struct ReportExporter;

impl ReportExporter {
    pub fn write_csv<W: Write>(writer: W, report: &Report) -> Result<(), CoreError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(REPORT_HEADERS)?;
        for line in &report.lines {
            let v = &line.valuation;
            wtr.write_record([
                line.symbol().to_string(),
                line.position.quantity.normalize().to_string(),
                line.position.average_cost.normalize().to_string(),
                line.position.cost_basis_total.normalize().to_string(),
                cell(v.current_price),
                cell(v.market_value),
                cell(v.gain_loss),
                cell(v.gain_loss_ratio),
                cell(line.allocation.weight),
                format!("{:?}", v.status),
                line.position.lot_count.to_string(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_json<W: Write>(mut writer: W, report: &Report) -> Result<(), CoreError> {
        serde_json::to_writer_pretty(&mut writer, report)?;
        writer.flush()?;
        Ok(())
    }

    /// Export to `path`; a `.json` extension selects JSON, anything else CSV.
    pub fn export(path: impl AsRef<Path>, report: &Report) -> Result<(), CoreError> {
        let path = path.as_ref();
        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::write_json(&mut file, report)?;
        } else {
            Self::write_csv(&mut file, report)?;
        }
        // Dropping a BufWriter swallows flush errors.
        file.flush()?;
        info!("Exported report ({} lines) to {}", report.lines.len(), path.display());
        Ok(())
    }

    /// Value series as CSV: date, market_value, invested, unpriced symbols.
    pub fn write_value_series<W: Write>(writer: W, series: &[ValuePoint]) -> Result<(), CoreError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(["date", "market_value", "invested", "unpriced"])?;
        for point in series {
            wtr.write_record([
                point.date.format(DATE_FORMAT).to_string(),
                point.market_value.normalize().to_string(),
                point.invested.normalize().to_string(),
                point.unpriced.join(" "),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }
}
