use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

use super::ledger::{parse_date, parse_decimal, reject, RowRejection, DATE_FORMAT};
use crate::errors::CoreError;
use crate::models::lot::normalize_symbol;
use crate::models::price::PriceBar;

/// Column headers of a price-history CSV, in order.
pub const PRICE_HISTORY_HEADERS: [&str; 7] =
    ["Symbol", "Date", "Open", "High", "Low", "Close", "Volume"];

/// Outcome of reading a price-history file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceHistoryLoad {
    pub bars: Vec<PriceBar>,
    pub rejected: Vec<RowRejection>,
}

#[derive(Debug, Deserialize)]
struct BarRecord {
    symbol: String,
    date: String,
    open: String,
    high: String,
    low: String,
    close: String,
    volume: String,
}

impl BarRecord {
    fn into_bar(self) -> Result<PriceBar, String> {
        let symbol = normalize_symbol(&self.symbol).map_err(|e| e.to_string())?;
        let date = parse_date("Date", &self.date)?;
        let open = non_negative("Open", &self.open)?;
        let high = non_negative("High", &self.high)?;
        let low = non_negative("Low", &self.low)?;
        let close = non_negative("Close", &self.close)?;
        if low > high {
            return Err(format!("Low {low} is above High {high}"));
        }
        let volume = volume(&self.volume)?;
        Ok(PriceBar {
            symbol,
            date,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

fn non_negative(field: &str, raw: &str) -> Result<Decimal, String> {
    let value = parse_decimal(field, raw)?;
    if value < Decimal::ZERO {
        return Err(format!("{field} must not be negative, got {value}"));
    }
    Ok(value)
}

/// Volumes are whole shares, but some exports write them as "1200.0".
fn volume(raw: &str) -> Result<u64, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    if let Ok(v) = raw.parse::<u64>() {
        return Ok(v);
    }
    let value = parse_decimal("Volume", raw)?;
    if value < Decimal::ZERO || !value.fract().is_zero() {
        return Err(format!("Volume must be a whole non-negative number, got {raw}"));
    }
    value
        .to_u64()
        .ok_or_else(|| format!("Volume out of range: {raw}"))
}

/// Importer/exporter for daily OHLCV history in CSV form.
pub struct PriceHistoryStore;

impl PriceHistoryStore {
    /// Read bars from a CSV source. Header names are case-insensitive.
    /// Invalid rows are rejected per line; valid ones are sorted by (symbol, date).
    pub fn read<R: Read>(reader: R) -> Result<PriceHistoryLoad, CoreError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        for required in PRICE_HISTORY_HEADERS {
            if !headers.iter().any(|h| h.eq_ignore_ascii_case(required)) {
                return Err(CoreError::Csv(format!(
                    "price history is missing the '{required}' column"
                )));
            }
        }
        let headers: csv::StringRecord = headers.iter().map(|h| h.to_lowercase()).collect();

        let mut load = PriceHistoryLoad::default();
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
                .deserialize::<BarRecord>(Some(&headers))
                .map_err(|e| e.to_string())
                .and_then(BarRecord::into_bar);
            match outcome {
                Ok(bar) => load.bars.push(bar),
                Err(reason) => reject(&mut load.rejected, line, reason),
            }
        }
        load.bars
            .sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.date.cmp(&b.date)));
        Ok(load)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<PriceHistoryLoad, CoreError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let load = Self::read(file)?;
        info!(
            "Imported {} price bars from {} ({} rejected)",
            load.bars.len(),
            path.display(),
            load.rejected.len()
        );
        Ok(load)
    }

    pub fn write<W: Write>(writer: W, bars: &[PriceBar]) -> Result<(), CoreError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(PRICE_HISTORY_HEADERS)?;
        for bar in bars {
            wtr.write_record([
                bar.symbol.clone(),
                bar.date.format(DATE_FORMAT).to_string(),
                bar.open.normalize().to_string(),
                bar.high.normalize().to_string(),
                bar.low.normalize().to_string(),
                bar.close.normalize().to_string(),
                bar.volume.to_string(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn export(path: impl AsRef<Path>, bars: &[PriceBar]) -> Result<(), CoreError> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)?;
        Self::write(std::io::BufWriter::new(file), bars)?;
        info!("Exported {} price bars to {}", bars.len(), path.display());
        Ok(())
    }
}
