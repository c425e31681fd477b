pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use chrono::{DateTime, NaiveDate, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use tracing::{info, warn};

use errors::CoreError;
use models::{
    history::{PerformanceSeries, ValuePoint},
    lot::Lot,
    price::Quote,
    report::{RefreshOutcome, Report},
    settings::{Settings, MAX_HISTORY_DAYS},
};
use services::{
    history_service::HistoryService, quote_service::QuoteService, report_service::ReportService,
};
use storage::ledger::{LedgerStore, RowRejection};

/// Extra days of history fetched before a chart range, so the first day
/// can be priced with the last close before it.
const HISTORY_LEAD_IN_DAYS: i64 = 7;

/// Main entry point for the stock portfolio core library.
/// Holds the lot ledger and the services needed to price and report on it.
#[must_use]
pub struct PortfolioTracker {
    settings: Settings,
    lots: Vec<Lot>,
    rejected: Vec<RowRejection>,
    quote_service: QuoteService,
    report_service: ReportService,
    history_service: HistoryService,
    /// Tracks whether the lots changed since the last load/save.
    dirty: bool,
}

impl std::fmt::Debug for PortfolioTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioTracker")
            .field("ledger", &self.settings.ledger_path)
            .field("lots", &self.lots.len())
            .field("rejected", &self.rejected.len())
            .field("sources", &self.quote_service.registry().names())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl PortfolioTracker {
    /// Open the ledger named in `settings`, with quote sources built from
    /// the same settings.
    pub fn open(settings: Settings) -> Result<Self, CoreError> {
        let quote_service = QuoteService::from_settings(&settings)?;
        Self::open_with(settings, quote_service)
    }

    /// Open the ledger named in `settings` with a caller-supplied quote service.
    pub fn open_with(settings: Settings, quote_service: QuoteService) -> Result<Self, CoreError> {
        settings.validate()?;
        let load = LedgerStore::load(&settings.ledger_path)?;
        let mut tracker = Self::from_lots(settings, load.lots, quote_service);
        tracker.rejected = load.rejected;
        Ok(tracker)
    }

    /// Build a tracker over lots that are already in memory.
    pub fn from_lots(settings: Settings, lots: Vec<Lot>, quote_service: QuoteService) -> Self {
        Self {
            settings,
            lots,
            rejected: Vec::new(),
            quote_service,
            report_service: ReportService::new(),
            history_service: HistoryService::new(),
            dirty: false,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns `true` if lots changed since the last load or save.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    /// Persist the lots to the ledger file. Clears the unsaved-changes flag.
    pub fn save(&mut self) -> Result<(), CoreError> {
        LedgerStore::save(&self.settings.ledger_path, &self.lots)?;
        self.dirty = false;
        Ok(())
    }

    // ── Lot Management ──────────────────────────────────────────────

    /// All lots in ledger order.
    #[must_use]
    pub fn lots(&self) -> &[Lot] {
        &self.lots
    }

    /// Ledger rows rejected on load, with their reasons.
    #[must_use]
    pub fn rejected_rows(&self) -> &[RowRejection] {
        &self.rejected
    }

    /// Record a purchase. Returns the index of the new lot.
    pub fn add_lot(
        &mut self,
        symbol: &str,
        quantity: Decimal,
        cost_basis_per_share: Decimal,
        acquisition_date: NaiveDate,
    ) -> Result<usize, CoreError> {
        let lot = Lot::new(symbol, quantity, cost_basis_per_share, acquisition_date)?;
        info!("Added {} shares of {} to portfolio", lot.quantity(), lot.symbol());
        self.lots.push(lot);
        self.dirty = true;
        Ok(self.lots.len() - 1)
    }

    /// Remove the lot at `index` (ledger order) and return it.
    pub fn remove_lot(&mut self, index: usize) -> Result<Lot, CoreError> {
        if index >= self.lots.len() {
            return Err(CoreError::LotNotFound(index));
        }
        let lot = self.lots.remove(index);
        self.dirty = true;
        Ok(lot)
    }

    /// Lots for one symbol (case-insensitive), in ledger order.
    #[must_use]
    pub fn lots_for_symbol(&self, symbol: &str) -> Vec<&Lot> {
        let upper = symbol.trim().to_uppercase();
        self.lots.iter().filter(|l| l.symbol() == upper).collect()
    }

    /// Distinct symbols held, alphabetical.
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        self.lots
            .iter()
            .map(|l| l.symbol().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    // ── Quotes & Reports ────────────────────────────────────────────

    /// Latest quote for a single symbol.
    pub async fn quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        self.quote_service.fetch_quote(symbol, Utc::now()).await
    }

    /// Fetch quotes for every held symbol and assemble a fresh report.
    pub async fn refresh(&self) -> Result<RefreshOutcome, CoreError> {
        self.refresh_at(Utc::now()).await
    }

    /// Same as [`refresh`](Self::refresh) with an explicit clock for quote staleness.
    pub async fn refresh_at(&self, now: DateTime<Utc>) -> Result<RefreshOutcome, CoreError> {
        let symbols = self.symbols();
        info!("Refreshing report for {} symbols", symbols.len());

        let book = self.quote_service.fetch_quotes(&symbols, now).await;
        let report = self.report_service.assemble(&self.lots, &book.quotes)?;

        Ok(RefreshOutcome {
            report,
            quote_failures: book.unavailable,
        })
    }

    /// Build a report from quotes the caller already holds.
    pub fn report_with_quotes(&self, quotes: &HashMap<String, Quote>) -> Result<Report, CoreError> {
        self.report_service.assemble(&self.lots, quotes)
    }

    // ── Charts ──────────────────────────────────────────────────────

    /// Date range of `settings.history_days` ending at `today`.
    #[must_use]
    pub fn default_history_range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let from = today - chrono::Duration::days(i64::from(self.settings.history_days));
        (from, today)
    }

    /// Close prices of one symbol over a range (line chart).
    pub async fn symbol_performance(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<PerformanceSeries, CoreError> {
        validate_range(from, to)?;
        let symbol = models::lot::normalize_symbol(symbol)?;
        let points = self.quote_service.fetch_history(&symbol, from, to).await?;
        let series = self
            .history_service
            .performance_series(&symbol, &points, from, to);
        info!("Performance series for {symbol}: {} points", series.points.len());
        Ok(series)
    }

    /// Portfolio value over a range (line chart).
    ///
    /// Symbols whose history cannot be fetched are left unpriced on every
    /// day instead of failing the whole series.
    pub async fn portfolio_history(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ValuePoint>, CoreError> {
        validate_range(from, to)?;
        let lead_in = from - chrono::Duration::days(HISTORY_LEAD_IN_DAYS);

        let symbols = self.symbols();
        let lookups = symbols.iter().map(|symbol| async move {
            (symbol.clone(), self.quote_service.fetch_history(symbol, lead_in, to).await)
        });

        let mut histories = HashMap::new();
        for (symbol, result) in join_all(lookups).await {
            match result {
                Ok(points) => {
                    histories.insert(symbol, points);
                }
                Err(e) => warn!("No price history for {symbol}: {e}"),
            }
        }

        self.history_service
            .portfolio_value_series(&self.lots, &histories, from, to)
    }
}

fn validate_range(from: NaiveDate, to: NaiveDate) -> Result<(), CoreError> {
    if from > to {
        return Err(CoreError::ValidationError(format!(
            "'from' date ({from}) must not be after 'to' date ({to})"
        )));
    }
    let range_days = (to - from).num_days();
    if range_days > i64::from(MAX_HISTORY_DAYS) {
        return Err(CoreError::ValidationError(format!(
            "History range of {range_days} days exceeds maximum of {MAX_HISTORY_DAYS} days (10 years)"
        )));
    }
    Ok(())
}
