use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::path::Path;
use stock_portfolio_core::errors::CoreError;
use stock_portfolio_core::models::history::ValuePoint;
use stock_portfolio_core::models::settings::{ProviderKind, Settings};
use stock_portfolio_core::providers::csv_history::CsvQuoteSource;
use stock_portfolio_core::providers::fixed::FixedQuoteSource;
use stock_portfolio_core::providers::registry::QuoteSourceRegistry;
use stock_portfolio_core::services::quote_service::QuoteService;
use stock_portfolio_core::storage::price_history::PriceHistoryStore;
use stock_portfolio_core::storage::report_export::ReportExporter;
use stock_portfolio_core::PortfolioTracker;
use tracing::{info, warn};

use crate::cli::{Cli, Commands};
use crate::formatters;

/// Load settings and the ledger, and wire up quote sources from the flags.
///
/// Source order: `--price` overrides, then `--prices` CSV, then whatever
/// the settings list (only the `csv` provider when `--offline`).
pub fn open_tracker(cli: &Cli) -> Result<PortfolioTracker> {
    let mut settings = Settings::load(&cli.config)
        .with_context(|| format!("Failed to load settings from {}", cli.config.display()))?
        .with_env_overrides();
    if let Some(ledger) = &cli.ledger {
        settings.ledger_path = ledger.clone();
    }

    let mut registry = if cli.offline {
        offline_registry(&settings)?
    } else {
        match QuoteSourceRegistry::from_settings(&settings) {
            Ok(registry) => registry,
            Err(CoreError::NoProvider) => {
                warn!("No configured quote provider could be started");
                QuoteSourceRegistry::new()
            }
            Err(e) => return Err(e.into()),
        }
    };

    if let Some(path) = &cli.prices {
        let csv = CsvQuoteSource::load(path)
            .with_context(|| format!("Failed to read price history {}", path.display()))?;
        registry.register_first(Box::new(csv));
    }
    if !cli.price_overrides.is_empty() {
        let fixed = FixedQuoteSource::parse_overrides(&cli.price_overrides, Utc::now())?;
        registry.register_first(Box::new(fixed));
    }

    let quote_service = QuoteService::new(registry)
        .with_timeout(settings.quote_timeout())
        .with_max_age(settings.max_quote_age());

    let ledger_path = settings.ledger_path.clone();
    let tracker = PortfolioTracker::open_with(settings, quote_service)
        .with_context(|| format!("Failed to open ledger {}", ledger_path.display()))?;

    eprint!("{}", formatters::format_rejections(tracker.rejected_rows()));
    Ok(tracker)
}

fn offline_registry(settings: &Settings) -> Result<QuoteSourceRegistry> {
    let mut registry = QuoteSourceRegistry::new();
    if settings.providers.contains(&ProviderKind::Csv) {
        if let Some(path) = &settings.price_history_path {
            registry.register(Box::new(CsvQuoteSource::load(path)?));
        }
    }
    Ok(registry)
}

pub async fn dispatch(cli: &Cli, tracker: &mut PortfolioTracker) -> Result<()> {
    match &cli.command {
        Commands::List => {
            if cli.json {
                return print_json(&tracker.lots());
            }
            print!("{}", formatters::format_lots(tracker.lots()));
            Ok(())
        }

        Commands::Add {
            symbol,
            quantity,
            cost,
            date,
        } => {
            ensure_clean_ledger(tracker)?;
            let index = tracker.add_lot(symbol, *quantity, *cost, *date)?;
            tracker.save()?;
            let lot = &tracker.lots()[index];
            println!(
                "Added lot #{index}: {} {} @ {} on {}",
                lot.quantity().normalize(),
                lot.symbol(),
                lot.cost_basis_per_share().normalize(),
                lot.acquisition_date()
            );
            Ok(())
        }

        Commands::Remove { index } => {
            ensure_clean_ledger(tracker)?;
            let lot = tracker.remove_lot(*index)?;
            tracker.save()?;
            println!(
                "Removed lot #{index}: {} {} bought {}",
                lot.quantity().normalize(),
                lot.symbol(),
                lot.acquisition_date()
            );
            Ok(())
        }

        Commands::Quote { symbol } => {
            let quote = tracker.quote(symbol).await?;
            if cli.json {
                return print_json(&quote);
            }
            println!(
                "{}: {} (as of {})",
                quote.symbol,
                format!("{:.2}", quote.price.round_dp(2)),
                quote.as_of.format("%Y-%m-%d %H:%M UTC")
            );
            Ok(())
        }

        Commands::Report { export } => {
            let outcome = tracker.refresh().await?;
            if let Some(path) = export {
                ReportExporter::export(path, &outcome.report)
                    .with_context(|| format!("Failed to export report to {}", path.display()))?;
                info!("Report written to {}", path.display());
            }
            if cli.json {
                return print_json(&outcome);
            }
            print!(
                "{}",
                formatters::format_report(&outcome.report, &outcome.quote_failures)
            );
            Ok(())
        }

        Commands::History { symbol, from, to } => {
            let (from, to) = resolve_range(tracker, *from, *to);
            let series = tracker.symbol_performance(symbol, from, to).await?;
            if cli.json {
                return print_json(&series);
            }
            print!("{}", formatters::format_performance(&series));
            Ok(())
        }

        Commands::ValueHistory { from, to, export } => {
            let (from, to) = resolve_range(tracker, *from, *to);
            let series = tracker.portfolio_history(from, to).await?;
            if let Some(path) = export {
                write_value_series(path, &series)?;
            }
            if cli.json {
                return print_json(&series);
            }
            print!("{}", formatters::format_value_series(&series));
            Ok(())
        }

        Commands::Prices { file, export } => {
            let load = PriceHistoryStore::load(file)
                .with_context(|| format!("Failed to read price history {}", file.display()))?;
            eprint!("{}", formatters::format_rejections(&load.rejected));
            if let Some(path) = export {
                PriceHistoryStore::export(path, &load.bars)?;
            }
            if cli.json {
                return print_json(&load.bars);
            }
            print!("{}", formatters::format_price_summary(&load.bars));
            Ok(())
        }
    }
}

/// Saving drops rows that failed to parse, so edits wait until the
/// ledger loads cleanly.
fn ensure_clean_ledger(tracker: &PortfolioTracker) -> Result<()> {
    let rejected = tracker.rejected_rows().len();
    if rejected > 0 {
        bail!(
            "ledger {} has {rejected} malformed row(s); fix them before editing",
            tracker.settings().ledger_path.display()
        );
    }
    Ok(())
}

fn resolve_range(
    tracker: &PortfolioTracker,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> (NaiveDate, NaiveDate) {
    let to = to.unwrap_or_else(|| Utc::now().date_naive());
    let from = from.unwrap_or_else(|| tracker.default_history_range(to).0);
    (from, to)
}

fn write_value_series(path: &Path, series: &[ValuePoint]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    ReportExporter::write_value_series(std::io::BufWriter::new(file), series)?;
    info!("Value series written to {}", path.display());
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
