use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stock-portfolio")]
#[command(version, about = "Track stock purchases, prices, gains and allocation")]
#[command(
    long_about = "Record stock lots in a CSV ledger, fetch current and historical prices, and report gain/loss and allocation per position."
)]
pub struct Cli {
    /// Settings file (TOML)
    #[arg(long, global = true, default_value = "stock-portfolio.toml")]
    pub config: PathBuf,

    /// Ledger CSV, overriding `ledger_path` from the settings
    #[arg(long, global = true)]
    pub ledger: Option<PathBuf>,

    /// Price-history CSV used as the first quote source
    #[arg(long, global = true)]
    pub prices: Option<PathBuf>,

    /// Manual price override, SYMBOL=PRICE (repeatable)
    #[arg(long = "price", global = true, value_name = "SYMBOL=PRICE")]
    pub price_overrides: Vec<String>,

    /// Skip the configured online providers
    #[arg(long, global = true)]
    pub offline: bool,

    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every lot in the ledger
    List,

    /// Record a purchase
    Add {
        /// Ticker symbol (e.g. AAPL)
        symbol: String,
        /// Number of shares (fractions allowed)
        quantity: Decimal,
        /// Price paid per share
        cost: Decimal,
        /// Purchase date, YYYY-MM-DD
        date: NaiveDate,
    },

    /// Remove a lot by its index from `list`
    Remove { index: usize },

    /// Show the latest quote for a symbol
    Quote { symbol: String },

    /// Value the portfolio: gain/loss and allocation per position
    Report {
        /// Also write the report to a file (.json for JSON, otherwise CSV)
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Close prices of one symbol over a date range
    History {
        symbol: String,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Portfolio market value over a date range
    ValueHistory {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Also write the series to a CSV file
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Validate a price-history CSV and summarize it per symbol
    Prices {
        /// CSV with Symbol,Date,Open,High,Low,Close,Volume columns
        file: PathBuf,
        /// Write the valid rows back out, normalized
        #[arg(long)]
        export: Option<PathBuf>,
    },
}
