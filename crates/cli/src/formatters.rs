//! Terminal output for the CLI.
//!
//! The core hands over raw decimals; rounding, "N/A" and percent signs
//! happen only here.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use stock_portfolio_core::models::history::{PerformanceSeries, ValuePoint};
use stock_portfolio_core::models::lot::Lot;
use stock_portfolio_core::models::price::PriceBar;
use stock_portfolio_core::models::report::Report;
use stock_portfolio_core::storage::ledger::RowRejection;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

const NOT_AVAILABLE: &str = "N/A";
const BAR_WIDTH: u32 = 30;

fn money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

fn money_opt(value: Option<Decimal>) -> String {
    value.map(money).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn percent_opt(ratio: Option<Decimal>) -> String {
    ratio
        .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
        .map(|pct| format!("{:.2}%", pct.round_dp(2)))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn render<T: Tabled>(rows: &[T], numeric_from: usize) -> String {
    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.modify(Columns::new(numeric_from..), Alignment::right());
    table.to_string()
}

pub fn format_lots(lots: &[Lot]) -> String {
    if lots.is_empty() {
        return "No holdings in portfolio\n".to_string();
    }

    #[derive(Tabled)]
    struct LotRow {
        #[tabled(rename = "#")]
        index: usize,
        #[tabled(rename = "Symbol")]
        symbol: String,
        #[tabled(rename = "Shares")]
        quantity: String,
        #[tabled(rename = "Cost/Share")]
        cost: String,
        #[tabled(rename = "Purchase Date")]
        date: String,
    }

    let rows: Vec<LotRow> = lots
        .iter()
        .enumerate()
        .map(|(index, lot)| LotRow {
            index,
            symbol: lot.symbol().to_string(),
            quantity: lot.quantity().normalize().to_string(),
            cost: money(lot.cost_basis_per_share()),
            date: lot.acquisition_date().to_string(),
        })
        .collect();

    format!("{}\n", render(&rows, 2))
}

pub fn format_rejections(rejected: &[RowRejection]) -> String {
    let mut out = String::new();
    for r in rejected {
        out.push_str(&format!("skipped {r}\n"));
    }
    out
}

pub fn format_report(report: &Report, quote_failures: &BTreeMap<String, String>) -> String {
    if report.is_empty() {
        return "No holdings in portfolio\n".to_string();
    }

    #[derive(Tabled)]
    struct PositionRow {
        #[tabled(rename = "Symbol")]
        symbol: String,
        #[tabled(rename = "Shares")]
        quantity: String,
        #[tabled(rename = "Avg Cost")]
        avg_cost: String,
        #[tabled(rename = "Price")]
        price: String,
        #[tabled(rename = "Investment")]
        investment: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "Gain/Loss")]
        gain: String,
        #[tabled(rename = "Gain/Loss %")]
        gain_pct: String,
        #[tabled(rename = "Weight")]
        weight: String,
    }

    let rows: Vec<PositionRow> = report
        .lines
        .iter()
        .map(|line| PositionRow {
            symbol: line.symbol().to_string(),
            quantity: line.position.quantity.normalize().to_string(),
            avg_cost: money(line.position.average_cost),
            price: money_opt(line.valuation.current_price),
            investment: money(line.position.cost_basis_total),
            value: money_opt(line.valuation.market_value),
            gain: money_opt(line.valuation.gain_loss),
            gain_pct: percent_opt(line.valuation.gain_loss_ratio),
            weight: percent_opt(line.allocation.weight),
        })
        .collect();

    let totals = &report.totals;
    let mut out = String::from("PORTFOLIO PERFORMANCE REPORT\n\n");
    out.push_str(&render(&rows, 1));
    out.push_str("\n\nSummary:\n");
    out.push_str(&format!("{:<22} {}\n", "Total Investment:", money(totals.total_cost_basis)));
    out.push_str(&format!("{:<22} {}\n", "Total Current Value:", money_opt(totals.total_market_value)));
    out.push_str(&format!("{:<22} {}\n", "Total Gain/Loss:", money_opt(totals.total_gain_loss)));
    out.push_str(&format!("{:<22} {}\n", "Total Gain/Loss %:", percent_opt(totals.total_gain_loss_ratio)));

    let slices = report.allocation_slices();
    if !slices.is_empty() {
        out.push_str("\nAllocation:\n");
        for slice in slices {
            let filled = (slice.weight * Decimal::from(BAR_WIDTH))
                .round()
                .try_into()
                .unwrap_or(0u32);
            out.push_str(&format!(
                "{:<8} {:>8} {}\n",
                slice.symbol,
                percent_opt(Some(slice.weight)),
                "█".repeat(filled as usize)
            ));
        }
    }

    if !quote_failures.is_empty() {
        out.push_str("\nPrice unavailable:\n");
        for (symbol, reason) in quote_failures {
            out.push_str(&format!("  {symbol}: {reason}\n"));
        }
    }
    out
}

pub fn format_performance(series: &PerformanceSeries) -> String {
    if series.is_empty() {
        return format!("No data available for {}\n", series.symbol);
    }

    #[derive(Tabled)]
    struct PointRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Close")]
        close: String,
    }

    let rows: Vec<PointRow> = series
        .points
        .iter()
        .map(|p| PointRow {
            date: p.date.to_string(),
            close: money(p.price),
        })
        .collect();

    format!(
        "{} Historical Performance\n{}\nChange: {}\n",
        series.symbol,
        render(&rows, 1),
        percent_opt(series.change_ratio())
    )
}

pub fn format_value_series(series: &[ValuePoint]) -> String {
    if series.is_empty() {
        return "No price history in range\n".to_string();
    }

    #[derive(Tabled)]
    struct ValueRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "Invested")]
        invested: String,
        #[tabled(rename = "Unpriced")]
        unpriced: String,
    }

    let rows: Vec<ValueRow> = series
        .iter()
        .map(|p| ValueRow {
            date: p.date.to_string(),
            value: money(p.market_value),
            invested: money(p.invested),
            unpriced: p.unpriced.join(" "),
        })
        .collect();

    format!("{}\n", render(&rows, 1))
}

pub fn format_price_summary(bars: &[PriceBar]) -> String {
    if bars.is_empty() {
        return "No valid price rows\n".to_string();
    }

    #[derive(Tabled)]
    struct SymbolRow {
        #[tabled(rename = "Symbol")]
        symbol: String,
        #[tabled(rename = "Rows")]
        rows: usize,
        #[tabled(rename = "First")]
        first: String,
        #[tabled(rename = "Last")]
        last: String,
        #[tabled(rename = "Last Close")]
        close: String,
    }

    let mut by_symbol: BTreeMap<&str, Vec<&PriceBar>> = BTreeMap::new();
    for bar in bars {
        by_symbol.entry(bar.symbol.as_str()).or_default().push(bar);
    }

    let rows: Vec<SymbolRow> = by_symbol
        .into_iter()
        .filter_map(|(symbol, bars)| {
            let first = bars.iter().min_by_key(|b| b.date)?;
            let last = bars.iter().max_by_key(|b| b.date)?;
            Some(SymbolRow {
                symbol: symbol.to_string(),
                rows: bars.len(),
                first: first.date.to_string(),
                last: last.date.to_string(),
                close: money(last.close),
            })
        })
        .collect();

    format!("{}\n", render(&rows, 1))
}
