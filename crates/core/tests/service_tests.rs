// ═══════════════════════════════════════════════════════════════════
// Service Tests: ValuationService, AllocationService, ReportService,
// QuoteService, HistoryService
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use stock_portfolio_core::errors::CoreError;
use stock_portfolio_core::models::lot::Lot;
use stock_portfolio_core::models::price::{PricePoint, Quote};
use stock_portfolio_core::models::valuation::PriceStatus;
use stock_portfolio_core::providers::fixed::FixedQuoteSource;
use stock_portfolio_core::providers::registry::QuoteSourceRegistry;
use stock_portfolio_core::providers::traits::QuoteSource;
use stock_portfolio_core::services::allocation_service::AllocationService;
use stock_portfolio_core::services::history_service::HistoryService;
use stock_portfolio_core::services::quote_service::QuoteService;
use stock_portfolio_core::services::report_service::ReportService;
use stock_portfolio_core::services::valuation_service::ValuationService;

// ═══════════════════════════════════════════════════════════════════
// Helpers & mock sources
// ═══════════════════════════════════════════════════════════════════

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 15, 0, 0).unwrap()
}

fn lot(symbol: &str, qty: Decimal, cost: Decimal) -> Lot {
    Lot::new(symbol, qty, cost, date(2024, 1, 2)).unwrap()
}

fn quote(symbol: &str, price: Decimal) -> Quote {
    Quote::new(symbol, price, now()).unwrap()
}

fn quotes(pairs: &[(&str, Decimal)]) -> HashMap<String, Quote> {
    pairs
        .iter()
        .map(|(s, p)| (s.to_string(), quote(s, *p)))
        .collect()
}

fn assert_close(actual: Decimal, expected: Decimal) {
    assert!(
        (actual - expected).abs() < dec!(0.000000001),
        "expected {expected}, got {actual}"
    );
}

/// Always fails, counting how often it was asked.
struct FailingSource {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl QuoteSource for FailingSource {
    fn name(&self) -> &str {
        "Failing"
    }

    async fn fetch(&self, symbol: &str) -> Result<Quote, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CoreError::Network(format!("connection refused for {symbol}")))
    }

    async fn fetch_history(
        &self,
        _symbol: &str,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CoreError::Network("connection refused".into()))
    }
}

/// Answers only after a long delay.
struct SlowSource;

#[async_trait]
impl QuoteSource for SlowSource {
    fn name(&self) -> &str {
        "Slow"
    }

    async fn fetch(&self, symbol: &str) -> Result<Quote, CoreError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Quote::new(symbol, dec!(1), now())
    }

    async fn fetch_history(
        &self,
        _symbol: &str,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Vec::new())
    }
}

/// Returns a quote for a different symbol than the one requested.
struct WrongSymbolSource;

#[async_trait]
impl QuoteSource for WrongSymbolSource {
    fn name(&self) -> &str {
        "Wrong symbol"
    }

    async fn fetch(&self, _symbol: &str) -> Result<Quote, CoreError> {
        Quote::new("OTHER", dec!(1), now())
    }

    async fn fetch_history(
        &self,
        _symbol: &str,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        Ok(Vec::new())
    }
}

fn service_with(sources: Vec<Box<dyn QuoteSource>>) -> QuoteService {
    let mut registry = QuoteSourceRegistry::new();
    for source in sources {
        registry.register(source);
    }
    QuoteService::new(registry)
}

// ═══════════════════════════════════════════════════════════════════
// ValuationService
// ═══════════════════════════════════════════════════════════════════

mod valuation {
    use super::*;

    #[test]
    fn aggregates_lots_into_position() {
        let lots = vec![lot("AAA", dec!(10), dec!(100)), lot("AAA", dec!(5), dec!(130))];
        let positions = ValuationService::new().build_positions(&lots).unwrap();

        assert_eq!(positions.len(), 1);
        let p = &positions[0];
        assert_eq!(p.symbol, "AAA");
        assert_eq!(p.quantity, dec!(15));
        assert_eq!(p.cost_basis_total, dec!(1650));
        assert_eq!(p.average_cost, dec!(110));
        assert_eq!(p.lot_count, 2);
    }

    #[test]
    fn positions_tracks_acquisition_range() {
        let lots = vec![
            Lot::new("AAA", dec!(1), dec!(1), date(2024, 3, 1)).unwrap(),
            Lot::new("AAA", dec!(1), dec!(1), date(2023, 7, 1)).unwrap(),
        ];
        let p = &ValuationService::new().build_positions(&lots).unwrap()[0];
        assert_eq!(p.first_acquired, date(2023, 7, 1));
        assert_eq!(p.last_acquired, date(2024, 3, 1));
    }

    #[test]
    fn quantity_is_sum_of_lots() {
        let lots = vec![
            lot("AAA", dec!(0.5), dec!(10)),
            lot("BBB", dec!(2), dec!(10)),
            lot("AAA", dec!(1.25), dec!(12)),
        ];
        let positions = ValuationService::new().build_positions(&lots).unwrap();
        let aaa = positions.iter().find(|p| p.symbol == "AAA").unwrap();
        assert_eq!(aaa.quantity, dec!(1.75));
        assert_eq!(aaa.cost_basis_total, dec!(20));
    }

    #[test]
    fn priced_position() {
        let lots = vec![lot("AAA", dec!(10), dec!(100)), lot("AAA", dec!(5), dec!(130))];
        let valued = ValuationService::new()
            .value(&lots, &quotes(&[("AAA", dec!(120))]))
            .unwrap();
        let (_, v) = &valued[0];

        assert_eq!(v.status, PriceStatus::Priced);
        assert_eq!(v.current_price, Some(dec!(120)));
        assert_eq!(v.quote_as_of, Some(now()));
        assert_eq!(v.market_value, Some(dec!(1800)));
        assert_eq!(v.gain_loss, Some(dec!(150)));
        assert_close(v.gain_loss_ratio.unwrap(), dec!(150) / dec!(1650));
    }

    #[test]
    fn unpriced_position_has_undefined_values() {
        let lots = vec![lot("BBB", dec!(4), dec!(50))];
        let valued = ValuationService::new().value(&lots, &HashMap::new()).unwrap();
        let (_, v) = &valued[0];

        assert_eq!(v.status, PriceStatus::Unavailable);
        assert!(v.current_price.is_none());
        assert!(v.market_value.is_none());
        assert!(v.gain_loss.is_none());
        assert!(v.gain_loss_ratio.is_none());
        assert_eq!(v.cost_basis_total, dec!(200));
    }

    #[test]
    fn zero_cost_basis_gives_undefined_ratio() {
        let lots = vec![lot("GIFT", dec!(3), Decimal::ZERO)];
        let valued = ValuationService::new()
            .value(&lots, &quotes(&[("GIFT", dec!(20))]))
            .unwrap();
        let (_, v) = &valued[0];

        assert_eq!(v.market_value, Some(dec!(60)));
        assert_eq!(v.gain_loss, Some(dec!(60)));
        assert!(v.gain_loss_ratio.is_none());
    }

    #[test]
    fn zero_price_is_a_valid_quote() {
        let lots = vec![lot("DEAD", dec!(10), dec!(5))];
        let valued = ValuationService::new()
            .value(&lots, &quotes(&[("DEAD", Decimal::ZERO)]))
            .unwrap();
        let (_, v) = &valued[0];

        assert_eq!(v.market_value, Some(Decimal::ZERO));
        assert_eq!(v.gain_loss, Some(dec!(-50)));
        assert_eq!(v.gain_loss_ratio, Some(dec!(-1)));
    }

    #[test]
    fn overflow_is_an_error() {
        let lots = vec![lot("BIG", Decimal::MAX, dec!(1))];
        let result = ValuationService::new().value(&lots, &quotes(&[("BIG", dec!(10))]));
        assert!(matches!(result, Err(CoreError::ValidationError(_))));
    }

    #[test]
    fn gain_ratio_overflow_is_an_error_not_undefined() {
        let lots = vec![lot("TINY", dec!(1), dec!(0.0000000000000000000000000001))];
        let result = ValuationService::new().value(&lots, &quotes(&[("TINY", dec!(10))]));
        assert!(matches!(result, Err(CoreError::ValidationError(ref m)) if m.contains("ratio")));
    }
}

// ═══════════════════════════════════════════════════════════════════
// AllocationService
// ═══════════════════════════════════════════════════════════════════

mod allocation {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        let lots = vec![
            lot("AAA", dec!(3), dec!(10)),
            lot("BBB", dec!(7), dec!(10)),
            lot("CCC", dec!(11), dec!(10)),
        ];
        let valued = ValuationService::new()
            .value(
                &lots,
                &quotes(&[("AAA", dec!(33.33)), ("BBB", dec!(17.1)), ("CCC", dec!(9.99))]),
            )
            .unwrap();
        let weights = AllocationService::new().allocate(&valued).unwrap();

        let sum: Decimal = weights.iter().filter_map(|w| w.weight).sum();
        assert_close(sum, Decimal::ONE);
        assert!(weights.iter().all(|w| !w.excluded));
    }

    #[test]
    fn unpriced_position_is_excluded() {
        let lots = vec![lot("AAA", dec!(10), dec!(100)), lot("BBB", dec!(4), dec!(50))];
        let valued = ValuationService::new()
            .value(&lots, &quotes(&[("AAA", dec!(120))]))
            .unwrap();
        let weights = AllocationService::new().allocate(&valued).unwrap();

        let aaa = weights.iter().find(|w| w.symbol == "AAA").unwrap();
        let bbb = weights.iter().find(|w| w.symbol == "BBB").unwrap();
        assert_eq!(aaa.weight, Some(Decimal::ONE));
        assert!(bbb.weight.is_none());
        assert!(bbb.excluded);
    }

    #[test]
    fn zero_total_leaves_every_weight_undefined() {
        let lots = vec![lot("AAA", dec!(10), dec!(1)), lot("BBB", dec!(10), dec!(1))];
        let valued = ValuationService::new()
            .value(&lots, &quotes(&[("AAA", Decimal::ZERO), ("BBB", Decimal::ZERO)]))
            .unwrap();
        let weights = AllocationService::new().allocate(&valued).unwrap();
        assert!(weights.iter().all(|w| w.weight.is_none()));
    }
}

// ═══════════════════════════════════════════════════════════════════
// ReportService
// ═══════════════════════════════════════════════════════════════════

mod report {
    use super::*;

    #[test]
    fn mixed_priced_and_unpriced() {
        let lots = vec![
            lot("AAA", dec!(10), dec!(100)),
            lot("AAA", dec!(5), dec!(130)),
            lot("BBB", dec!(4), dec!(50)),
        ];
        let report = ReportService::new()
            .assemble(&lots, &quotes(&[("AAA", dec!(120))]))
            .unwrap();

        let aaa = report.line("AAA").unwrap();
        assert_eq!(aaa.allocation.weight, Some(Decimal::ONE));
        assert_eq!(report.unavailable_symbols(), vec!["BBB"]);

        let t = &report.totals;
        assert_eq!(t.total_cost_basis, dec!(1850));
        assert_eq!(t.priced_cost_basis, dec!(1650));
        assert_eq!(t.total_market_value, Some(dec!(1800)));
        assert_eq!(t.total_gain_loss, Some(dec!(150)));
        assert_close(t.total_gain_loss_ratio.unwrap(), dec!(150) / dec!(1650));
        assert_eq!(t.priced_positions, 1);
        assert_eq!(t.unavailable_positions, 1);
    }

    #[test]
    fn all_quotes_missing() {
        let lots = vec![lot("AAA", dec!(10), dec!(100)), lot("BBB", dec!(4), dec!(50))];
        let report = ReportService::new().assemble(&lots, &HashMap::new()).unwrap();

        assert_eq!(report.lines.len(), 2);
        assert!(report.lines.iter().all(|l| !l.valuation.is_priced()));
        assert!(report.lines.iter().all(|l| l.allocation.weight.is_none()));
        assert!(report.totals.total_market_value.is_none());
        assert!(report.totals.total_gain_loss.is_none());
        assert!(report.totals.total_gain_loss_ratio.is_none());
        assert_eq!(report.totals.total_cost_basis, dec!(1200));
    }

    #[test]
    fn empty_ledger_gives_empty_report() {
        let report = ReportService::new().assemble(&[], &HashMap::new()).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.totals.total_cost_basis, Decimal::ZERO);
        assert!(report.totals.total_market_value.is_none());
    }

    #[test]
    fn ordering_by_value_then_unpriced_alphabetical() {
        let lots = vec![
            lot("ZZZ", dec!(1), dec!(1)),
            lot("CCC", dec!(1), dec!(1)),
            lot("AAA", dec!(1), dec!(1)),
            lot("BBB", dec!(1), dec!(1)),
            lot("YYY", dec!(1), dec!(1)),
            lot("XXX", dec!(1), dec!(1)),
        ];
        let report = ReportService::new()
            .assemble(
                &lots,
                &quotes(&[("CCC", dec!(5)), ("AAA", dec!(50)), ("BBB", dec!(5)), ("XXX", dec!(20))]),
            )
            .unwrap();

        let order: Vec<&str> = report.lines.iter().map(|l| l.symbol()).collect();
        assert_eq!(order, vec!["AAA", "XXX", "BBB", "CCC", "YYY", "ZZZ"]);
    }

    #[test]
    fn same_inputs_same_report() {
        let lots = vec![
            lot("AAA", dec!(10), dec!(100)),
            lot("BBB", dec!(4), dec!(50)),
            lot("CCC", dec!(7), dec!(12.5)),
        ];
        let q = quotes(&[("AAA", dec!(120)), ("CCC", dec!(13))]);
        let service = ReportService::new();
        assert_eq!(
            service.assemble(&lots, &q).unwrap(),
            service.assemble(&lots, &q).unwrap()
        );
    }

    #[test]
    fn lot_order_does_not_matter() {
        let mut lots = vec![
            lot("AAA", dec!(10), dec!(100)),
            lot("BBB", dec!(4), dec!(50)),
            lot("AAA", dec!(5), dec!(130)),
        ];
        let q = quotes(&[("AAA", dec!(120)), ("BBB", dec!(40))]);
        let first = ReportService::new().assemble(&lots, &q).unwrap();
        lots.reverse();
        let second = ReportService::new().assemble(&lots, &q).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn quotes_for_unheld_symbols_are_ignored() {
        let lots = vec![lot("AAA", dec!(1), dec!(1))];
        let report = ReportService::new()
            .assemble(&lots, &quotes(&[("AAA", dec!(2)), ("NOPE", dec!(99))]))
            .unwrap();
        assert_eq!(report.lines.len(), 1);
        assert_eq!(report.totals.total_market_value, Some(dec!(2)));
    }
}

// ═══════════════════════════════════════════════════════════════════
// QuoteService
// ═══════════════════════════════════════════════════════════════════

mod quote_service {
    use super::*;

    #[tokio::test]
    async fn first_source_wins() {
        let calls = Arc::new(AtomicUsize::new(0));
        let service = service_with(vec![
            Box::new(FixedQuoteSource::new(now()).with_price("AAA", dec!(10))),
            Box::new(FailingSource { calls: calls.clone() }),
        ]);

        let q = service.fetch_quote("aaa", now()).await.unwrap();
        assert_eq!(q.symbol, "AAA");
        assert_eq!(q.price, dec!(10));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn falls_back_after_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let service = service_with(vec![
            Box::new(FailingSource { calls: calls.clone() }),
            Box::new(FixedQuoteSource::new(now()).with_price("AAA", dec!(10))),
        ]);

        let q = service.fetch_quote("AAA", now()).await.unwrap();
        assert_eq!(q.price, dec!(10));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn every_source_failing_returns_last_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let service = service_with(vec![
            Box::new(FixedQuoteSource::new(now())),
            Box::new(FailingSource { calls }),
        ]);
        let err = service.fetch_quote("AAA", now()).await.unwrap_err();
        assert!(matches!(err, CoreError::Network(_)));
    }

    #[tokio::test]
    async fn empty_registry_is_no_provider() {
        let service = QuoteService::new(QuoteSourceRegistry::new());
        let err = service.fetch_quote("AAA", now()).await.unwrap_err();
        assert!(matches!(err, CoreError::NoProvider));
    }

    #[tokio::test]
    async fn slow_source_times_out() {
        let service =
            service_with(vec![Box::new(SlowSource)]).with_timeout(Duration::from_millis(50));
        let err = service.fetch_quote("AAA", now()).await.unwrap_err();
        assert!(matches!(err, CoreError::Timeout { ref symbol, .. } if symbol == "AAA"));
    }

    #[tokio::test]
    async fn mismatched_symbol_rejected() {
        let service = service_with(vec![Box::new(WrongSymbolSource)]);
        let err = service.fetch_quote("AAA", now()).await.unwrap_err();
        assert!(matches!(err, CoreError::Api { .. }));
    }

    #[tokio::test]
    async fn stale_quote_rejected() {
        let old = now() - ChronoDuration::hours(72);
        let service = service_with(vec![Box::new(
            FixedQuoteSource::new(old).with_price("AAA", dec!(10)),
        )])
        .with_max_age(Some(ChronoDuration::hours(24)));

        let err = service.fetch_quote("AAA", now()).await.unwrap_err();
        assert!(matches!(err, CoreError::StaleQuote { .. }));
    }

    #[tokio::test]
    async fn stale_quote_accepted_without_limit() {
        let old = now() - ChronoDuration::days(400);
        let service = service_with(vec![Box::new(
            FixedQuoteSource::new(old).with_price("AAA", dec!(10)),
        )]);
        assert!(service.fetch_quote("AAA", now()).await.is_ok());
    }

    #[tokio::test]
    async fn fetch_quotes_partitions_symbols() {
        let service = service_with(vec![Box::new(
            FixedQuoteSource::new(now())
                .with_price("AAA", dec!(10))
                .with_price("CCC", dec!(3)),
        )]);
        let symbols = vec!["AAA".to_string(), "BBB".to_string(), "CCC".to_string()];
        let book = service.fetch_quotes(&symbols, now()).await;

        assert_eq!(book.quotes.len(), 2);
        assert_eq!(book.unavailable.len(), 1);
        assert!(book.unavailable.contains_key("BBB"));
    }

    #[tokio::test]
    async fn one_slow_symbol_does_not_block_others() {
        struct SlowForB;

        #[async_trait]
        impl QuoteSource for SlowForB {
            fn name(&self) -> &str {
                "Slow for BBB"
            }

            async fn fetch(&self, symbol: &str) -> Result<Quote, CoreError> {
                if symbol == "BBB" {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
                Quote::new(symbol, dec!(5), now())
            }

            async fn fetch_history(
                &self,
                _symbol: &str,
                _from: NaiveDate,
                _to: NaiveDate,
            ) -> Result<Vec<PricePoint>, CoreError> {
                Ok(Vec::new())
            }
        }

        let service =
            service_with(vec![Box::new(SlowForB)]).with_timeout(Duration::from_millis(100));
        let symbols = vec!["AAA".to_string(), "BBB".to_string()];
        let book = service.fetch_quotes(&symbols, now()).await;

        assert_eq!(book.get("AAA").map(|q| q.price), Some(dec!(5)));
        assert!(book.unavailable.get("BBB").unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn history_skips_empty_source() {
        let points = vec![
            PricePoint { date: date(2024, 1, 2), price: dec!(10) },
            PricePoint { date: date(2024, 1, 3), price: dec!(11) },
        ];
        let service = service_with(vec![
            Box::new(FixedQuoteSource::new(now()).with_history("AAA", Vec::new())),
            Box::new(FixedQuoteSource::new(now()).with_history("AAA", points.clone())),
        ]);
        let history = service
            .fetch_history("AAA", date(2024, 1, 1), date(2024, 1, 31))
            .await
            .unwrap();
        assert_eq!(history, points);
    }

    #[tokio::test]
    async fn history_all_failing_is_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let service = service_with(vec![Box::new(FailingSource { calls: calls.clone() })]);
        assert!(service
            .fetch_history("AAA", date(2024, 1, 1), date(2024, 1, 31))
            .await
            .is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

// ═══════════════════════════════════════════════════════════════════
// HistoryService
// ═══════════════════════════════════════════════════════════════════

mod history {
    use super::*;

    fn p(day: u32, price: Decimal) -> PricePoint {
        PricePoint {
            date: date(2024, 1, day),
            price,
        }
    }

    #[test]
    fn performance_series_filters_and_sorts() {
        let points = vec![p(5, dec!(12)), p(1, dec!(9)), p(3, dec!(10)), p(3, dec!(10)), p(9, dec!(15))];
        let series = HistoryService::new().performance_series(
            "aaa",
            &points,
            date(2024, 1, 2),
            date(2024, 1, 8),
        );
        assert_eq!(series.symbol, "AAA");
        let dates: Vec<NaiveDate> = series.points.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 3), date(2024, 1, 5)]);
    }

    #[test]
    fn value_series_follows_acquisitions() {
        let lots = vec![
            Lot::new("AAA", dec!(10), dec!(10), date(2024, 1, 2)).unwrap(),
            Lot::new("AAA", dec!(5), dec!(11), date(2024, 1, 4)).unwrap(),
        ];
        let mut histories = HashMap::new();
        histories.insert(
            "AAA".to_string(),
            vec![p(2, dec!(10)), p(3, dec!(11)), p(4, dec!(12))],
        );

        let series = HistoryService::new()
            .portfolio_value_series(&lots, &histories, date(2024, 1, 1), date(2024, 1, 31))
            .unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series[0].market_value, dec!(100));
        assert_eq!(series[0].invested, dec!(100));
        assert_eq!(series[1].market_value, dec!(110));
        assert_eq!(series[2].market_value, dec!(180));
        assert_eq!(series[2].invested, dec!(155));
    }

    #[test]
    fn value_series_uses_last_close_on_gaps() {
        let lots = vec![
            Lot::new("AAA", dec!(1), dec!(10), date(2024, 1, 1)).unwrap(),
            Lot::new("BBB", dec!(2), dec!(10), date(2024, 1, 1)).unwrap(),
        ];
        let mut histories = HashMap::new();
        histories.insert("AAA".to_string(), vec![p(2, dec!(10)), p(3, dec!(12))]);
        histories.insert("BBB".to_string(), vec![p(2, dec!(5))]);

        let series = HistoryService::new()
            .portfolio_value_series(&lots, &histories, date(2024, 1, 2), date(2024, 1, 3))
            .unwrap();

        assert_eq!(series[1].date, date(2024, 1, 3));
        assert_eq!(series[1].market_value, dec!(22));
        assert!(series[1].unpriced.is_empty());
    }

    #[test]
    fn value_series_lists_unpriced_symbols() {
        let lots = vec![
            Lot::new("AAA", dec!(1), dec!(10), date(2024, 1, 1)).unwrap(),
            Lot::new("NOHIST", dec!(1), dec!(10), date(2024, 1, 1)).unwrap(),
        ];
        let mut histories = HashMap::new();
        histories.insert("AAA".to_string(), vec![p(2, dec!(10))]);

        let series = HistoryService::new()
            .portfolio_value_series(&lots, &histories, date(2024, 1, 1), date(2024, 1, 5))
            .unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].market_value, dec!(10));
        assert_eq!(series[0].unpriced, vec!["NOHIST".to_string()]);
    }

    #[test]
    fn value_series_carries_forward_when_nothing_held_is_priced() {
        let lots = vec![
            Lot::new("NOHIST", dec!(1), dec!(10), date(2024, 1, 1)).unwrap(),
            Lot::new("AAA", dec!(2), dec!(10), date(2024, 1, 5)).unwrap(),
        ];
        let mut histories = HashMap::new();
        histories.insert("AAA".to_string(), vec![p(3, dec!(10)), p(5, dec!(11))]);

        let series = HistoryService::new()
            .portfolio_value_series(&lots, &histories, date(2024, 1, 1), date(2024, 1, 31))
            .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, date(2024, 1, 3));
        assert_eq!(series[0].market_value, Decimal::ZERO);
        assert_eq!(series[0].invested, dec!(10));
        assert_eq!(series[0].unpriced, vec!["NOHIST".to_string()]);

        assert_eq!(series[1].market_value, dec!(22));
        assert_eq!(series[1].invested, dec!(30));
        assert_eq!(series[1].unpriced, vec!["NOHIST".to_string()]);
    }

    #[test]
    fn value_series_overflow_is_an_error() {
        let huge = dec!(100000000000000000000);
        let lots = vec![Lot::new("AAA", huge, huge, date(2024, 1, 1)).unwrap()];
        let mut histories = HashMap::new();
        histories.insert("AAA".to_string(), vec![p(2, dec!(1))]);

        let result = HistoryService::new().portfolio_value_series(
            &lots,
            &histories,
            date(2024, 1, 1),
            date(2024, 1, 5),
        );
        assert!(matches!(result, Err(CoreError::ValidationError(ref m)) if m.contains("cost basis")));
    }

    #[test]
    fn value_series_empty_without_history() {
        let lots = vec![lot("AAA", dec!(1), dec!(1))];
        let series = HistoryService::new()
            .portfolio_value_series(&lots, &HashMap::new(), date(2024, 1, 1), date(2024, 1, 5))
            .unwrap();
        assert!(series.is_empty());
    }
}
