//! End-to-end tests of the backtest core: indicators, signals, engine and
//! aggregation together, plus property tests over arbitrary series.

mod common;

use approx::assert_relative_eq;
use chrono::NaiveDate;
use common::*;
use proptest::prelude::*;
use swingtrader::domain::backtest::{BacktestConfig, execute_signals, run_backtest};
use swingtrader::domain::error::SwingError;
use swingtrader::domain::indicator::bollinger::calculate_bollinger;
use swingtrader::domain::indicator::rsi::calculate_rsi;
use swingtrader::domain::position::{ExitReason, TradeStatus};
use swingtrader::domain::strategy::{Signal, SignalKind, generate_signals};

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

mod scenarios {
    use super::*;

    #[test]
    fn empty_series_is_input_error() {
        let result = run_backtest(&[], &BacktestConfig::default());
        assert!(matches!(result, Err(SwingError::EmptyPriceSeries)));
    }

    #[test]
    fn bollinger_five_closes_period_three() {
        let prices = bars_from_closes(&[100.0, 102.0, 101.0, 103.0, 105.0]);
        let bands = calculate_bollinger(&prices, 3, 2.0);

        assert_eq!(bands.len(), 5);
        for i in 0..2 {
            let b = bands.bands_at(i);
            assert_eq!((b.upper, b.middle, b.lower), (0.0, 0.0, 0.0));
        }
        let b = bands.bands_at(2);
        let sd = (2.0_f64 / 3.0).sqrt();
        assert_relative_eq!(b.middle, 101.0, epsilon = 1e-9);
        assert_relative_eq!(b.upper, 101.0 + 2.0 * sd, epsilon = 1e-9);
        assert_relative_eq!(b.lower, 101.0 - 2.0 * sd, epsilon = 1e-9);
        assert_relative_eq!(b.upper, 102.633, epsilon = 1e-3);
        assert_relative_eq!(b.lower, 99.367, epsilon = 1e-3);
    }

    #[test]
    fn rsi_of_rising_closes_is_100() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let rsi = calculate_rsi(&bars_from_closes(&closes), 14);
        assert_eq!(rsi.len(), 15);
        assert_relative_eq!(rsi.simple_at(14), 100.0);
    }

    #[test]
    fn gap_down_signals() {
        let signals = generate_signals(&gap_down_and_recovery(), &fast_config().strategy);
        let buys: Vec<&Signal> = signals.iter().filter(|s| s.kind == SignalKind::Buy).collect();

        assert_eq!(buys.len(), 1);
        assert_eq!(buys[0].date, d(11));
        assert_eq!(buys[0].price, 85.0);
        assert!(
            signals
                .iter()
                .any(|s| s.kind == SignalKind::Sell && s.date == d(15))
        );
    }

    #[test]
    fn round_trip_without_costs() {
        let result = run_backtest(&gap_down_and_recovery(), &no_cost_config()).unwrap();

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.id, "T1");
        assert_eq!(trade.status(), TradeStatus::Closed);
        assert_eq!(trade.entry_date, d(11));
        assert_eq!(trade.exit_date, d(15));
        assert_eq!(trade.exit_reason, ExitReason::Signal);
        // 10000 * 0.02 / (85 * 0.05) = 47.06 -> 47 shares, +15 each
        assert_eq!(trade.quantity, 47);
        assert_relative_eq!(trade.pnl, 705.0, epsilon = 1e-9);

        let m = &result.metrics;
        assert_relative_eq!(m.final_capital, 10_705.0, epsilon = 1e-9);
        assert_relative_eq!(m.total_return, 7.05, epsilon = 1e-9);
        assert_relative_eq!(m.win_rate, 100.0);
        assert_relative_eq!(m.max_drawdown, 0.0);
        assert_eq!(result.start_date, d(1));
        assert_eq!(result.end_date, d(16));
    }

    #[test]
    fn round_trip_with_fees_and_slippage() {
        let result = run_backtest(&gap_down_and_recovery(), &fast_config()).unwrap();
        let trade = &result.trades[0];

        assert_relative_eq!(trade.entry_price, 85.085, epsilon = 1e-9);
        assert_relative_eq!(trade.exit_price, 99.9, epsilon = 1e-9);
        assert_relative_eq!(trade.entry_fee, 47.0 * 85.085 * 0.001, epsilon = 1e-9);
        assert_relative_eq!(trade.exit_fee, 47.0 * 99.9 * 0.001, epsilon = 1e-9);
        // entry fee is not part of P&L
        assert_relative_eq!(trade.pnl, 691.6097, epsilon = 1e-6);
        assert_relative_eq!(result.final_capital(), 10_691.6097, epsilon = 1e-6);
        assert_relative_eq!(
            result.total_fees(),
            trade.entry_fee + trade.exit_fee,
            epsilon = 1e-9
        );
    }

    #[test]
    fn trigger_only_checked_at_signal_prices() {
        // target is 93.5 but 96 is not a signal bar; the SELL at 100 exits first
        let result = run_backtest(&gap_down_and_recovery(), &no_cost_config()).unwrap();
        assert_eq!(result.trades[0].exit_reason, ExitReason::Signal);
        assert_eq!(result.trades[0].exit_price, 100.0);
    }

    #[test]
    fn open_position_forced_closed_at_end() {
        let prices: Vec<_> = gap_down_and_recovery().into_iter().take(13).collect();
        let result = run_backtest(&prices, &no_cost_config()).unwrap();

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::EndOfData);
        assert_eq!(trade.exit_date, d(13));
        assert_eq!(trade.exit_price, 92.0);
        assert_eq!(trade.status(), TradeStatus::Closed);
        assert_relative_eq!(trade.pnl, 47.0 * 7.0, epsilon = 1e-9);
    }

    #[test]
    fn buy_while_open_is_ignored() {
        let mut config = no_cost_config();
        config.strategy.stop_loss_pct = 0.25;
        config.strategy.take_profit_pct = 0.5;
        let prices = grinding_selloff();

        let signals = generate_signals(&prices, &config.strategy);
        let buys = signals.iter().filter(|s| s.kind == SignalKind::Buy).count();
        assert_eq!(buys, 5);

        let result = run_backtest(&prices, &config).unwrap();
        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.entry_date, d(11));
        assert_eq!(trade.entry_price, 98.0);
        // 200 / (98 * 0.25) = 8.16 -> 8 shares
        assert_eq!(trade.quantity, 8);
        assert_eq!(trade.exit_date, d(18));
        assert_relative_eq!(result.final_capital(), 10_000.0 - 32.0, epsilon = 1e-9);
    }

    #[test]
    fn stop_loss_then_reentry() {
        let result = run_backtest(&grinding_selloff(), &no_cost_config()).unwrap();

        let reasons: Vec<_> = result.trades.iter().map(|t| t.exit_reason).collect();
        assert_eq!(reasons, vec![ExitReason::StopLoss, ExitReason::StopLoss]);
        let ids: Vec<_> = result.trades.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["T1", "T2"]);
        assert_eq!(result.trades[0].exit_date, d(13));
        assert_eq!(result.trades[1].entry_date, d(14));
        assert_relative_eq!(result.metrics.total_pnl, -550.0, epsilon = 1e-9);
    }

    #[test]
    fn series_shorter_than_warmup_has_no_trades() {
        let prices = bars_from_closes(&[100.0, 90.0, 80.0]);
        let result = run_backtest(&prices, &BacktestConfig::default()).unwrap();
        assert!(result.signals.is_empty());
        assert!(result.trades.is_empty());
        assert_eq!(result.final_capital(), 10_000.0);
    }
}

mod pipeline {
    use super::*;
    use swingtrader::adapters::text_report::TextReport;
    use swingtrader::cli::{RunSettings, run_backtest_pipeline};

    fn settings(start: Option<NaiveDate>, end: Option<NaiveDate>) -> RunSettings {
        RunSettings {
            config: no_cost_config(),
            start_date: start,
            end_date: end,
        }
    }

    #[test]
    fn pipeline_writes_report() {
        let port = MockDataPort::new(gap_down_and_recovery());
        let mut out = Vec::new();

        let result =
            run_backtest_pipeline(&port, &TextReport::default(), &settings(None, None), &mut out)
                .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(result.trades.len(), 1);
        assert!(text.contains("BACKTEST RESULTS"));
        assert!(text.contains("T1: Entry 2024-01-11"));
        assert!(text.contains("Final Capital:      $10705.00"));
    }

    #[test]
    fn pipeline_respects_date_filter() {
        let port = MockDataPort::new(gap_down_and_recovery());
        let mut out = Vec::new();

        let result = run_backtest_pipeline(
            &port,
            &TextReport::default(),
            &settings(None, Some(d(13))),
            &mut out,
        )
        .unwrap();

        assert_eq!(result.end_date, d(13));
        assert_eq!(result.trades[0].exit_reason, ExitReason::EndOfData);
    }

    #[test]
    fn pipeline_empty_after_filter_is_input_error() {
        let port = MockDataPort::new(Vec::new());
        let mut out = Vec::new();
        let result =
            run_backtest_pipeline(&port, &TextReport::default(), &settings(None, None), &mut out);

        assert!(matches!(result, Err(SwingError::EmptyPriceSeries)));
        assert!(out.is_empty());
    }

    #[test]
    fn pipeline_propagates_data_errors() {
        let port = MockDataPort::failing("corrupt file");
        let mut out = Vec::new();
        let result =
            run_backtest_pipeline(&port, &TextReport::default(), &settings(None, None), &mut out);
        assert!(matches!(result, Err(SwingError::DataFormat { .. })));
    }
}

fn arb_closes() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0f64..500.0, 0..120)
}

fn arb_signals() -> impl Strategy<Value = Vec<(u8, f64)>> {
    prop::collection::vec((0u8..3, 1.0f64..300.0), 1..60)
}

fn to_signals(raw: &[(u8, f64)]) -> Vec<Signal> {
    raw.iter()
        .enumerate()
        .map(|(i, &(k, price))| Signal {
            date: start_date() + chrono::Duration::days(i as i64),
            kind: match k {
                0 => SignalKind::Buy,
                1 => SignalKind::Sell,
                _ => SignalKind::Hold,
            },
            price,
            reason: "",
        })
        .collect()
}

proptest! {
    #[test]
    fn indicator_length_matches_input(closes in arb_closes(), period in 0usize..30) {
        let prices = bars_from_closes(&closes);
        prop_assert_eq!(calculate_rsi(&prices, period).len(), prices.len());
        prop_assert_eq!(calculate_bollinger(&prices, period, 2.0).len(), prices.len());
    }

    #[test]
    fn rsi_stays_in_range(closes in arb_closes()) {
        let rsi = calculate_rsi(&bars_from_closes(&closes), 5);
        for i in 0..rsi.len() {
            let v = rsi.simple_at(i);
            prop_assert!((0.0..=100.0).contains(&v), "rsi {} at {}", v, i);
        }
    }

    #[test]
    fn never_more_than_one_open_position(raw in arb_signals()) {
        let signals = to_signals(&raw);
        let prices: Vec<_> = signals
            .iter()
            .map(|s| PricePoint::flat(s.date, s.price))
            .collect();
        let account = execute_signals(&signals, &prices, &BacktestConfig::default());

        prop_assert!(account.is_flat());
        prop_assert!(account.cash >= 0.0);
        let trades = account.closed_trades();
        for (n, trade) in trades.iter().enumerate() {
            prop_assert_eq!(&trade.id, &format!("T{}", n + 1));
            prop_assert!(trade.exit_date >= trade.entry_date);
        }
        for pair in trades.windows(2) {
            // the next position opens no earlier than the previous one closed
            prop_assert!(pair[1].entry_date >= pair[0].exit_date);
        }
    }

    #[test]
    fn final_capital_is_initial_plus_pnl(closes in arb_closes()) {
        prop_assume!(!closes.is_empty());
        let result = run_backtest(&bars_from_closes(&closes), &fast_config()).unwrap();
        let sum: f64 = result.trades.iter().map(|t| t.pnl).sum();
        prop_assert_eq!(result.final_capital(), result.initial_capital + sum);
    }

    #[test]
    fn equity_curve_ends_at_cash(closes in arb_closes()) {
        prop_assume!(!closes.is_empty());
        let prices = bars_from_closes(&closes);
        let result = run_backtest(&prices, &fast_config()).unwrap();

        prop_assert_eq!(result.equity_curve.len(), prices.len());
        for (point, bar) in result.equity_curve.iter().zip(&prices) {
            prop_assert_eq!(point.date, bar.date);
        }
        // flat at the end, so equity is cash: realized capital less entry fees
        let entry_fees: f64 = result.trades.iter().map(|t| t.entry_fee).sum();
        let expected = result.final_capital() - entry_fees;
        let last = result.equity_curve[prices.len() - 1].equity;
        prop_assert!((last - expected).abs() < 1e-6 * expected.abs().max(1.0));
    }

    #[test]
    fn runs_are_deterministic(closes in arb_closes()) {
        prop_assume!(!closes.is_empty());
        let prices = bars_from_closes(&closes);
        let first = run_backtest(&prices, &fast_config()).unwrap();
        let second = run_backtest(&prices, &fast_config()).unwrap();
        prop_assert_eq!(first, second);
    }
}
