//! End-to-end tests over mocked ports.
//!
//! Tests cover:
//! - Watchlist scans with ranking and per-symbol skips
//! - Risk manager buy/sell bookkeeping, circuit breaker, broker failures
//! - Full strategy cycles: entries, maintenance, market-close liquidation,
//!   ledger forwarding
//! - Premarket gap report

mod common;

use approx::assert_relative_eq;
use common::*;
use sigtrader::domain::bar::Interval;
use sigtrader::domain::config_validation::BotConfig;
use sigtrader::domain::engine::{Collaborators, GapDirection, StrategyToggles, TradingEngine};
use sigtrader::domain::error::{RiskViolation, TradeError};
use sigtrader::domain::ledger::TradeAction;
use sigtrader::domain::position::{CloseReason, PositionStatus, StrategyTag};
use sigtrader::domain::risk::{BuyRequest, RiskConfig, RiskManager};
use sigtrader::domain::scanner::{
    CandidateKind, ScanParams, SkipReason, scan_breakouts, scan_mean_reversion,
};
use sigtrader::domain::watchlist::Watchlist;

fn symbols(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|s| s.to_string()).collect()
}

fn request(symbol: &str, price: f64, amount: f64, strategy: StrategyTag) -> BuyRequest {
    BuyRequest {
        symbol: symbol.to_string(),
        price,
        amount,
        strategy,
    }
}

mod scanning {
    use super::*;

    #[test]
    fn breakout_scan_ranks_and_reports_skips() {
        let data = MockDataPort::new()
            .with_bars("AAPL", Interval::FiveMinute, near_high_series(100.0, 40))
            .with_bars("NVDA", Interval::FiveMinute, near_high_series(50.0, 60))
            .with_bars("AMD", Interval::FiveMinute, bars_from_closes(&[10.0; 5]))
            .with_error("TSLA", "timeout");

        let outcome = scan_breakouts(
            &data,
            &symbols(&["AAPL", "NVDA", "AMD", "TSLA", "MSFT"]),
            &ScanParams::default(),
        );

        let found: Vec<&str> = outcome.candidates.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(found.len(), 2);
        assert!(found.contains(&"AAPL") && found.contains(&"NVDA"));
        assert!(
            outcome
                .candidates
                .windows(2)
                .all(|w| w[0].quality_score >= w[1].quality_score)
        );
        for c in &outcome.candidates {
            assert_eq!(c.kind, CandidateKind::Breakout);
            assert!((0.0..=2.0).contains(&c.distance_pct));
            assert!((0.0..=100.0).contains(&c.quality_score));
        }

        let skipped: Vec<(&str, &SkipReason)> = outcome
            .skipped
            .iter()
            .map(|s| (s.symbol.as_str(), &s.reason))
            .collect();
        assert_eq!(skipped.len(), 3);
        assert!(skipped.contains(&(
            "AMD",
            &SkipReason::InsufficientBars {
                bars: 5,
                minimum: 30
            }
        )));
        assert!(skipped.contains(&("MSFT", &SkipReason::NoData)));
        assert!(
            skipped
                .iter()
                .any(|(s, r)| *s == "TSLA" && matches!(r, SkipReason::FetchFailed(_)))
        );
    }

    #[test]
    fn mean_reversion_scan_finds_washed_out_name() {
        let mut closes = vec![100.0, 101.0, 99.0, 100.5, 99.5].repeat(6);
        closes.push(92.0);
        let data = MockDataPort::new()
            .with_bars("PFE", Interval::Daily, bars_from_closes(&closes))
            .with_bars(
                "UNH",
                Interval::Daily,
                bars_from_closes(&(0..30).map(|i| 100.0 + i as f64).collect::<Vec<_>>()),
            );

        let outcome = scan_mean_reversion(&data, &symbols(&["PFE", "UNH"]), &ScanParams::default());

        assert_eq!(outcome.candidates.len(), 1);
        let candidate = &outcome.candidates[0];
        assert_eq!(candidate.symbol, "PFE");
        assert_eq!(candidate.kind, CandidateKind::MeanReversion);
        assert!(candidate.target.is_some_and(|t| t > candidate.current_price));
        assert!(outcome.skipped.is_empty());
    }
}

mod risk_management {
    use super::*;

    #[test]
    fn buy_then_sell_round_trip() {
        let broker = MockOrderPort::default();
        let config = RiskConfig {
            max_risk_per_trade: 5000.0,
            ..RiskConfig::default()
        };
        let mut risk = RiskManager::new(10_000.0, config);

        risk.buy(&broker, &request("AAPL", 100.0, 1000.0, StrategyTag::Sentiment), at(10, 0))
            .unwrap();
        assert_relative_eq!(risk.cash(), 9000.0);
        assert_relative_eq!(risk.position("AAPL").unwrap().shares, 10.0, epsilon = 1e-9);

        let outcome = risk
            .close(&broker, "AAPL", 120.0, CloseReason::TakeProfit, at(11, 0))
            .unwrap();
        assert_eq!(
            outcome.status,
            PositionStatus::Closed(CloseReason::TakeProfit)
        );
        assert_relative_eq!(outcome.record.pnl, 200.0, epsilon = 1e-9);
        assert_eq!(
            outcome.record.action,
            TradeAction::Sell(CloseReason::TakeProfit)
        );
        assert!(!risk.has_position("AAPL"));
        assert_relative_eq!(risk.cash(), 10_200.0, epsilon = 1e-9);
        assert_relative_eq!(risk.state().daily_pl, 200.0, epsilon = 1e-9);
        assert_eq!(risk.ledger().len(), 2);
        assert_eq!(broker.submitted.borrow().len(), 2);
    }

    #[test]
    fn circuit_breaker_blocks_buys_until_reset() {
        let broker = MockOrderPort::default();
        let config = RiskConfig {
            max_risk_per_trade: 500.0,
            ..RiskConfig::default()
        };
        let mut risk = RiskManager::new(1000.0, config);

        risk.buy(&broker, &request("TSLA", 10.0, 400.0, StrategyTag::Sentiment), at(10, 0))
            .unwrap();
        risk.close(&broker, "TSLA", 6.0, CloseReason::StopLoss, at(10, 5))
            .unwrap();
        assert_relative_eq!(risk.state().daily_pl, -160.0, epsilon = 1e-9);
        assert!(risk.circuit_breaker_tripped());

        let err = risk
            .buy(&broker, &request("AMD", 10.0, 10.0, StrategyTag::Sentiment), at(10, 10))
            .unwrap_err();
        assert!(matches!(
            err,
            TradeError::Rejected(RiskViolation::DailyLossLimit { .. })
        ));

        risk.reset_day(risk.cash());
        assert!(!risk.circuit_breaker_tripped());
        assert!(
            risk.buy(&broker, &request("AMD", 10.0, 10.0, StrategyTag::Sentiment), at(10, 15))
                .is_ok()
        );
    }

    #[test]
    fn broker_failure_leaves_state_unchanged() {
        let broker = MockOrderPort::failing();
        let mut risk = RiskManager::new(100.0, RiskConfig::default());

        let err = risk
            .buy(&broker, &request("NVDA", 50.0, 20.0, StrategyTag::Breakout), at(10, 0))
            .unwrap_err();

        assert!(matches!(err, TradeError::OrderFailed { .. }));
        assert_relative_eq!(risk.cash(), 100.0);
        assert_eq!(risk.position_count(), 0);
        assert!(risk.ledger().is_empty());
    }

    #[test]
    fn stop_loss_and_trailing_stop_during_maintenance() {
        let broker = MockOrderPort::default();
        let prices = MockPriceFeed::default().with("NKE", 100.0).with("DIS", 100.0);
        let config = RiskConfig {
            max_risk_per_trade: 500.0,
            ..RiskConfig::default()
        };
        let mut risk = RiskManager::new(1000.0, config);
        risk.buy(&broker, &request("NKE", 100.0, 100.0, StrategyTag::Sentiment), at(10, 0))
            .unwrap();
        risk.buy(&broker, &request("DIS", 100.0, 100.0, StrategyTag::Breakout), at(10, 0))
            .unwrap();

        // DIS runs up and ratchets its stop; NKE falls through its stop loss
        prices.set("DIS", 120.0);
        prices.set("NKE", 94.0);
        let events = risk.maintain(&prices, &broker, at(10, 30));
        assert_eq!(events.len(), 2);
        assert!(!risk.has_position("NKE"));
        let stop = risk.position("DIS").and_then(|p| p.trailing_stop).unwrap();
        assert_relative_eq!(stop, 108.0, epsilon = 1e-9);

        prices.set("DIS", 107.0);
        risk.maintain(&prices, &broker, at(11, 0));
        assert!(!risk.has_position("DIS"));
        let reasons: Vec<TradeAction> = risk.ledger().records().iter().map(|r| r.action).collect();
        assert!(reasons.contains(&TradeAction::Sell(CloseReason::StopLoss)));
        assert!(reasons.contains(&TradeAction::Sell(CloseReason::TrailingStop)));
    }
}

mod trading_cycle {
    use super::*;

    fn config_for(codes: &[&str]) -> BotConfig {
        BotConfig {
            watchlist: Watchlist::from_sectors(vec![("tech".to_string(), symbols(codes))]).unwrap(),
            ..BotConfig::default()
        }
    }

    #[test]
    fn entries_then_market_close_liquidation() {
        let data = MockDataPort::new().with_bars("NVDA", Interval::FiveMinute, breakout_series());
        let prices = MockPriceFeed::default().with("AMD", 50.0).with("NVDA", 104.5);
        let orders = MockOrderPort::default();
        let sentiment = MockSentiment::default().with("AMD", 0.8, 500);
        let ledger = MockLedger::default();
        let ports = Collaborators {
            data: &data,
            prices: &prices,
            orders: &orders,
            sentiment: &sentiment,
            ledger: &ledger,
        };

        let mut engine = TradingEngine::new(config_for(&["AMD", "NVDA"]));
        let report = engine.run_cycle(&ports, at(10, 0));

        let bought: Vec<(&str, StrategyTag)> = report
            .buys
            .iter()
            .map(|r| (r.symbol.as_str(), r.strategy))
            .collect();
        assert_eq!(
            bought,
            vec![("AMD", StrategyTag::Sentiment), ("NVDA", StrategyTag::Breakout)]
        );
        assert!(report.sells.is_empty());
        assert!(!report.market_close);
        assert_eq!(report.records_forwarded, 2);
        assert_relative_eq!(engine.risk().cash(), 60.0);
        assert_relative_eq!(report.account_value, 100.0, epsilon = 1e-9);
        assert!(engine.risk().position("NVDA").unwrap().trailing_stop.is_some());

        engine.set_strategies(StrategyToggles {
            sentiment: false,
            breakout: false,
            mean_reversion: false,
        });
        prices.set("AMD", 55.0);
        let report = engine.run_cycle(&ports, at(15, 55));

        assert!(report.market_close);
        assert!(report.buys.is_empty());
        assert_eq!(report.sells.len(), 2);
        assert!(
            report
                .sells
                .iter()
                .all(|r| r.action == TradeAction::Sell(CloseReason::MarketClose))
        );
        assert_eq!(engine.risk().position_count(), 0);
        assert_relative_eq!(report.daily_pl, 2.0, epsilon = 1e-9);
        assert_relative_eq!(engine.risk().cash(), 102.0, epsilon = 1e-9);
        assert_eq!(ledger.records.borrow().len(), 4);
    }

    #[test]
    fn mean_reversion_buys_near_signal_entry() {
        // 19 falling closes then a flush to 70: below the lower band, RSI 0
        let mut closes: Vec<f64> = (0..19).map(|i| 100.0 - i as f64).collect();
        closes.push(70.0);
        let data = MockDataPort::new()
            .with_bars("PFE", Interval::Daily, bars_from_closes(&closes))
            .with_bars("MRNA", Interval::Daily, bars_from_closes(&closes));
        // PFE within 1% of the 70.0 entry, MRNA drifted 2.9% away
        let prices = MockPriceFeed::default().with("PFE", 70.3).with("MRNA", 72.0);
        let orders = MockOrderPort::default();
        let sentiment = MockSentiment::default();
        let ledger = MockLedger::default();
        let ports = Collaborators {
            data: &data,
            prices: &prices,
            orders: &orders,
            sentiment: &sentiment,
            ledger: &ledger,
        };

        let config = BotConfig {
            starting_capital: 2000.0,
            risk: RiskConfig {
                max_risk_per_trade: 500.0,
                ..RiskConfig::default()
            },
            strategies: StrategyToggles {
                sentiment: false,
                breakout: false,
                mean_reversion: true,
            },
            ..config_for(&["PFE", "MRNA"])
        };
        let mut engine = TradingEngine::new(config);
        let report = engine.run_cycle(&ports, at(10, 0));

        assert!(report.rejections.is_empty());
        assert_eq!(report.buys.len(), 1);
        let buy = &report.buys[0];
        assert_eq!(buy.symbol, "PFE");
        assert_eq!(buy.strategy, StrategyTag::MeanReversion);
        assert_relative_eq!(buy.price, 70.3);
        // max(100, 2000 × 0.2) capped at min(500, 2000 × 0.5)
        assert_relative_eq!(buy.cash_after, 1600.0, epsilon = 1e-9);
        assert!(!engine.risk().has_position("MRNA"));
    }

    #[test]
    fn mean_reversion_sizing_over_default_max_risk_is_rejected() {
        let mut closes: Vec<f64> = (0..19).map(|i| 100.0 - i as f64).collect();
        closes.push(70.0);
        let data = MockDataPort::new().with_bars("PFE", Interval::Daily, bars_from_closes(&closes));
        let prices = MockPriceFeed::default().with("PFE", 70.0);
        let orders = MockOrderPort::default();
        let sentiment = MockSentiment::default();
        let ledger = MockLedger::default();
        let ports = Collaborators {
            data: &data,
            prices: &prices,
            orders: &orders,
            sentiment: &sentiment,
            ledger: &ledger,
        };

        // 1000 × 0.2 = 200 exceeds the default 50 per-trade ceiling
        let mut engine = TradingEngine::new(BotConfig {
            starting_capital: 1000.0,
            strategies: StrategyToggles {
                sentiment: false,
                breakout: false,
                mean_reversion: true,
            },
            ..config_for(&["PFE"])
        });
        let report = engine.run_cycle(&ports, at(10, 0));

        assert!(report.buys.is_empty());
        assert_eq!(report.rejections.len(), 1);
        assert!(matches!(
            report.rejections[0].error,
            TradeError::Rejected(RiskViolation::ExceedsMaxRisk { .. })
        ));
        assert!(orders.submitted.borrow().is_empty());
    }

    #[test]
    fn weak_sentiment_and_oversized_requests_do_not_trade() {
        let data = MockDataPort::new();
        let prices = MockPriceFeed::default().with("AMD", 50.0).with("SBUX", 90.0);
        let orders = MockOrderPort::default();
        let sentiment = MockSentiment::default()
            .with("AMD", 0.4, 1000)
            .with("SBUX", 0.9, 50);
        let ledger = MockLedger::default();
        let ports = Collaborators {
            data: &data,
            prices: &prices,
            orders: &orders,
            sentiment: &sentiment,
            ledger: &ledger,
        };

        let mut engine = TradingEngine::new(config_for(&["AMD", "SBUX"]));
        let report = engine.run_cycle(&ports, at(10, 0));

        assert!(report.buys.is_empty());
        assert!(report.rejections.is_empty());
        assert!(orders.submitted.borrow().is_empty());
    }

    #[test]
    fn ledger_sink_failure_is_retried_next_cycle() {
        let data = MockDataPort::new();
        let prices = MockPriceFeed::default().with("AMD", 50.0);
        let orders = MockOrderPort::default();
        let sentiment = MockSentiment::default().with("AMD", 0.9, 500);
        let ledger = MockLedger::default();
        ledger.fail.set(true);
        let ports = Collaborators {
            data: &data,
            prices: &prices,
            orders: &orders,
            sentiment: &sentiment,
            ledger: &ledger,
        };

        let mut engine = TradingEngine::new(config_for(&["AMD"]));
        let report = engine.run_cycle(&ports, at(10, 0));
        assert_eq!(report.buys.len(), 1);
        assert_eq!(report.records_forwarded, 0);

        ledger.fail.set(false);
        engine.set_strategies(StrategyToggles {
            sentiment: false,
            ..StrategyToggles::default()
        });
        let report = engine.run_cycle(&ports, at(10, 5));
        assert_eq!(report.records_forwarded, 1);
        assert_eq!(ledger.records.borrow()[0].symbol, "AMD");
    }

    #[test]
    fn open_day_reports_gaps() {
        let data = MockDataPort::new()
            .with_bars("AMD", Interval::Daily, bars_from_closes(&[100.0, 101.0]))
            .with_bars("NVDA", Interval::Daily, bars_from_closes(&[200.0, 199.0]))
            .with_bars("MSFT", Interval::Daily, bars_from_closes(&[300.0, 301.0]));
        let prices = MockPriceFeed::default()
            .with("AMD", 104.0)
            .with("NVDA", 190.0)
            .with("MSFT", 303.0);
        let orders = MockOrderPort::default();
        let sentiment = MockSentiment::default();
        let ledger = MockLedger::default();
        let ports = Collaborators {
            data: &data,
            prices: &prices,
            orders: &orders,
            sentiment: &sentiment,
            ledger: &ledger,
        };

        let mut engine = TradingEngine::new(config_for(&["AMD", "NVDA", "MSFT"]));
        let gaps = engine.open_day(&ports, at(9, 0));

        let summary: Vec<(&str, GapDirection)> =
            gaps.iter().map(|g| (g.symbol.as_str(), g.direction)).collect();
        assert_eq!(
            summary,
            vec![("AMD", GapDirection::Up), ("NVDA", GapDirection::Down)]
        );
        assert_relative_eq!(gaps[0].gap_pct, 4.0, epsilon = 1e-9);
        assert_relative_eq!(gaps[1].gap_pct, -5.0, epsilon = 1e-9);
        assert!(gaps.iter().all(|g| g.sector == "tech"));
        assert_relative_eq!(engine.risk().state().starting_day_value, 100.0);
    }
}
