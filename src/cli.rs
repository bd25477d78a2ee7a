//! CLI definition and dispatch.

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_ledger::CsvLedgerWriter;
use crate::adapters::csv_sentiment::CsvSentimentAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::paper_broker::PaperBroker;
use crate::domain::bar::Interval;
use crate::domain::config_validation::{BotConfig, build_bot_config};
use crate::domain::engine::{Collaborators, CycleReport, TradingEngine};
use crate::domain::error::SigtraderError;
use crate::domain::levels::{find_support_resistance, is_near_level};
use crate::domain::position::StrategyTag;
use crate::domain::scanner::{Candidate, ScanOutcome, scan_breakouts, scan_mean_reversion};
use crate::domain::watchlist::parse_codes;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "sigtrader", about = "Signal scanner and risk-managed paper trader")]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rank watchlist symbols as breakout or mean-reversion candidates
    Scan {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory of <SYMBOL>_<interval>.csv files
        #[arg(short, long)]
        data: PathBuf,
        /// Comma-separated codes overriding the watchlist
        #[arg(long)]
        codes: Option<String>,
        /// Scan every symbol with a series file in the data directory
        #[arg(long, conflicts_with = "codes")]
        from_data: bool,
        /// breakout or mean_reversion; both when omitted
        #[arg(long)]
        strategy: Option<StrategyTag>,
    },
    /// Print clustered support/resistance levels for one symbol
    Levels {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        code: String,
        #[arg(long, default_value = "1d")]
        interval: Interval,
    },
    /// Run one strategy cycle against recorded data with the paper broker
    Cycle {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        data: PathBuf,
        /// symbol,sentiment,post_volume CSV
        #[arg(long)]
        sentiment: Option<PathBuf>,
        #[arg(long, default_value = "trades.csv")]
        ledger: PathBuf,
        /// Cycle time, YYYY-MM-DD HH:MM (defaults to now)
        #[arg(long)]
        at: Option<String>,
        /// Reset daily stats and run the premarket gap scan first
        #[arg(long)]
        open_day: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Scan {
            config,
            data,
            codes,
            from_data,
            strategy,
        } => run_scan(config.as_deref(), &data, codes.as_deref(), from_data, strategy),
        Command::Levels {
            config,
            data,
            code,
            interval,
        } => run_levels(config.as_deref(), &data, &code, interval),
        Command::Cycle {
            config,
            data,
            sentiment,
            ledger,
            at,
            open_day,
        } => run_cycle(
            config.as_deref(),
            &data,
            sentiment.as_deref(),
            ledger,
            at.as_deref(),
            open_day,
        ),
        Command::Validate { config } => run_validate(&config),
    }
}

fn fail(err: &SigtraderError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

/// Load and validate a config file; no file means built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<BotConfig, SigtraderError> {
    match path {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            let adapter = FileConfigAdapter::from_file(path)?;
            build_bot_config(&adapter)
        }
        None => Ok(BotConfig::default()),
    }
}

pub fn resolve_symbols(
    codes_override: Option<&str>,
    config: &BotConfig,
) -> Result<Vec<String>, SigtraderError> {
    match codes_override {
        Some(raw) => parse_codes(raw)
            .map_err(|e| SigtraderError::config_invalid("cli", "codes", e.to_string())),
        None => Ok(config.watchlist.symbols()),
    }
}

fn print_candidates(title: &str, outcome: &ScanOutcome) {
    println!("{title}: {} candidate(s)", outcome.candidates.len());
    for Candidate {
        symbol,
        current_price,
        reference_level,
        distance_pct,
        rsi,
        volatility,
        detected,
        quality_score,
        ..
    } in &outcome.candidates
    {
        println!(
            "  {symbol:<6} score {quality_score:>5.1}  price {current_price:>9.2}  ref {reference_level:>9.2}  dist {distance_pct:>5.2}%  rsi {rsi:>5.1}  vol {volatility:>5.2}%{}",
            if *detected { "  [signal]" } else { "" }
        );
    }
    for c in outcome.candidates.iter().filter(|c| c.target.is_some()) {
        if let (Some(target), Some(potential)) = (c.target, c.profit_potential_pct()) {
            println!("  {} target {target:.2} ({potential:+.2}%)", c.symbol);
        }
    }
    for skipped in &outcome.skipped {
        eprintln!("  skipped {}: {}", skipped.symbol, skipped.reason);
    }
}

fn run_scan(
    config_path: Option<&Path>,
    data_dir: &Path,
    codes: Option<&str>,
    from_data: bool,
    strategy: Option<StrategyTag>,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let data = CsvAdapter::new(data_dir.to_path_buf());
    let symbols = if from_data {
        data.list_symbols(Interval::FiveMinute)
    } else {
        resolve_symbols(codes, &config)
    };
    let symbols = match symbols {
        Ok(s) if s.is_empty() => {
            eprintln!("error: no symbols to scan");
            return ExitCode::from(3);
        }
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    let (breakouts, reversion) = match strategy {
        None => (true, true),
        Some(StrategyTag::Breakout) => (true, false),
        Some(StrategyTag::MeanReversion) => (false, true),
        Some(StrategyTag::Sentiment) => {
            eprintln!("error: sentiment has no scanner; use breakout or mean_reversion");
            return ExitCode::from(2);
        }
    };

    if breakouts {
        print_candidates(
            "Breakout",
            &scan_breakouts(&data, &symbols, &config.scan),
        );
    }
    if reversion {
        print_candidates(
            "Mean reversion",
            &scan_mean_reversion(&data, &symbols, &config.scan),
        );
    }
    ExitCode::SUCCESS
}

fn run_levels(config_path: Option<&Path>, data_dir: &Path, code: &str, interval: Interval) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let data = CsvAdapter::new(data_dir.to_path_buf());
    let symbol = code.trim().to_uppercase();

    let series = match data.fetch_series(&symbol, interval, usize::MAX) {
        Ok(s) if s.is_empty() => return fail(&SigtraderError::NoData { symbol }),
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    let params = &config.scan.levels;
    let levels = find_support_resistance(&series, params.window, params.cluster_threshold);
    let price = series[series.len() - 1].close;

    println!("{symbol} ({interval}, {} bars), last close {price:.2}", series.len());
    for level in levels.resistance.iter().rev().chain(levels.support.iter().rev()) {
        println!("  {:<10} {:>10.2}", level.kind.to_string(), level.price);
    }
    let near = is_near_level(price, &levels.support, params.proximity_threshold)
        || is_near_level(price, &levels.resistance, params.proximity_threshold);
    if near {
        println!(
            "  price is within {:.1}% of a level",
            params.proximity_threshold * 100.0
        );
    }
    ExitCode::SUCCESS
}

fn parse_cycle_time(at: Option<&str>) -> Result<NaiveDateTime, SigtraderError> {
    match at {
        None => Ok(chrono::Local::now().naive_local()),
        Some(raw) => NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M").map_err(|_| {
            SigtraderError::config_invalid("cli", "at", "invalid time, expected YYYY-MM-DD HH:MM")
        }),
    }
}

fn print_report(report: &CycleReport) {
    for record in report.buys.iter().chain(&report.sells) {
        println!(
            "{} {:<6} {:<22} {:>10.4} @ {:>9.2}  pnl {:>8.2}  cash {:>9.2}",
            record.timestamp.format("%H:%M"),
            record.symbol,
            record.action.to_string(),
            record.shares,
            record.price,
            record.pnl,
            record.cash_after
        );
    }
    for rejection in &report.rejections {
        eprintln!("  not traded {}: {}", rejection.symbol, rejection.error);
    }
    println!(
        "buys {}, sells {}, rejected {}, skipped {}, trailing stops raised {}",
        report.buys.len(),
        report.sells.len(),
        report.rejections.len(),
        report.skipped.len(),
        report.trailing_stops_raised
    );
    println!(
        "account value {:.2}, daily P&L {:.2}{}",
        report.account_value,
        report.daily_pl,
        if report.market_close {
            ", positions liquidated at market close"
        } else {
            ""
        }
    );
}

fn run_cycle(
    config_path: Option<&Path>,
    data_dir: &Path,
    sentiment_path: Option<&Path>,
    ledger_path: PathBuf,
    at: Option<&str>,
    open_day: bool,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let now = match parse_cycle_time(at) {
        Ok(t) => t,
        Err(e) => return fail(&e),
    };
    let sentiment = match sentiment_path {
        Some(path) => match CsvSentimentAdapter::from_path(path) {
            Ok(s) => s,
            Err(e) => return fail(&e),
        },
        None => CsvSentimentAdapter::default(),
    };

    let data = CsvAdapter::new(data_dir.to_path_buf());
    let broker = PaperBroker::new(&data);
    let ledger = CsvLedgerWriter::new(ledger_path);
    let ports = Collaborators {
        data: &data,
        prices: &broker,
        orders: &broker,
        sentiment: &sentiment,
        ledger: &ledger,
    };

    let mut engine = TradingEngine::new(config);
    if open_day {
        for gap in engine.open_day(&ports, now) {
            println!(
                "gap {} {:<4} {:+.2}% ({})",
                gap.symbol, gap.direction, gap.gap_pct, gap.sector
            );
        }
    }

    let report = engine.run_cycle(&ports, now);
    print_report(&report);
    eprintln!("Ledger: {}", ledger.path().display());
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    let config = match load_config(Some(config_path)) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    println!("Account:    starting capital {:.2}", config.starting_capital);
    println!(
        "Risk:       max {:.2}/trade, stop {:.1}%, trailing {:.1}%, daily loss {:.1}%",
        config.risk.max_risk_per_trade,
        config.risk.stop_loss_pct * 100.0,
        config.risk.trailing_stop_pct * 100.0,
        config.risk.max_daily_loss_pct * 100.0
    );
    let enabled: Vec<&str> = StrategyTag::ALL
        .iter()
        .filter(|s| config.strategies.enabled(**s))
        .map(|s| s.as_str())
        .collect();
    println!("Strategies: {}", enabled.join(", "));
    println!("Close:      {}", config.market_close.format("%H:%M"));
    for (sector, codes) in config.watchlist.sectors() {
        println!("Watchlist:  {sector}: {}", codes.join(", "));
    }
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
