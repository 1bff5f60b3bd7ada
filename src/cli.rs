//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::adapters::markdown_report::MarkdownReportAdapter;
use crate::domain::backtest::{BacktestConfig, BacktestEngine, BacktestResult};
use crate::domain::config_validation::{
    parse_optional_timestamp, validate_backtest_config, validate_strategy_config,
};
use crate::domain::error::TickreplayError;
use crate::domain::execution::SizingPolicy;
use crate::domain::metrics::Metrics;
use crate::domain::observation::TimeBucket;
use crate::domain::strategy::{PerSymbol, Strategy, StrategyConfig, parse_kinds};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const DEFAULT_REPORT_PATH: &str = "performance.md";

#[derive(Parser, Debug)]
#[command(name = "tickreplay", about = "Tick-level strategy backtester")]
pub struct Cli {
    /// Log filter, e.g. `info` or `tickreplay=debug`. RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// CSV file with timestamp,symbol,price columns
        #[arg(short, long)]
        data: PathBuf,
        /// Markdown report path (overrides [report] output)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also write the full result as JSON
        #[arg(long)]
        json: Option<PathBuf>,
        /// Trade only this symbol (overrides [strategy] symbols)
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show symbols and time range of a data file
    Info {
        #[arg(short, long)]
        data: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            output,
            json,
            symbol,
        } => run_backtest(
            &config,
            &data,
            output.as_deref(),
            json.as_deref(),
            symbol.as_deref(),
        ),
        Command::Validate { config } => run_validate(&config),
        Command::Info { data } => run_info(&data),
    }
}

fn fail(err: TickreplayError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, TickreplayError> {
    FileConfigAdapter::from_file(path)
}

fn invalid(section: &str, key: &str, reason: &str) -> TickreplayError {
    TickreplayError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: reason.into(),
    }
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, TickreplayError> {
    let defaults = BacktestConfig::default();

    let sizing = match adapter
        .get_string("backtest", "sizing")
        .map(|s| s.trim().to_lowercase())
        .as_deref()
    {
        None | Some("fixed") => {
            SizingPolicy::FixedLot(adapter.get_int("backtest", "lot_size", 1))
        }
        Some("all_in") => SizingPolicy::AllInAllOut,
        Some(_) => return Err(invalid("backtest", "sizing", "expected fixed or all_in")),
    };

    let error_bucket = match adapter.get_string("backtest", "error_bucket") {
        None => TimeBucket::default(),
        Some(s) => TimeBucket::parse(&s)
            .ok_or_else(|| invalid("backtest", "error_bucket", "expected minute, hour or day"))?,
    };

    Ok(BacktestConfig {
        initial_capital: adapter.get_double("backtest", "initial_capital", defaults.initial_capital),
        commission_per_trade: adapter.get_double(
            "backtest",
            "commission_per_trade",
            defaults.commission_per_trade,
        ),
        commission_pct: adapter.get_double("backtest", "commission_pct", defaults.commission_pct),
        risk_free_rate: adapter.get_double("backtest", "risk_free_rate", defaults.risk_free_rate),
        sizing,
        error_bucket,
        start: parse_optional_timestamp(adapter, "start")?,
        end: parse_optional_timestamp(adapter, "end")?,
    })
}

fn optional_qty(adapter: &dyn ConfigPort) -> Option<i64> {
    adapter
        .get_string("strategy", "trade_qty")
        .map(|_| adapter.get_int("strategy", "trade_qty", 1))
}

fn get_window(adapter: &dyn ConfigPort, key: &str, default: i64) -> Result<usize, TickreplayError> {
    usize::try_from(adapter.get_int("strategy", key, default))
        .map_err(|_| invalid("strategy", key, "must be a non-negative integer"))
}

fn build_one_strategy(adapter: &dyn ConfigPort, kind: &str) -> Result<StrategyConfig, TickreplayError> {
    match kind {
        "ma_crossover" => Ok(StrategyConfig::MovingAverageCrossover {
            short_window: get_window(adapter, "short_window", 5)?,
            long_window: get_window(adapter, "long_window", 20)?,
            trade_qty: optional_qty(adapter),
        }),
        "momentum" => Ok(StrategyConfig::Momentum {
            lookback: get_window(adapter, "lookback", 10)?,
            threshold: adapter.get_double("strategy", "threshold", 0.01),
            trade_qty: optional_qty(adapter),
        }),
        _ => Err(invalid("strategy", "kind", "expected ma_crossover or momentum")),
    }
}

/// One config per name in `[strategy] kind`, e.g. `ma_crossover, momentum`.
pub fn build_strategy_configs(
    adapter: &dyn ConfigPort,
) -> Result<Vec<StrategyConfig>, TickreplayError> {
    let kinds = adapter
        .get_string("strategy", "kind")
        .map(|k| parse_kinds(&k))
        .filter(|k| !k.is_empty())
        .ok_or_else(|| TickreplayError::ConfigMissing {
            section: "strategy".into(),
            key: "kind".into(),
        })?;

    kinds
        .iter()
        .map(|kind| build_one_strategy(adapter, kind))
        .collect()
}

/// Symbols to trade: the CLI override, else `[strategy] symbols`, else all.
pub fn resolve_symbols(
    symbol_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Option<Vec<String>> {
    if let Some(s) = symbol_override {
        return Some(vec![s.trim().to_uppercase()]);
    }

    let symbols: Vec<String> = config
        .get_string("strategy", "symbols")?
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    if symbols.is_empty() { None } else { Some(symbols) }
}

pub fn build_strategy(
    adapter: &dyn ConfigPort,
    symbol_override: Option<&str>,
) -> Result<PerSymbol, TickreplayError> {
    let strategy_configs = build_strategy_configs(adapter)?;

    // Bad parameters would otherwise fail every tick.
    for config in &strategy_configs {
        config
            .validate()
            .map_err(|e| invalid("strategy", "kind", &e.message))?;
    }

    let strategy = PerSymbol::from_configs(strategy_configs);
    Ok(match resolve_symbols(symbol_override, adapter) {
        Some(symbols) => strategy.with_symbols(symbols),
        None => strategy,
    })
}

/// Loads, validates and replays; returns the result and metrics.
pub fn execute_backtest(
    config: &dyn ConfigPort,
    data_port: &dyn DataPort,
    symbol_override: Option<&str>,
) -> Result<(BacktestResult, Metrics, String), TickreplayError> {
    validate_backtest_config(config)?;
    validate_strategy_config(config)?;

    let bt_config = build_backtest_config(config)?;
    let mut strategy = build_strategy(config, symbol_override)?;
    let strategy_name = strategy.name().to_string();

    let feed = data_port.fetch_observations(bt_config.start, bt_config.end)?;
    if !feed.skipped.is_empty() {
        warn!(skipped = feed.skipped.len(), "some input rows could not be parsed");
    }

    let engine = BacktestEngine::from_config(&bt_config);
    let mut result = engine.run(&feed.observations, &mut strategy, bt_config.ledger())?;
    for row in &feed.skipped {
        result
            .error_log
            .record_unparsed(format!("line {}: {}", row.line, row.reason));
    }

    let metrics = Metrics::compute(&result, bt_config.risk_free_rate);
    Ok((result, metrics, strategy_name))
}

fn run_backtest(
    config_path: &Path,
    data_path: &Path,
    output_path: Option<&Path>,
    json_path: Option<&Path>,
    symbol_override: Option<&str>,
) -> ExitCode {
    info!(config = %config_path.display(), "loading config");
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    info!(data = %data_path.display(), "loading market data");
    let data_port = CsvAdapter::new(data_path);

    let (result, metrics, strategy_name) =
        match execute_backtest(&config, &data_port, symbol_override) {
            Ok(r) => r,
            Err(e) => return fail(e),
        };

    print_summary(&result, &metrics);

    let output = output_path
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("report", "output").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_PATH));

    let generated_at = chrono::Local::now().naive_local();
    let markdown = MarkdownReportAdapter::new(strategy_name.as_str(), generated_at);
    if let Err(e) = markdown.write(&result, &metrics, &output.to_string_lossy()) {
        return fail(e);
    }
    eprintln!("\nReport written to: {}", output.display());

    if let Some(json_path) = json_path {
        let mut json = JsonReportAdapter::new(strategy_name.as_str());
        if config.get_bool("report", "json_compact", false) {
            json = json.compact();
        }
        if let Err(e) = json.write(&result, &metrics, &json_path.to_string_lossy()) {
            return fail(e);
        }
        eprintln!("JSON written to:   {}", json_path.display());
    }

    ExitCode::SUCCESS
}

fn print_summary(result: &BacktestResult, metrics: &Metrics) {
    eprintln!("\n=== Results ===");
    eprintln!("Ticks:            {}", result.ticks_processed);
    eprintln!("Final Equity:     {:.2}", metrics.final_equity);
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!(
        "Annualized:       {:.2}%",
        metrics.annualized_return * 100.0
    );
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", metrics.sortino_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", metrics.max_drawdown * 100.0);
    eprintln!(
        "Orders:           {} filled, {} rejected",
        metrics.orders_filled, metrics.orders_rejected
    );
    eprintln!("Round Trips:      {}", metrics.total_trades);
    eprintln!("Win Rate:         {:.1}%", metrics.win_rate * 100.0);
    eprintln!("Errors:           {}", metrics.error_count);

    let positions: Vec<_> = result.ledger.positions().collect();
    if !positions.is_empty() {
        eprintln!("\n=== Open Positions ===");
        for pos in positions {
            eprintln!(
                "  {}:  {} @ {:.2}",
                pos.symbol, pos.quantity, pos.average_price
            );
        }
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    let checked = validate_backtest_config(&config)
        .and_then(|_| validate_strategy_config(&config))
        .and_then(|_| build_backtest_config(&config))
        .and_then(|bt| build_strategy(&config, None).map(|s| (bt, s)));

    let (bt_config, strategy) = match checked {
        Ok(v) => v,
        Err(e) => return fail(e),
    };

    eprintln!("\nBacktest:");
    eprintln!("  initial_capital: {:.2}", bt_config.initial_capital);
    eprintln!(
        "  commission:      {:.2} + {:.4}%",
        bt_config.commission_per_trade, bt_config.commission_pct
    );
    eprintln!("  sizing:          {:?}", bt_config.sizing);
    eprintln!("  error_bucket:    {:?}", bt_config.error_bucket);
    eprintln!("\nStrategy: {}", strategy.name());
    match resolve_symbols(None, &config) {
        Some(symbols) => eprintln!("  symbols: {}", symbols.join(", ")),
        None => eprintln!("  symbols: all"),
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_info(data_path: &Path) -> ExitCode {
    let adapter = CsvAdapter::new(data_path);
    let feed = match adapter.fetch_observations(None, None) {
        Ok(f) => f,
        Err(e) => return fail(e),
    };

    let Some((first, last)) = feed.time_range() else {
        eprintln!("{}: no observations", data_path.display());
        return fail(TickreplayError::EmptyFeed);
    };

    let mut counts: std::collections::BTreeMap<&str, usize> = std::collections::BTreeMap::new();
    for obs in &feed.observations {
        *counts.entry(obs.symbol.as_str()).or_insert(0) += 1;
    }

    println!(
        "{}: {} observations, {} to {}",
        data_path.display(),
        feed.observations.len(),
        first,
        last
    );
    for (symbol, count) in &counts {
        println!("  {}: {} ticks", symbol, count);
    }
    if !feed.skipped.is_empty() {
        eprintln!("{} rows could not be parsed", feed.skipped.len());
    }
    ExitCode::SUCCESS
}
