//! CLI integration tests.
//!
//! Tests cover:
//! - Config parsing (build_backtest_config, build_strategy)
//! - The backtest orchestration with MockDataPort
//! - The built binary against INI and CSV files on disk, including exit codes

mod common;

use approx::assert_relative_eq;
use common::*;
use std::fs;
use std::process::Command;
use tickreplay::adapters::csv_adapter::CsvAdapter;
use tickreplay::adapters::file_config_adapter::FileConfigAdapter;
use tickreplay::cli;
use tickreplay::domain::error::TickreplayError;
use tickreplay::domain::error_log::UNPARSED_BUCKET;
use tickreplay::domain::execution::SizingPolicy;
use tickreplay::domain::observation::TimeBucket;
use tickreplay::domain::strategy::Strategy;

const VALID_INI: &str = r#"
[backtest]
initial_capital = 10000
commission_per_trade = 0
commission_pct = 0
risk_free_rate = 0.02
sizing = fixed
lot_size = 1
error_bucket = hour

[strategy]
kind = ma_crossover
short_window = 2
long_window = 3
trade_qty = 5

[report]
output = performance.md
"#;

fn crossover_path() -> Vec<tickreplay::domain::observation::MarketObservation> {
    price_path("AAPL", &[10.0, 10.0, 10.0, 13.0, 7.0, 4.0])
}

mod config_loading {
    use super::*;

    #[test]
    fn build_backtest_config_valid_full() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let config = cli::build_backtest_config(&adapter).unwrap();

        assert_relative_eq!(config.initial_capital, 10_000.0);
        assert_relative_eq!(config.risk_free_rate, 0.02);
        assert_eq!(config.sizing, SizingPolicy::FixedLot(1));
        assert_eq!(config.error_bucket, TimeBucket::Hour);
        assert!(config.start.is_none());
    }

    #[test]
    fn build_backtest_config_rejects_bad_window_timestamp() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\nstart = soon\n").unwrap();
        let err = cli::build_backtest_config(&adapter).unwrap_err();
        assert!(matches!(err, TickreplayError::ConfigInvalid { key, .. } if key == "start"));
    }

    #[test]
    fn build_strategy_applies_symbol_filter() {
        let ini = VALID_INI.replace("trade_qty = 5\n", "trade_qty = 5\nsymbols = msft\n");
        let adapter = FileConfigAdapter::from_string(&ini).unwrap();
        let strategy = cli::build_strategy(&adapter, None).unwrap();
        assert_eq!(strategy.name(), "ma_crossover");
        assert_eq!(
            cli::resolve_symbols(None, &adapter),
            Some(vec!["MSFT".to_string()])
        );
    }
}

mod orchestration {
    use super::*;

    #[test]
    fn execute_backtest_with_mock_port() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let port = MockDataPort::new(crossover_path()).with_skipped(4, "invalid price 'x'");

        let (result, metrics, name) = cli::execute_backtest(&adapter, &port, None).unwrap();

        assert_eq!(name, "ma_crossover");
        assert_eq!(result.trade_log.len(), 2);
        assert_relative_eq!(result.ledger.cash(), 9_955.0);
        assert_eq!(result.error_log.count(UNPARSED_BUCKET), 1);
        assert_eq!(metrics.error_count, 1);
        assert_eq!(metrics.total_trades, 1);
        assert_eq!(metrics.trades_lost, 1);
    }

    #[test]
    fn symbol_override_excludes_other_symbols() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let port = MockDataPort::new(crossover_path());

        let (result, _, _) = cli::execute_backtest(&adapter, &port, Some("MSFT")).unwrap();

        assert!(result.trade_log.is_empty());
        assert_eq!(result.equity_curve.len(), 6);
    }

    #[test]
    fn window_outside_data_is_an_empty_feed() {
        let ini = VALID_INI.replace(
            "error_bucket = hour\n",
            "error_bucket = hour\nstart = 2030-01-01\n",
        );
        let adapter = FileConfigAdapter::from_string(&ini).unwrap();
        let port = MockDataPort::new(crossover_path());

        let err = cli::execute_backtest(&adapter, &port, None).unwrap_err();
        assert!(matches!(err, TickreplayError::EmptyFeed));
    }

    #[test]
    fn data_errors_propagate() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let port = MockDataPort::new(vec![]).with_error("disk on fire");

        let err = cli::execute_backtest(&adapter, &port, None).unwrap_err();
        assert!(matches!(err, TickreplayError::Data { .. }));
    }

    #[test]
    fn lowercase_feed_matches_symbols_filter() {
        let rising: Vec<_> = price_path("aapl", &[100.0, 110.0, 121.0, 133.0]);
        let file = write_temp(&csv_content(&rising), ".csv");
        let port = CsvAdapter::new(file.path());
        let ini = "[strategy]\nkind = momentum\nlookback = 1\n";

        let unfiltered = FileConfigAdapter::from_string(ini).unwrap();
        let (all, _, _) = cli::execute_backtest(&unfiltered, &port, None).unwrap();

        let filtered = FileConfigAdapter::from_string(&format!("{ini}symbols = aapl\n")).unwrap();
        let (only_aapl, _, _) = cli::execute_backtest(&filtered, &port, None).unwrap();

        assert_eq!(all.trade_log.len(), 3);
        assert_eq!(only_aapl.trade_log.len(), all.trade_log.len());
        assert!(only_aapl.trade_log.iter().all(|o| o.symbol == "AAPL"));
    }

    #[test]
    fn combined_strategies_act_on_first_signal() {
        let ini = VALID_INI.replace(
            "kind = ma_crossover\n",
            "kind = ma_crossover, momentum\nlookback = 1\nthreshold = 0.2\n",
        );
        let adapter = FileConfigAdapter::from_string(&ini).unwrap();
        let port = MockDataPort::new(crossover_path());

        let (result, metrics, name) = cli::execute_backtest(&adapter, &port, None).unwrap();

        assert_eq!(name, "ma_crossover+momentum");
        // Crossover buys at 13; momentum exits on the drop to 7 before the
        // crossover would have sold at 4.
        assert_eq!(result.trade_log.len(), 2);
        assert_eq!(result.trade_log[0].timestamp, t(3));
        assert_eq!(result.trade_log[0].quantity, 5);
        assert_eq!(result.trade_log[1].timestamp, t(4));
        assert_eq!(result.trade_log[1].quantity, -5);
        assert_relative_eq!(result.ledger.cash(), 9_970.0);
        assert_eq!(metrics.trades_lost, 1);
    }

    #[test]
    fn non_numeric_config_is_rejected() {
        let ini = VALID_INI.replace("initial_capital = 10000", "initial_capital = 10k");
        let adapter = FileConfigAdapter::from_string(&ini).unwrap();
        let port = MockDataPort::new(crossover_path());

        let err = cli::execute_backtest(&adapter, &port, None).unwrap_err();
        assert!(matches!(err, TickreplayError::ConfigInvalid { key, .. } if key == "initial_capital"));
    }

    #[test]
    fn invalid_config_fails_before_loading_data() {
        let ini = VALID_INI.replace("long_window = 3", "long_window = 1");
        let adapter = FileConfigAdapter::from_string(&ini).unwrap();
        let port = MockDataPort::new(vec![]).with_error("should not be reached");

        let err = cli::execute_backtest(&adapter, &port, None).unwrap_err();
        assert!(matches!(err, TickreplayError::ConfigInvalid { .. }));
    }
}

mod binary {
    use super::*;

    fn tickreplay() -> Command {
        Command::new(env!("CARGO_BIN_EXE_tickreplay"))
    }

    #[test]
    fn backtest_writes_reports() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = dir.path().join("config.ini");
        let data = dir.path().join("market_data.csv");
        let report = dir.path().join("report.md");
        let json = dir.path().join("result.json");
        fs::write(&config, VALID_INI).unwrap();
        fs::write(&data, csv_content(&crossover_path())).unwrap();

        let status = tickreplay()
            .arg("backtest")
            .arg("--config")
            .arg(&config)
            .arg("--data")
            .arg(&data)
            .arg("--output")
            .arg(&report)
            .arg("--json")
            .arg(&json)
            .status()
            .unwrap();

        assert_eq!(status.code(), Some(0));
        let md = fs::read_to_string(&report).unwrap();
        assert!(md.contains("# Backtest Performance Report"));
        assert!(md.contains("ma_crossover"));
        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(parsed["trade_log"].as_array().unwrap().len(), 2);
        assert!(fs::read_to_string(&json).unwrap().contains('\n'));
    }

    #[test]
    fn json_compact_writes_a_single_line() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = dir.path().join("config.ini");
        let data = dir.path().join("market_data.csv");
        let json = dir.path().join("result.json");
        fs::write(&config, format!("{VALID_INI}json_compact = true\n")).unwrap();
        fs::write(&data, csv_content(&crossover_path())).unwrap();

        let status = tickreplay()
            .arg("backtest")
            .arg("--config")
            .arg(&config)
            .arg("--data")
            .arg(&data)
            .arg("--output")
            .arg(dir.path().join("report.md"))
            .arg("--json")
            .arg(&json)
            .status()
            .unwrap();

        assert_eq!(status.code(), Some(0));
        let written = fs::read_to_string(&json).unwrap();
        assert_eq!(written.trim_end().lines().count(), 1);
    }

    #[test]
    fn missing_config_exits_with_config_code() {
        let data = write_temp(&csv_content(&crossover_path()), ".csv");
        let status = tickreplay()
            .args(["backtest", "--config", "/nonexistent/config.ini", "--data"])
            .arg(data.path())
            .status()
            .unwrap();
        assert_eq!(status.code(), Some(2));
    }

    #[test]
    fn empty_data_exits_with_data_code() {
        let config = write_temp(VALID_INI, ".ini");
        let data = write_temp("timestamp,symbol,price\n", ".csv");
        let dir = tempfile::TempDir::new().unwrap();
        let status = tickreplay()
            .arg("backtest")
            .arg("--config")
            .arg(config.path())
            .arg("--data")
            .arg(data.path())
            .arg("--output")
            .arg(dir.path().join("r.md"))
            .status()
            .unwrap();
        assert_eq!(status.code(), Some(5));
    }

    #[test]
    fn validate_accepts_good_config_and_rejects_bad() {
        let good = write_temp(VALID_INI, ".ini");
        let status = tickreplay()
            .arg("validate")
            .arg("--config")
            .arg(good.path())
            .status()
            .unwrap();
        assert_eq!(status.code(), Some(0));

        let bad = write_temp(&VALID_INI.replace("kind = ma_crossover", "kind = rsi"), ".ini");
        let status = tickreplay()
            .arg("validate")
            .arg("--config")
            .arg(bad.path())
            .status()
            .unwrap();
        assert_eq!(status.code(), Some(2));
    }

    #[test]
    fn info_lists_symbols() {
        let mut observations = crossover_path();
        observations.push(obs(10, "MSFT", 300.0));
        let data = write_temp(&csv_content(&observations), ".csv");

        let output = tickreplay().arg("info").arg("--data").arg(data.path()).output().unwrap();

        assert!(output.status.success());
        let stdout = String::from_utf8(output.stdout).unwrap();
        assert!(stdout.contains("7 observations"));
        assert!(stdout.contains("AAPL: 6 ticks"));
        assert!(stdout.contains("MSFT: 1 ticks"));
    }
}
