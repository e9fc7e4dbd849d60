//! Configuration loading and validation.
//!
//! Every field is resolved and checked here before a simulation is built.

use std::path::PathBuf;

use crate::domain::backtest::BacktestConfig;
use crate::domain::decision::DuplicatePolicy;
use crate::domain::error::SigtraderError;
use crate::domain::execution::{DEFAULT_COMMISSION_RATE, DEFAULT_STAKE_SIZE};
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DEFAULT_STARTING_CASH: f64 = 100_000.0;
pub const DEFAULT_REPORT_DIR: &str = "report";

/// Everything a `backtest` command needs, resolved from one config file.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub backtest: BacktestConfig,
    pub data: DataSettings,
    pub duplicate_policy: DuplicatePolicy,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub ohlcv_dir: PathBuf,
    pub signals_file: PathBuf,
}

pub fn load_run_settings(config: &dyn ConfigPort) -> Result<RunSettings, SigtraderError> {
    Ok(RunSettings {
        backtest: build_backtest_config(config)?,
        data: data_settings(config)?,
        duplicate_policy: duplicate_policy(config)?,
        output_dir: report_dir(config),
    })
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, SigtraderError> {
    let backtest = BacktestConfig {
        symbols: symbols(config)?,
        start_date: parse_date(config, "start_date")?,
        end_date: parse_date(config, "end_date")?,
        starting_cash: config.get_double_or("backtest", "starting_cash", DEFAULT_STARTING_CASH)?,
        commission_rate: config.get_double_or(
            "backtest",
            "commission_rate",
            DEFAULT_COMMISSION_RATE,
        )?,
        stake_size: config.get_double_or("backtest", "stake_size", DEFAULT_STAKE_SIZE)?,
    };
    backtest.validate()?;
    Ok(backtest)
}

fn symbols(config: &dyn ConfigPort) -> Result<Vec<String>, SigtraderError> {
    let (key, raw) = match (
        config.get_non_empty("backtest", "symbols"),
        config.get_non_empty("backtest", "symbol"),
    ) {
        (Some(list), _) => ("symbols", list),
        (None, Some(single)) => ("symbol", single),
        (None, None) => {
            return Err(SigtraderError::ConfigMissing {
                section: "backtest".to_string(),
                key: "symbols".to_string(),
            })
        }
    };
    parse_symbols(&raw).map_err(|e| SigtraderError::config_invalid("backtest", key, e.to_string()))
}

fn parse_date(config: &dyn ConfigPort, field: &str) -> Result<NaiveDate, SigtraderError> {
    match config.get_non_empty("backtest", field) {
        None => Err(SigtraderError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| {
            SigtraderError::config_invalid(
                "backtest",
                field,
                format!("invalid {field} format, expected YYYY-MM-DD"),
            )
        }),
    }
}

pub fn data_settings(config: &dyn ConfigPort) -> Result<DataSettings, SigtraderError> {
    Ok(DataSettings {
        ohlcv_dir: required_path(config, "data", "ohlcv_dir")?,
        signals_file: required_path(config, "data", "signals_file")?,
    })
}

pub fn ohlcv_dir(config: &dyn ConfigPort) -> Result<PathBuf, SigtraderError> {
    required_path(config, "data", "ohlcv_dir")
}

fn required_path(config: &dyn ConfigPort, section: &str, key: &str) -> Result<PathBuf, SigtraderError> {
    config
        .get_non_empty(section, key)
        .map(PathBuf::from)
        .ok_or_else(|| SigtraderError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        })
}

pub fn duplicate_policy(config: &dyn ConfigPort) -> Result<DuplicatePolicy, SigtraderError> {
    match config.get_non_empty("signals", "duplicate_policy") {
        None => Ok(DuplicatePolicy::default()),
        Some(raw) => raw
            .parse()
            .map_err(|e: String| SigtraderError::config_invalid("signals", "duplicate_policy", e)),
    }
}

pub fn report_dir(config: &dyn ConfigPort) -> PathBuf {
    config
        .get_non_empty("report", "output_dir")
        .map_or_else(|| PathBuf::from(DEFAULT_REPORT_DIR), PathBuf::from)
}

pub fn log_filter(config: &dyn ConfigPort) -> Option<String> {
    config.get_non_empty("logging", "filter")
}
