//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_bar_adapter::CsvBarAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::csv_signal_adapter::CsvSignalAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestConfig, BacktestResult, Simulation};
use crate::domain::config_validation::{self, RunSettings};
use crate::domain::error::SigtraderError;
use crate::domain::order::OrderState;
use crate::domain::universe::parse_symbols;
use crate::ports::bar_port::BarPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::ReportPort;
use crate::ports::signal_port::SignalPort;

/// Environment variable holding a tracing filter directive.
pub const LOG_ENV: &str = "SIGTRADER_LOG";

#[derive(Parser, Debug)]
#[command(
    name = "sigtrader",
    about = "Daily-bar backtester driven by precomputed trading decisions"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated symbols overriding [backtest] symbols
        #[arg(long)]
        symbols: Option<String>,
        /// Report directory overriding [report] output_dir
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for symbol(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// List symbols available in the bar directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
}

impl Command {
    fn config_path(&self) -> &Path {
        match self {
            Command::Backtest { config, .. }
            | Command::Validate { config }
            | Command::Info { config, .. }
            | Command::ListSymbols { config } => config,
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let adapter = match load_config(cli.command.config_path()) {
        Ok(a) => a,
        Err(code) => {
            if let Err(e) = init_tracing(None) {
                eprintln!("error: {e}");
            }
            return code;
        }
    };
    if let Err(e) = init_tracing(Some(&adapter)) {
        eprintln!("error: {e}");
        return ExitCode::from(2);
    }

    match cli.command {
        Command::Backtest {
            symbols,
            output,
            dry_run,
            ..
        } => run_backtest(&adapter, symbols.as_deref(), output, dry_run),
        Command::Validate { config } => run_validate(&config, &adapter),
        Command::Info { symbol, .. } => run_info(&adapter, symbol.as_deref()),
        Command::ListSymbols { .. } => run_list_symbols(&adapter),
    }
}

/// Install the global fmt subscriber. The filter comes from `SIGTRADER_LOG`,
/// then `[logging] filter`, then `info`. A second call is a no-op.
pub fn init_tracing(config: Option<&dyn ConfigPort>) -> Result<(), String> {
    let filter = std::env::var(LOG_ENV)
        .ok()
        .or_else(|| config.and_then(|c| config_validation::log_filter(c)))
        .unwrap_or_else(|| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| format!("invalid log filter: {err}"))?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
    Ok(())
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Apply a `--symbols` override to an already validated config.
pub fn resolve_symbols(
    symbols_override: Option<&str>,
    config: BacktestConfig,
) -> Result<BacktestConfig, SigtraderError> {
    let Some(raw) = symbols_override else {
        return Ok(config);
    };
    let symbols = parse_symbols(raw)
        .map_err(|e| SigtraderError::config_invalid("backtest", "symbols", e.to_string()))?;
    let config = BacktestConfig { symbols, ..config };
    config.validate()?;
    Ok(config)
}

/// Resolve and validate everything a backtest run needs, applying CLI
/// overrides on top of the config file.
pub fn resolve_run_settings(
    adapter: &dyn ConfigPort,
    symbols_override: Option<&str>,
    output_override: Option<PathBuf>,
) -> Result<RunSettings, SigtraderError> {
    let mut settings = config_validation::load_run_settings(adapter)?;
    settings.backtest = resolve_symbols(symbols_override, settings.backtest)?;
    if let Some(output) = output_override {
        settings.output_dir = output;
    }
    Ok(settings)
}

fn run_backtest(
    adapter: &FileConfigAdapter,
    symbols_override: Option<&str>,
    output_override: Option<PathBuf>,
    dry_run: bool,
) -> ExitCode {
    // Stage 1: resolve and validate configuration
    let settings = match resolve_run_settings(adapter, symbols_override, output_override) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if dry_run {
        print_settings(&settings);
        eprintln!("\nDry run complete: configuration is valid");
        return ExitCode::SUCCESS;
    }

    // Stage 2: load decisions
    let signals = CsvSignalAdapter::new(settings.data.signals_file.clone(), settings.duplicate_policy);
    eprintln!("Loading decisions from {}", signals.path().display());
    let book = match signals.load() {
        Ok(b) => b,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stages 3-5: simulate, summarize, report
    let bars = CsvBarAdapter::new(settings.data.ohlcv_dir.clone());
    match run_backtest_pipeline(
        &bars,
        &book,
        &CsvReportAdapter::new(),
        settings.backtest,
        &settings.output_dir,
    ) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Run a simulation over the given ports, print the summary and write the
/// report.
pub fn run_backtest_pipeline(
    bars: &dyn BarPort,
    signals: &dyn SignalPort,
    report: &dyn ReportPort,
    config: BacktestConfig,
    output_dir: &Path,
) -> Result<BacktestResult, SigtraderError> {
    eprintln!(
        "Running backtest: {} symbols, {} to {}",
        config.symbols.len(),
        config.start_date,
        config.end_date,
    );

    let simulation = Simulation::new(config, bars, signals)?;
    let result = simulation.run()?;

    print_summary(&result);

    if result.is_empty() {
        eprintln!("\nNo data in range; no report written");
        return Ok(result);
    }

    let written = report.write(&result, output_dir)?;
    eprintln!("\nReport written to: {}", output_dir.display());
    for path in &written {
        eprintln!("  {}", path.display());
    }
    Ok(result)
}

pub fn print_summary(result: &BacktestResult) {
    for skipped in &result.skipped {
        eprintln!("{}: {}, skipped", skipped.symbol, skipped.reason);
    }

    let m = &result.metrics;
    eprintln!("\n=== Results ===");
    eprintln!("Starting Equity:  {:.2}", result.starting_equity());
    eprintln!("Final Equity:     {:.2}", result.final_equity());
    eprintln!("Final Cash:       {:.2}", result.final_cash);
    eprintln!("Total Return:     {:.2}%", m.total_return * 100.0);
    eprintln!("Volatility (ann): {:.2}%", m.annualized_volatility * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", m.sharpe_ratio);
    eprintln!("Max Drawdown:     {:.2}%", m.max_drawdown * 100.0);
    eprintln!(
        "Orders:           {} ({} filled, {} rejected)",
        result.trade_log.len(),
        result.count_in_state(OrderState::Filled),
        result.count_in_state(OrderState::Rejected),
    );

    let s = &result.trade_stats;
    if s.total_trades > 0 {
        eprintln!("Round Trips:      {}", s.total_trades);
        eprintln!("Win Rate:         {:.1}%", s.win_rate * 100.0);
        eprintln!("Realized PnL:     {:.2}", result.realized_pnl);
        eprintln!("Commission Paid:  {:.2}", result.commission_paid);
    }
    if result.unrealized_pnl != 0.0 {
        eprintln!("Unrealized PnL:   {:.2}", result.unrealized_pnl);
    }
}

fn print_settings(settings: &RunSettings) {
    let bt = &settings.backtest;
    eprintln!("Backtest:");
    eprintln!("  symbols:         {}", bt.symbols.join(", "));
    eprintln!("  range:           {} to {}", bt.start_date, bt.end_date);
    eprintln!("  starting_cash:   {:.2}", bt.starting_cash);
    eprintln!("  commission_rate: {}", bt.commission_rate);
    eprintln!("  stake_size:      {}", bt.stake_size);
    eprintln!("Data:");
    eprintln!("  ohlcv_dir:       {}", settings.data.ohlcv_dir.display());
    eprintln!("  signals_file:    {}", settings.data.signals_file.display());
    eprintln!("  duplicates:      {:?}", settings.duplicate_policy);
    eprintln!("Report:");
    eprintln!("  output_dir:      {}", settings.output_dir.display());
}

fn run_validate(config_path: &Path, adapter: &FileConfigAdapter) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    match config_validation::load_run_settings(adapter) {
        Ok(settings) => {
            print_settings(&settings);
            eprintln!("\nConfiguration is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn bar_adapter(adapter: &dyn ConfigPort) -> Result<CsvBarAdapter, SigtraderError> {
    Ok(CsvBarAdapter::new(config_validation::ohlcv_dir(adapter)?))
}

fn run_info(adapter: &FileConfigAdapter, symbol: Option<&str>) -> ExitCode {
    let bars = match bar_adapter(adapter) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let symbols = match symbol {
        Some(s) => vec![s.trim().to_uppercase()],
        None => match config_validation::build_backtest_config(adapter) {
            Ok(c) => c.symbols,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        },
    };

    for s in &symbols {
        match bars.get_data_range(s) {
            Ok(Some((min_date, max_date, count))) => {
                println!("{}: {} bars, {} to {}", s, count, min_date, max_date);
            }
            Ok(None) => eprintln!("{}: no data found", s),
            Err(e) => {
                eprintln!("error querying {}: {}", s, e);
                return (&e).into();
            }
        }
    }
    ExitCode::SUCCESS
}

fn run_list_symbols(adapter: &FileConfigAdapter) -> ExitCode {
    let symbols = match bar_adapter(adapter).and_then(|b| b.list_symbols()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if symbols.is_empty() {
        eprintln!("No symbols found");
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}
