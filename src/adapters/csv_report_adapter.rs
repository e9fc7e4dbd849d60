//! CSV report adapter implementing ReportPort.
//!
//! Writes four files into the output directory: the equity curve, the full
//! order log, closed round trips and a `metric,value` summary.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SigtraderError;
use crate::domain::ledger::EquityPoint;
use crate::domain::order::{Order, OrderState};
use crate::domain::position::ClosedTrade;
use crate::ports::report_port::ReportPort;

pub const EQUITY_CURVE_FILE: &str = "equity_curve.csv";
pub const TRADES_FILE: &str = "trades.csv";
pub const ROUND_TRIPS_FILE: &str = "round_trips.csv";
pub const METRICS_FILE: &str = "metrics.csv";

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn report_error(context: &str, err: impl std::fmt::Display) -> SigtraderError {
    SigtraderError::Report {
        reason: format!("{context}: {err}"),
    }
}

fn finish(wtr: csv::Writer<Vec<u8>>, context: &str) -> Result<String, SigtraderError> {
    let data = wtr
        .into_inner()
        .map_err(|e| report_error(context, format!("failed to flush CSV writer: {e}")))?;
    String::from_utf8(data).map_err(|e| report_error(context, e))
}

fn opt_f64(value: Option<f64>) -> String {
    value.map_or_else(String::new, |v| format!("{v:.6}"))
}

pub fn equity_curve_csv(points: &[EquityPoint]) -> Result<String, SigtraderError> {
    let ctx = EQUITY_CURVE_FILE;
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "equity", "cash"])
        .map_err(|e| report_error(ctx, e))?;
    for p in points {
        wtr.write_record([
            p.date.to_string(),
            format!("{:.6}", p.equity),
            format!("{:.6}", p.cash),
        ])
        .map_err(|e| report_error(ctx, e))?;
    }
    finish(wtr, ctx)
}

/// One row per order, in creation order, whatever its final state.
pub fn trades_csv(orders: &[Order]) -> Result<String, SigtraderError> {
    let ctx = TRADES_FILE;
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "order_id",
        "created_at",
        "symbol",
        "side",
        "quantity",
        "state",
        "filled_at",
        "filled_price",
        "commission",
        "reject_reason",
    ])
    .map_err(|e| report_error(ctx, e))?;

    for o in orders {
        wtr.write_record([
            o.id.0.to_string(),
            o.created_at.to_string(),
            o.symbol.clone(),
            o.side.to_string(),
            format!("{:.6}", o.quantity),
            o.state.to_string(),
            o.filled_at.map(|d| d.to_string()).unwrap_or_default(),
            opt_f64(o.filled_price),
            opt_f64(o.commission),
            o.reject_reason
                .as_ref()
                .map(|r| r.to_string())
                .unwrap_or_default(),
        ])
        .map_err(|e| report_error(ctx, e))?;
    }
    finish(wtr, ctx)
}

pub fn round_trips_csv(trades: &[ClosedTrade]) -> Result<String, SigtraderError> {
    let ctx = ROUND_TRIPS_FILE;
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "quantity",
        "entry_date",
        "entry_price",
        "exit_date",
        "exit_price",
        "holding_days",
        "commission",
        "pnl",
    ])
    .map_err(|e| report_error(ctx, e))?;

    for t in trades {
        wtr.write_record([
            t.symbol.clone(),
            format!("{:.6}", t.quantity),
            t.entry_date.to_string(),
            format!("{:.6}", t.entry_price),
            t.exit_date.to_string(),
            format!("{:.6}", t.exit_price),
            t.holding_days().to_string(),
            format!("{:.6}", t.commission),
            format!("{:.6}", t.pnl),
        ])
        .map_err(|e| report_error(ctx, e))?;
    }
    finish(wtr, ctx)
}

pub fn metrics_csv(result: &BacktestResult) -> Result<String, SigtraderError> {
    let ctx = METRICS_FILE;
    let m = &result.metrics;
    let s = &result.trade_stats;
    let rows: [(&str, String); 17] = [
        ("starting_equity", format!("{:.6}", result.starting_equity())),
        ("final_equity", format!("{:.6}", result.final_equity())),
        ("final_cash", format!("{:.6}", result.final_cash)),
        ("total_return", format!("{:.8}", m.total_return)),
        ("annualized_volatility", format!("{:.8}", m.annualized_volatility)),
        ("sharpe_ratio", format!("{:.8}", m.sharpe_ratio)),
        ("max_drawdown", format!("{:.8}", m.max_drawdown)),
        ("realized_pnl", format!("{:.6}", result.realized_pnl)),
        ("commission_paid", format!("{:.6}", result.commission_paid)),
        ("orders", result.trade_log.len().to_string()),
        ("orders_filled", result.count_in_state(OrderState::Filled).to_string()),
        ("orders_rejected", result.count_in_state(OrderState::Rejected).to_string()),
        ("round_trips", s.total_trades.to_string()),
        ("trades_won", s.trades_won.to_string()),
        ("trades_lost", s.trades_lost.to_string()),
        ("win_rate", format!("{:.6}", s.win_rate)),
        ("skipped_symbols", result.skipped.len().to_string()),
    ];

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["metric", "value"])
        .map_err(|e| report_error(ctx, e))?;
    for (name, value) in rows {
        wtr.write_record([name, value.as_str()])
            .map_err(|e| report_error(ctx, e))?;
    }
    finish(wtr, ctx)
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, SigtraderError> {
        fs::create_dir_all(output_dir).map_err(|e| {
            report_error(&format!("failed to create {}", output_dir.display()), e)
        })?;

        let files = [
            (EQUITY_CURVE_FILE, equity_curve_csv(&result.equity_curve)?),
            (TRADES_FILE, trades_csv(&result.trade_log)?),
            (ROUND_TRIPS_FILE, round_trips_csv(&result.closed_trades)?),
            (METRICS_FILE, metrics_csv(result)?),
        ];

        let mut written = Vec::with_capacity(files.len());
        for (name, content) in files {
            let path = output_dir.join(name);
            fs::write(&path, content)
                .map_err(|e| report_error(&format!("failed to write {}", path.display()), e))?;
            tracing::debug!(path = %path.display(), "report file written");
            written.push(path);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::BacktestConfig;
    use crate::domain::metrics::{Metrics, TradeStats};
    use crate::domain::order::{OrderId, OrderSide, RejectReason};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
    }

    fn sample_result() -> BacktestResult {
        let config = BacktestConfig {
            symbols: vec!["AAPL".into()],
            start_date: date(1),
            end_date: date(31),
            starting_cash: 1000.0,
            commission_rate: 0.0,
            stake_size: 1.0,
        };

        let mut buy = Order::new(OrderId(1), "AAPL", OrderSide::Buy, 1.0, date(3));
        buy.submit().unwrap();
        buy.fill(100.0, 0.0, date(3)).unwrap();

        let mut sell = Order::new(OrderId(2), "AAPL", OrderSide::Sell, 1.0, date(4));
        sell.submit().unwrap();
        sell.reject(RejectReason::NoPosition {
            symbol: "AAPL".into(),
        })
        .unwrap();

        let equity_curve = vec![
            EquityPoint {
                date: date(3),
                equity: 1000.0,
                cash: 900.0,
            },
            EquityPoint {
                date: date(4),
                equity: 1010.0,
                cash: 900.0,
            },
        ];
        let metrics = Metrics::compute(&equity_curve);

        BacktestResult {
            config,
            equity_curve,
            trade_log: vec![buy, sell],
            closed_trades: vec![ClosedTrade {
                symbol: "AAPL".into(),
                quantity: 1.0,
                entry_price: 100.0,
                exit_price: 110.0,
                entry_date: date(3),
                exit_date: date(5),
                commission: 0.0,
                pnl: 10.0,
            }],
            metrics,
            trade_stats: TradeStats::default(),
            skipped: vec![],
            final_cash: 900.0,
            realized_pnl: 0.0,
            unrealized_pnl: 0.0,
            commission_paid: 0.0,
        }
    }

    #[test]
    fn equity_curve_csv_has_header_and_rows() {
        let csv = equity_curve_csv(&sample_result().equity_curve).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,equity,cash");
        assert_eq!(lines[1], "2023-01-03,1000.000000,900.000000");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn trades_csv_includes_rejections() {
        let csv = trades_csv(&sample_result().trade_log).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert!(lines[0].starts_with("order_id,created_at,symbol,side"));
        assert_eq!(
            lines[1],
            "1,2023-01-03,AAPL,BUY,1.000000,FILLED,2023-01-03,100.000000,0.000000,"
        );
        assert!(lines[2].contains("REJECTED"));
        assert!(lines[2].contains("no position in AAPL to sell"));
    }

    #[test]
    fn round_trips_csv_reports_pnl() {
        let csv = round_trips_csv(&sample_result().closed_trades).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("AAPL,1.000000,2023-01-03,100.000000,2023-01-05"));
        assert!(lines[1].ends_with(",2,0.000000,10.000000"));
    }

    #[test]
    fn metrics_csv_lists_summary() {
        let csv = metrics_csv(&sample_result()).unwrap();
        assert!(csv.starts_with("metric,value\n"));
        assert!(csv.contains("final_equity,1010.000000\n"));
        assert!(csv.contains("total_return,0.01000000\n"));
        assert!(csv.contains("orders_filled,1\n"));
        assert!(csv.contains("orders_rejected,1\n"));
    }

    #[test]
    fn write_creates_all_files() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("nested").join("report");

        let written = CsvReportAdapter::new()
            .write(&sample_result(), &out)
            .unwrap();

        assert_eq!(written.len(), 4);
        for name in [EQUITY_CURVE_FILE, TRADES_FILE, ROUND_TRIPS_FILE, METRICS_FILE] {
            assert!(out.join(name).is_file(), "{name} missing");
        }
    }
}
