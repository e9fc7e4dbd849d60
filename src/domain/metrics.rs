//! Performance metrics computed from the equity curve.
//!
//! All functions are pure folds over the curve. Degenerate input (fewer
//! than two points, zero variance, non-positive equity) yields 0 rather than
//! NaN or an error.

use super::ledger::EquityPoint;
use super::position::ClosedTrade;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Metrics {
    pub total_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
}

impl Metrics {
    pub fn compute(equity_curve: &[EquityPoint]) -> Self {
        let values: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
        Self::from_values(&values)
    }

    pub fn from_values(equity: &[f64]) -> Self {
        if equity.len() < 2 {
            return Metrics::default();
        }

        let returns = period_returns(equity);
        let stddev = sample_stddev(&returns);
        let annualization = TRADING_DAYS_PER_YEAR.sqrt();

        let sharpe_ratio = if stddev == 0.0 {
            0.0
        } else {
            mean(&returns) / stddev * annualization
        };

        Metrics {
            total_return: total_return(equity),
            annualized_volatility: stddev * annualization,
            sharpe_ratio,
            max_drawdown: max_drawdown(equity),
        }
    }
}

/// r_t = E_t / E_{t-1} - 1
pub fn period_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

fn total_return(equity: &[f64]) -> f64 {
    match (equity.first(), equity.last()) {
        (Some(&first), Some(&last)) if first > 0.0 => last / first - 1.0,
        _ => 0.0,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample (n - 1) standard deviation; 0 with fewer than two observations.
fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// min_t(E_t / max(E_0..E_t) - 1). Never positive.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &value in equity {
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            let dd = value / peak - 1.0;
            if dd < worst {
                worst = dd;
            }
        }
    }
    worst
}

/// Round-trip statistics over closed trades.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TradeStats {
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_holding_days: f64,
}

impl TradeStats {
    pub fn compute(trades: &[ClosedTrade]) -> Self {
        let mut stats = TradeStats::default();
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut total_days = 0i64;

        for trade in trades {
            let pnl = trade.pnl;
            if pnl > 0.0 {
                stats.trades_won += 1;
                total_wins += pnl;
                stats.largest_win = stats.largest_win.max(pnl);
            } else if pnl < 0.0 {
                stats.trades_lost += 1;
                total_losses += pnl.abs();
                stats.largest_loss = stats.largest_loss.max(pnl.abs());
            } else {
                stats.trades_breakeven += 1;
            }
            total_days += trade.holding_days();
        }

        stats.total_trades = trades.len();
        if stats.total_trades > 0 {
            stats.win_rate = stats.trades_won as f64 / stats.total_trades as f64;
            stats.avg_holding_days = total_days as f64 / stats.total_trades as f64;
        }
        if stats.trades_won > 0 {
            stats.avg_win = total_wins / stats.trades_won as f64;
        }
        if stats.trades_lost > 0 {
            stats.avg_loss = total_losses / stats.trades_lost as f64;
        }
        stats
    }
}
