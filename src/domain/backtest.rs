//! Simulation driver: replays bars date by date, routes decisions through
//! the order policy and fill model, and records the equity curve.
//!
//! Dates are processed strictly in ascending order and, within a date,
//! symbols in lexical order. A failed run returns no partial result.

use chrono::NaiveDate;

use super::decision::Side;
use super::error::SigtraderError;
use super::execution::{execute_order, Execution, ExecutionConfig};
use super::ledger::{EquityPoint, Ledger};
use super::metrics::{Metrics, TradeStats};
use super::order::{order_for_decision, Order, OrderId, OrderState};
use super::position::ClosedTrade;
use super::symbol_data::{build_unified_timeline, SymbolData};
use super::universe::{SkipReason, SkippedSymbol};
use crate::ports::bar_port::BarPort;
use crate::ports::signal_port::SignalPort;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub symbols: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub starting_cash: f64,
    pub commission_rate: f64,
    pub stake_size: f64,
}

impl BacktestConfig {
    /// Reject configurations that cannot describe a run.
    pub fn validate(&self) -> Result<(), SigtraderError> {
        if self.symbols.is_empty() {
            return Err(SigtraderError::ConfigMissing {
                section: "backtest".into(),
                key: "symbols".into(),
            });
        }
        if self.symbols.iter().any(|s| s.trim().is_empty()) {
            return Err(SigtraderError::config_invalid(
                "backtest",
                "symbols",
                "symbol names must not be empty",
            ));
        }
        let mut sorted = self.symbols.clone();
        sorted.sort();
        if let Some(w) = sorted.windows(2).find(|w| w[0] == w[1]) {
            return Err(SigtraderError::config_invalid(
                "backtest",
                "symbols",
                format!("duplicate symbol {}", w[0]),
            ));
        }
        if self.start_date > self.end_date {
            return Err(SigtraderError::config_invalid(
                "backtest",
                "start_date",
                format!(
                    "start_date {} is after end_date {}",
                    self.start_date, self.end_date
                ),
            ));
        }
        if !self.starting_cash.is_finite() || self.starting_cash <= 0.0 {
            return Err(SigtraderError::config_invalid(
                "backtest",
                "starting_cash",
                "starting_cash must be positive",
            ));
        }
        if !self.commission_rate.is_finite() || self.commission_rate < 0.0 {
            return Err(SigtraderError::config_invalid(
                "backtest",
                "commission_rate",
                "commission_rate must be non-negative",
            ));
        }
        if !self.stake_size.is_finite() || self.stake_size <= 0.0 {
            return Err(SigtraderError::config_invalid(
                "backtest",
                "stake_size",
                "stake_size must be positive",
            ));
        }
        Ok(())
    }

    pub fn execution(&self) -> ExecutionConfig {
        ExecutionConfig {
            commission_rate: self.commission_rate,
            stake_size: self.stake_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub config: BacktestConfig,
    pub equity_curve: Vec<EquityPoint>,
    /// Every order in creation order, each in a terminal state.
    pub trade_log: Vec<Order>,
    pub closed_trades: Vec<ClosedTrade>,
    pub metrics: Metrics,
    pub trade_stats: TradeStats,
    pub skipped: Vec<SkippedSymbol>,
    pub final_cash: f64,
    pub realized_pnl: f64,
    /// PnL of positions still open at the last date, marked at their last close.
    pub unrealized_pnl: f64,
    pub commission_paid: f64,
}

impl BacktestResult {
    /// Outcome of a run whose date range holds no bars at all.
    pub fn empty(config: BacktestConfig, skipped: Vec<SkippedSymbol>) -> Self {
        let final_cash = config.starting_cash;
        BacktestResult {
            config,
            equity_curve: Vec::new(),
            trade_log: Vec::new(),
            closed_trades: Vec::new(),
            metrics: Metrics::default(),
            trade_stats: TradeStats::default(),
            skipped,
            final_cash,
            realized_pnl: 0.0,
            unrealized_pnl: 0.0,
            commission_paid: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.equity_curve.is_empty()
    }

    pub fn starting_equity(&self) -> f64 {
        self.config.starting_cash
    }

    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map_or(self.config.starting_cash, |p| p.equity)
    }

    pub fn count_in_state(&self, state: OrderState) -> usize {
        self.trade_log.iter().filter(|o| o.state == state).count()
    }
}

/// One simulation run over injected bar and decision providers.
pub struct Simulation<'a> {
    config: BacktestConfig,
    bars: &'a dyn BarPort,
    signals: &'a dyn SignalPort,
}

impl<'a> Simulation<'a> {
    pub fn new(
        config: BacktestConfig,
        bars: &'a dyn BarPort,
        signals: &'a dyn SignalPort,
    ) -> Result<Self, SigtraderError> {
        config.validate()?;
        Ok(Simulation {
            config,
            bars,
            signals,
        })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Load every symbol's series for the configured range, in lexical
    /// symbol order, splitting out the ones with no bars.
    fn load_series(&self) -> Result<(Vec<SymbolData>, Vec<SkippedSymbol>), SigtraderError> {
        let mut symbols = self.config.symbols.clone();
        symbols.sort();

        let (start, end) = (self.config.start_date, self.config.end_date);
        let mut series = Vec::with_capacity(symbols.len());
        let mut skipped = Vec::new();

        for symbol in symbols {
            let bars: Vec<_> = self
                .bars
                .fetch_bars(&symbol, start, end)?
                .into_iter()
                .filter(|b| b.date >= start && b.date <= end)
                .collect();
            let data = SymbolData::new(symbol, bars)?;
            if data.is_empty() {
                tracing::info!(symbol = %data.symbol, "no bars in date range, skipping");
                skipped.push(SkippedSymbol {
                    symbol: data.symbol,
                    reason: SkipReason::NoData,
                });
                continue;
            }
            tracing::debug!(symbol = %data.symbol, bars = data.bar_count(), "loaded series");
            series.push(data);
        }
        Ok((series, skipped))
    }

    pub fn run(&self) -> Result<BacktestResult, SigtraderError> {
        let _span = tracing::info_span!(
            "backtest",
            start = %self.config.start_date,
            end = %self.config.end_date
        )
        .entered();

        let (series, skipped) = self.load_series()?;
        let timeline = build_unified_timeline(&series);
        if timeline.is_empty() {
            tracing::info!("no bars for any symbol in range, nothing to simulate");
            return Ok(BacktestResult::empty(self.config.clone(), skipped));
        }

        tracing::info!(
            symbols = series.len(),
            dates = timeline.len(),
            starting_cash = self.config.starting_cash,
            "starting simulation"
        );

        let execution = self.config.execution();
        let mut ledger = Ledger::new(self.config.starting_cash);
        let mut trade_log: Vec<Order> = Vec::new();
        let mut closed_trades = Vec::new();
        let mut equity_curve = Vec::with_capacity(timeline.len());
        let mut next_id = 1u64;

        for &date in &timeline {
            for data in &series {
                let Some(bar) = data.get_bar(date) else {
                    continue;
                };
                ledger.record_close(&data.symbol, bar.close);

                let decision = self.signals.fetch_decision(&data.symbol, date);
                let side = decision.as_ref().map_or(Side::Hold, |d| d.side);
                let Some(intent) =
                    order_for_decision(side, ledger.quantity(&data.symbol), execution.stake_size)
                else {
                    continue;
                };

                let mut order = Order::new(
                    OrderId(next_id),
                    data.symbol.clone(),
                    intent.side,
                    intent.quantity,
                    date,
                );
                next_id += 1;
                tracing::debug!(
                    order_id = %order.id,
                    symbol = %order.symbol,
                    side = %order.side,
                    quantity = order.quantity,
                    alpha = decision.as_ref().map_or(0.0, |d| d.alpha),
                    date = %date,
                    "order created"
                );

                if let Execution::Filled(report) =
                    execute_order(&mut ledger, &mut order, bar, &execution)?
                {
                    closed_trades.extend(report.closed_trade);
                }
                trade_log.push(order);
            }
            equity_curve.push(ledger.equity_point(date));
        }

        let canceled = cancel_open_orders(&mut trade_log)?;
        if canceled > 0 {
            tracing::warn!(canceled, "canceled orders left open at end of run");
        }

        let metrics = Metrics::compute(&equity_curve);
        let trade_stats = TradeStats::compute(&closed_trades);
        let result = BacktestResult {
            config: self.config.clone(),
            equity_curve,
            trade_log,
            closed_trades,
            metrics,
            trade_stats,
            skipped,
            final_cash: ledger.cash(),
            realized_pnl: ledger.realized_pnl(),
            unrealized_pnl: ledger.unrealized_pnl(),
            commission_paid: ledger.commission_paid(),
        };

        tracing::info!(
            final_equity = result.final_equity(),
            orders = result.trade_log.len(),
            filled = result.count_in_state(OrderState::Filled),
            rejected = result.count_in_state(OrderState::Rejected),
            "simulation complete"
        );
        Ok(result)
    }
}

/// Move every non-terminal order to `Canceled`, returning how many moved.
pub fn cancel_open_orders(orders: &mut [Order]) -> Result<usize, SigtraderError> {
    let mut canceled = 0;
    for order in orders.iter_mut().filter(|o| !o.is_terminal()) {
        if order.state == OrderState::Created {
            order.submit()?;
        }
        order.cancel()?;
        canceled += 1;
    }
    Ok(canceled)
}
