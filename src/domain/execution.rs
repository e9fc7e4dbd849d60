//! Fill and cost model.
//!
//! Market orders fill at the close of the bar that produced the decision,
//! for the full quantity, with a proportional commission charged on both
//! sides. No slippage, no partial fills.

use super::ledger::{FillReport, Ledger};
use super::ohlcv::OhlcvBar;
use super::order::{Order, OrderError, OrderState};

pub const DEFAULT_COMMISSION_RATE: f64 = 0.001;
pub const DEFAULT_STAKE_SIZE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionConfig {
    pub commission_rate: f64,
    pub stake_size: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            commission_rate: DEFAULT_COMMISSION_RATE,
            stake_size: DEFAULT_STAKE_SIZE,
        }
    }
}

/// commission = notional * rate
pub fn calculate_commission(notional: f64, commission_rate: f64) -> f64 {
    notional * commission_rate
}

/// Execution price for an order created on `bar`'s date.
///
/// This is the close of that same bar. The decision for date D is assumed to
/// be computed from data available by D, yet it executes at D's own close:
/// a known look-ahead bias.
pub fn fill_price(bar: &OhlcvBar) -> f64 {
    bar.close
}

/// Outcome of routing one order through the fill model.
#[derive(Debug, Clone, PartialEq)]
pub enum Execution {
    Filled(FillReport),
    Rejected,
}

/// Submit `order` and execute it against `bar`, moving it to a terminal
/// state. The ledger is only mutated when the order ends `Filled`.
pub fn execute_order(
    ledger: &mut Ledger,
    order: &mut Order,
    bar: &OhlcvBar,
    config: &ExecutionConfig,
) -> Result<Execution, OrderError> {
    if order.state == OrderState::Created {
        order.submit()?;
    }
    if order.state != OrderState::Submitted {
        return Err(OrderError::InvalidTransition {
            id: order.id,
            from: order.state,
            to: OrderState::Filled,
        });
    }

    let price = fill_price(bar);
    let commission = calculate_commission(price * order.quantity, config.commission_rate);

    match ledger.apply_fill(order, price, commission, bar.date) {
        Ok(report) => {
            order.fill(price, commission, bar.date)?;
            tracing::debug!(
                order_id = %order.id,
                symbol = %order.symbol,
                side = %order.side,
                quantity = order.quantity,
                price,
                commission,
                cash = report.cash_after,
                "order filled"
            );
            Ok(Execution::Filled(report))
        }
        Err(reason) => {
            tracing::warn!(
                order_id = %order.id,
                symbol = %order.symbol,
                side = %order.side,
                date = %bar.date,
                reason = %reason,
                "order rejected"
            );
            order.reject(reason)?;
            Ok(Execution::Rejected)
        }
    }
}
