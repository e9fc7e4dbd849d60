//! Order lifecycle: `Created -> Submitted -> {Filled | Rejected | Canceled}`.
//!
//! Terminal orders are immutable; every transition out of a terminal state,
//! and every skipped step, is an [`OrderError::InvalidTransition`].

use chrono::NaiveDate;
use std::fmt;

use super::decision::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => f.write_str("BUY"),
            OrderSide::Sell => f.write_str("SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    Created,
    Submitted,
    Filled,
    Rejected,
    /// Reserved for partial-fill/timeout handling; same-bar fills never leave
    /// an order open long enough to reach it.
    Canceled,
}

impl OrderState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderState::Filled | OrderState::Rejected | OrderState::Canceled
        )
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderState::Created => "CREATED",
            OrderState::Submitted => "SUBMITTED",
            OrderState::Filled => "FILLED",
            OrderState::Rejected => "REJECTED",
            OrderState::Canceled => "CANCELED",
        };
        f.write_str(s)
    }
}

/// Expected, local reasons an order does not execute.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RejectReason {
    #[error("insufficient funds: need {required:.2}, have {available:.2}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("no position in {symbol} to sell")]
    NoPosition { symbol: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("order {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: OrderId,
        from: OrderState,
        to: OrderState,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub state: OrderState,
    pub created_at: NaiveDate,
    pub filled_price: Option<f64>,
    pub filled_at: Option<NaiveDate>,
    pub commission: Option<f64>,
    pub reject_reason: Option<RejectReason>,
}

impl Order {
    pub fn new(
        id: OrderId,
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: f64,
        created_at: NaiveDate,
    ) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            side,
            quantity,
            state: OrderState::Created,
            created_at,
            filled_price: None,
            filled_at: None,
            commission: None,
            reject_reason: None,
        }
    }

    fn transition(&mut self, from: OrderState, to: OrderState) -> Result<(), OrderError> {
        if self.state != from {
            return Err(OrderError::InvalidTransition {
                id: self.id,
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Created -> Submitted
    pub fn submit(&mut self) -> Result<(), OrderError> {
        self.transition(OrderState::Created, OrderState::Submitted)
    }

    /// Submitted -> Filled
    pub fn fill(&mut self, price: f64, commission: f64, date: NaiveDate) -> Result<(), OrderError> {
        self.transition(OrderState::Submitted, OrderState::Filled)?;
        self.filled_price = Some(price);
        self.filled_at = Some(date);
        self.commission = Some(commission);
        Ok(())
    }

    /// Submitted -> Rejected
    pub fn reject(&mut self, reason: RejectReason) -> Result<(), OrderError> {
        self.transition(OrderState::Submitted, OrderState::Rejected)?;
        self.reject_reason = Some(reason);
        Ok(())
    }

    /// Submitted -> Canceled
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        self.transition(OrderState::Submitted, OrderState::Canceled)
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn notional(&self) -> Option<f64> {
        self.filled_price.map(|p| p * self.quantity)
    }
}

/// What the long/flat policy wants to do for one symbol on one date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderIntent {
    pub side: OrderSide,
    pub quantity: f64,
}

/// Long/flat order generation.
///
/// BUY while flat opens `stake_size`; SELL while long closes the whole
/// holding. Everything else (HOLD, BUY while long, SELL while flat) is a no-op.
pub fn order_for_decision(side: Side, held_quantity: f64, stake_size: f64) -> Option<OrderIntent> {
    match side {
        Side::Buy if held_quantity == 0.0 => Some(OrderIntent {
            side: OrderSide::Buy,
            quantity: stake_size,
        }),
        Side::Sell if held_quantity > 0.0 => Some(OrderIntent {
            side: OrderSide::Sell,
            quantity: held_quantity,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 3).unwrap()
    }

    fn new_order() -> Order {
        Order::new(OrderId(1), "AAPL", OrderSide::Buy, 1.0, date())
    }

    #[test]
    fn new_order_is_created() {
        let order = new_order();
        assert_eq!(order.state, OrderState::Created);
        assert!(!order.is_terminal());
        assert!(order.filled_price.is_none());
        assert!(order.notional().is_none());
    }

    #[test]
    fn submit_then_fill() {
        let mut order = new_order();
        order.submit().unwrap();
        assert_eq!(order.state, OrderState::Submitted);
        order.fill(100.0, 0.1, date()).unwrap();
        assert_eq!(order.state, OrderState::Filled);
        assert_eq!(order.filled_price, Some(100.0));
        assert_eq!(order.filled_at, Some(date()));
        assert_eq!(order.commission, Some(0.1));
        assert_eq!(order.notional(), Some(100.0));
        assert!(order.is_terminal());
    }

    #[test]
    fn submit_then_reject_records_reason() {
        let mut order = new_order();
        order.submit().unwrap();
        let reason = RejectReason::InsufficientFunds {
            required: 100.1,
            available: 50.0,
        };
        order.reject(reason.clone()).unwrap();
        assert_eq!(order.state, OrderState::Rejected);
        assert_eq!(order.reject_reason, Some(reason));
    }

    #[test]
    fn submit_then_cancel() {
        let mut order = new_order();
        order.submit().unwrap();
        order.cancel().unwrap();
        assert_eq!(order.state, OrderState::Canceled);
        assert!(order.is_terminal());
    }

    #[test]
    fn cannot_fill_before_submit() {
        let mut order = new_order();
        let err = order.fill(100.0, 0.0, date()).unwrap_err();
        assert_eq!(
            err,
            OrderError::InvalidTransition {
                id: OrderId(1),
                from: OrderState::Created,
                to: OrderState::Filled,
            }
        );
        assert_eq!(order.state, OrderState::Created);
        assert!(order.filled_price.is_none());
    }

    #[test]
    fn cannot_resubmit() {
        let mut order = new_order();
        order.submit().unwrap();
        assert!(order.submit().is_err());
    }

    #[test]
    fn terminal_orders_are_immutable() {
        let mut order = new_order();
        order.submit().unwrap();
        order.fill(100.0, 0.0, date()).unwrap();
        let snapshot = order.clone();

        assert!(order.fill(120.0, 0.0, date()).is_err());
        assert!(order.cancel().is_err());
        assert!(order
            .reject(RejectReason::NoPosition {
                symbol: "AAPL".into()
            })
            .is_err());
        assert_eq!(order, snapshot);
    }

    #[test]
    fn transition_error_display() {
        let err = OrderError::InvalidTransition {
            id: OrderId(7),
            from: OrderState::Filled,
            to: OrderState::Canceled,
        };
        assert_eq!(err.to_string(), "order #7 cannot move from FILLED to CANCELED");
    }

    #[test]
    fn policy_buy_when_flat() {
        assert_eq!(
            order_for_decision(Side::Buy, 0.0, 5.0),
            Some(OrderIntent {
                side: OrderSide::Buy,
                quantity: 5.0
            })
        );
    }

    #[test]
    fn policy_buy_when_long_is_noop() {
        assert_eq!(order_for_decision(Side::Buy, 1.0, 5.0), None);
    }

    #[test]
    fn policy_sell_closes_whole_position() {
        assert_eq!(
            order_for_decision(Side::Sell, 3.0, 1.0),
            Some(OrderIntent {
                side: OrderSide::Sell,
                quantity: 3.0
            })
        );
    }

    #[test]
    fn policy_sell_when_flat_is_noop() {
        assert_eq!(order_for_decision(Side::Sell, 0.0, 1.0), None);
    }

    #[test]
    fn policy_hold_is_noop() {
        assert_eq!(order_for_decision(Side::Hold, 0.0, 1.0), None);
        assert_eq!(order_for_decision(Side::Hold, 2.0, 1.0), None);
    }
}
