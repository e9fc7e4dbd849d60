//! Cash/position ledger and equity tracking.
//!
//! `apply_fill` is the only mutator of cash and positions. It checks every
//! precondition before touching state, so a fill either applies completely
//! or is rejected with the ledger unchanged.
//!
//! Positions and prices are kept in `BTreeMap`s: equity sums are taken in
//! symbol order, which keeps repeated runs bit-identical.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::order::{Order, OrderSide, RejectReason};
use super::position::{ClosedTrade, Position};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
    pub cash: f64,
}

/// Cash movement produced by one applied fill.
#[derive(Debug, Clone, PartialEq)]
pub struct FillReport {
    pub cash_before: f64,
    pub cash_after: f64,
    pub notional: f64,
    pub commission: f64,
    pub closed_trade: Option<ClosedTrade>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    cash: f64,
    positions: BTreeMap<String, Position>,
    last_close: BTreeMap<String, f64>,
    realized_pnl: f64,
    commission_paid: f64,
}

impl Ledger {
    pub fn new(starting_cash: f64) -> Self {
        Ledger {
            cash: starting_cash,
            positions: BTreeMap::new(),
            last_close: BTreeMap::new(),
            realized_pnl: 0.0,
            commission_paid: 0.0,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    pub fn commission_paid(&self) -> f64 {
        self.commission_paid
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Held quantity, 0 when flat.
    pub fn quantity(&self, symbol: &str) -> f64 {
        self.positions.get(symbol).map_or(0.0, |p| p.quantity)
    }

    pub fn last_close(&self, symbol: &str) -> Option<f64> {
        self.last_close.get(symbol).copied()
    }

    /// Remember the latest close for a symbol. Prices carry forward across
    /// dates on which the symbol has no bar.
    pub fn record_close(&mut self, symbol: &str, close: f64) {
        self.last_close.insert(symbol.to_string(), close);
    }

    /// Apply a fill for `order` at `price`, charging `commission`.
    ///
    /// BUY debits `notional + commission` and opens (or averages into) the
    /// position; it is rejected with `InsufficientFunds` if cash would go
    /// negative. SELL credits `notional - commission` and reduces the holding
    /// by the order quantity, dropping the position once it reaches zero; it
    /// is rejected with `NoPosition` when flat or when the order asks for
    /// more than is held. The closed trade carries the sold quantity and its
    /// pro-rata share of the entry commission.
    pub fn apply_fill(
        &mut self,
        order: &Order,
        price: f64,
        commission: f64,
        date: NaiveDate,
    ) -> Result<FillReport, RejectReason> {
        let notional = price * order.quantity;
        let cash_before = self.cash;

        match order.side {
            OrderSide::Buy => {
                let required = notional + commission;
                let cash_after = cash_before - required;
                if cash_after < 0.0 {
                    return Err(RejectReason::InsufficientFunds {
                        required,
                        available: cash_before,
                    });
                }

                self.cash = cash_after;
                self.commission_paid += commission;
                self.positions
                    .entry(order.symbol.clone())
                    .and_modify(|pos| {
                        let total_qty = pos.quantity + order.quantity;
                        pos.avg_cost = (pos.avg_cost * pos.quantity + notional) / total_qty;
                        pos.quantity = total_qty;
                        pos.entry_commission += commission;
                    })
                    .or_insert_with(|| Position {
                        symbol: order.symbol.clone(),
                        quantity: order.quantity,
                        avg_cost: price,
                        entry_date: date,
                        entry_commission: commission,
                    });

                Ok(FillReport {
                    cash_before,
                    cash_after,
                    notional,
                    commission,
                    closed_trade: None,
                })
            }
            OrderSide::Sell => {
                let held = self.quantity(&order.symbol);
                if held <= 0.0 || order.quantity > held {
                    return Err(RejectReason::NoPosition {
                        symbol: order.symbol.clone(),
                    });
                }
                let Some(position) = self.positions.get_mut(&order.symbol) else {
                    return Err(RejectReason::NoPosition {
                        symbol: order.symbol.clone(),
                    });
                };

                let entry_commission = position.entry_commission * (order.quantity / held);
                let pnl = order.quantity * (price - position.avg_cost) - entry_commission - commission;
                let trade = ClosedTrade {
                    symbol: position.symbol.clone(),
                    quantity: order.quantity,
                    entry_price: position.avg_cost,
                    exit_price: price,
                    entry_date: position.entry_date,
                    exit_date: date,
                    commission: entry_commission + commission,
                    pnl,
                };

                position.quantity -= order.quantity;
                position.entry_commission -= entry_commission;
                if position.quantity <= 0.0 {
                    self.positions.remove(&order.symbol);
                }

                let cash_after = cash_before + (notional - commission);
                self.cash = cash_after;
                self.commission_paid += commission;
                self.realized_pnl += pnl;

                Ok(FillReport {
                    cash_before,
                    cash_after,
                    notional,
                    commission,
                    closed_trade: Some(trade),
                })
            }
        }
    }

    /// Cash plus every holding valued at its last known close.
    pub fn equity(&self) -> f64 {
        self.cash + self.holdings_value(None)
    }

    /// Open-position PnL at last known closes, entry commission excluded.
    pub fn unrealized_pnl(&self) -> f64 {
        self.positions()
            .map(|pos| {
                let price = self.last_close(&pos.symbol).unwrap_or(pos.avg_cost);
                pos.unrealized_pnl(price)
            })
            .sum()
    }

    /// Equity with `symbol` valued at `price` and every other holding at its
    /// last known close. Does not mutate the ledger.
    pub fn mark_to_market(&self, symbol: &str, price: f64) -> f64 {
        self.cash + self.holdings_value(Some((symbol, price)))
    }

    fn holdings_value(&self, overridden: Option<(&str, f64)>) -> f64 {
        self.positions
            .values()
            .map(|pos| {
                let price = match overridden {
                    Some((symbol, price)) if symbol == pos.symbol => Some(price),
                    _ => self.last_close.get(&pos.symbol).copied(),
                };
                // A position can only be opened on a bar, so its close is
                // always known; fall back to cost to stay total.
                pos.market_value(price.unwrap_or(pos.avg_cost))
            })
            .sum()
    }

    pub fn equity_point(&self, date: NaiveDate) -> EquityPoint {
        EquityPoint {
            date,
            equity: self.equity(),
            cash: self.cash,
        }
    }
}
