//! Per-symbol holdings and completed round trips.

use chrono::NaiveDate;

/// Long-only holding. `quantity` is always strictly positive while the
/// position exists; a full close removes it from the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
    pub avg_cost: f64,
    pub entry_date: NaiveDate,
    pub entry_commission: f64,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity * (price - self.avg_cost)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub symbol: String,
    pub quantity: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub commission: f64,
    pub pnl: f64,
}

impl ClosedTrade {
    pub fn holding_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_position() -> Position {
        Position {
            symbol: "AAPL".into(),
            quantity: 10.0,
            avg_cost: 50.0,
            entry_date: NaiveDate::from_ymd_opt(2023, 1, 3).unwrap(),
            entry_commission: 0.5,
        }
    }

    #[test]
    fn market_value() {
        let pos = sample_position();
        assert!((pos.market_value(55.0) - 550.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unrealized_pnl_profit() {
        let pos = sample_position();
        assert!((pos.unrealized_pnl(55.0) - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unrealized_pnl_loss() {
        let pos = sample_position();
        assert!((pos.unrealized_pnl(45.0) - (-50.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn closed_trade_holding_days() {
        let trade = ClosedTrade {
            symbol: "AAPL".into(),
            quantity: 10.0,
            entry_price: 50.0,
            exit_price: 55.0,
            entry_date: NaiveDate::from_ymd_opt(2023, 1, 3).unwrap(),
            exit_date: NaiveDate::from_ymd_opt(2023, 1, 10).unwrap(),
            commission: 1.05,
            pnl: 48.95,
        };
        assert_eq!(trade.holding_days(), 7);
    }
}
