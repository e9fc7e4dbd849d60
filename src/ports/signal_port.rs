//! Decision provider port.

use crate::domain::decision::Decision;
use chrono::NaiveDate;

pub trait SignalPort {
    /// The decision for `(symbol, date)`. `None` is treated as HOLD.
    fn fetch_decision(&self, symbol: &str, date: NaiveDate) -> Option<Decision>;
}
