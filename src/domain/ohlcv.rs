//! OHLCV bar representation.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Reason a bar failed its shape checks.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BarError {
    #[error("{symbol} {date}: non-finite price")]
    NonFinite { symbol: String, date: NaiveDate },

    #[error("{symbol} {date}: non-positive close {close}")]
    NonPositiveClose {
        symbol: String,
        date: NaiveDate,
        close: f64,
    },

    #[error("{symbol} {date}: prices violate low <= open/close <= high")]
    InconsistentRange { symbol: String, date: NaiveDate },

    #[error("{symbol} {date}: negative volume {volume}")]
    NegativeVolume {
        symbol: String,
        date: NaiveDate,
        volume: f64,
    },
}

impl OhlcvBar {
    /// low <= min(open, close) <= max(open, close) <= high, volume >= 0.
    pub fn validate(&self) -> Result<(), BarError> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite()) || !self.volume.is_finite() {
            return Err(BarError::NonFinite {
                symbol: self.symbol.clone(),
                date: self.date,
            });
        }
        if self.close <= 0.0 {
            return Err(BarError::NonPositiveClose {
                symbol: self.symbol.clone(),
                date: self.date,
                close: self.close,
            });
        }
        let body_low = self.open.min(self.close);
        let body_high = self.open.max(self.close);
        if self.low > body_low || body_high > self.high {
            return Err(BarError::InconsistentRange {
                symbol: self.symbol.clone(),
                date: self.date,
            });
        }
        if self.volume < 0.0 {
            return Err(BarError::NegativeVolume {
                symbol: self.symbol.clone(),
                date: self.date,
                volume: self.volume,
            });
        }
        Ok(())
    }
}
