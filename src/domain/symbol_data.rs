//! Per-symbol bar series and the unified simulation timeline.

use crate::domain::error::SigtraderError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone)]
pub struct SymbolData {
    pub symbol: String,
    pub bars: Vec<OhlcvBar>,
    pub date_index: HashMap<NaiveDate, usize>,
}

impl SymbolData {
    /// Wrap a provider series, enforcing the provider contract: every bar
    /// belongs to `symbol`, passes its shape checks, and dates are strictly
    /// ascending.
    pub fn new(symbol: String, bars: Vec<OhlcvBar>) -> Result<Self, SigtraderError> {
        for bar in &bars {
            if bar.symbol != symbol {
                return Err(SigtraderError::Data {
                    reason: format!(
                        "bar for {} on {} returned in series for {}",
                        bar.symbol, bar.date, symbol
                    ),
                });
            }
            bar.validate().map_err(|e| SigtraderError::Data {
                reason: e.to_string(),
            })?;
        }
        if let Some(w) = bars.windows(2).find(|w| w[0].date >= w[1].date) {
            return Err(SigtraderError::Data {
                reason: format!(
                    "{} series not strictly ascending: {} followed by {}",
                    symbol, w[0].date, w[1].date
                ),
            });
        }

        let date_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date, i))
            .collect();
        Ok(Self {
            symbol,
            bars,
            date_index,
        })
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get_bar(&self, date: NaiveDate) -> Option<&OhlcvBar> {
        self.date_index.get(&date).map(|&i| &self.bars[i])
    }
}

/// Sorted union of every date on which any symbol has a bar.
pub fn build_unified_timeline(symbols: &[SymbolData]) -> Vec<NaiveDate> {
    let unique_dates: BTreeSet<NaiveDate> = symbols
        .iter()
        .flat_map(|sd| sd.bars.iter().map(|bar| bar.date))
        .collect();
    unique_dates.into_iter().collect()
}
