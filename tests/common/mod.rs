#![allow(dead_code)]

use chrono::NaiveDate;
use sigtrader::domain::backtest::BacktestConfig;
use sigtrader::domain::decision::{Decision, DecisionBook, DuplicatePolicy, Side};
use sigtrader::domain::error::SigtraderError;
pub use sigtrader::domain::ohlcv::OhlcvBar;
use sigtrader::ports::bar_port::BarPort;
use std::collections::HashMap;

pub struct MockBarPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockBarPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl BarPort for MockBarPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SigtraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(SigtraderError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, SigtraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SigtraderError> {
        match self.data.get(symbol) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn make_bar(symbol: &str, date: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        symbol: symbol.to_string(),
        date: parse_date(date),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000.0,
    }
}

pub fn decision(symbol: &str, date: &str, side: Side) -> Decision {
    Decision {
        date: parse_date(date),
        symbol: symbol.to_string(),
        alpha: match side {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
            Side::Hold => 0.0,
        },
        side,
    }
}

pub fn decisions(items: &[(&str, &str, Side)]) -> DecisionBook {
    DecisionBook::from_decisions(
        DuplicatePolicy::FirstWins,
        items.iter().map(|(s, d, side)| decision(s, d, *side)),
    )
}

pub fn sample_config(symbols: &[&str]) -> BacktestConfig {
    BacktestConfig {
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        start_date: date(2023, 1, 1),
        end_date: date(2023, 12, 31),
        starting_cash: 100_000.0,
        commission_rate: 0.001,
        stake_size: 1.0,
    }
}

pub fn generate_bars(symbol: &str, start_date: &str, closes: &[f64]) -> Vec<OhlcvBar> {
    let start = parse_date(start_date);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            symbol: symbol.to_string(),
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        })
        .collect()
}
