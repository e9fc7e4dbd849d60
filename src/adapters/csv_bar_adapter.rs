//! CSV bar data adapter: one `<SYMBOL>.csv` file per symbol.

use crate::domain::error::SigtraderError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::bar_port::BarPort;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvBarAdapter {
    base_path: PathBuf,
}

impl CsvBarAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }

    /// Every bar in the symbol's file, sorted by date. A missing file is an
    /// empty series.
    fn read_all(&self, symbol: &str) -> Result<Vec<OhlcvBar>, SigtraderError> {
        let path = self.csv_path(symbol);
        if !path.exists() {
            tracing::debug!(symbol, path = %path.display(), "no bar file");
            return Ok(Vec::new());
        }
        let mut bars = read_bars(&path, symbol)?;
        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

fn data_error(path: &Path, line: u64, reason: impl std::fmt::Display) -> SigtraderError {
    SigtraderError::Data {
        reason: format!("{}:{}: {}", path.display(), line, reason),
    }
}

fn field<'r>(
    record: &'r csv::StringRecord,
    idx: usize,
    name: &str,
    path: &Path,
    line: u64,
) -> Result<&'r str, SigtraderError> {
    record
        .get(idx)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| data_error(path, line, format!("missing {name} column")))
}

fn read_bars(path: &Path, symbol: &str) -> Result<Vec<OhlcvBar>, SigtraderError> {
    let content = fs::read_to_string(path).map_err(|e| SigtraderError::Data {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut bars = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| SigtraderError::Data {
            reason: format!("{}: CSV parse error: {}", path.display(), e),
        })?;
        let line = record.position().map_or(0, |p| p.line());

        let date = NaiveDate::parse_from_str(field(&record, 0, "date", path, line)?, "%Y-%m-%d")
            .map_err(|e| data_error(path, line, format!("invalid date format: {e}")))?;
        let number = |idx: usize, name: &str| -> Result<f64, SigtraderError> {
            field(&record, idx, name, path, line)?
                .parse::<f64>()
                .map_err(|e| data_error(path, line, format!("invalid {name} value: {e}")))
        };

        let bar = OhlcvBar {
            symbol: symbol.to_string(),
            date,
            open: number(1, "open")?,
            high: number(2, "high")?,
            low: number(3, "low")?,
            close: number(4, "close")?,
            volume: number(5, "volume")?,
        };
        bar.validate().map_err(|e| data_error(path, line, e))?;
        bars.push(bar);
    }

    Ok(bars)
}

impl BarPort for CsvBarAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SigtraderError> {
        let bars = self
            .read_all(symbol)?
            .into_iter()
            .filter(|b| b.date >= start_date && b.date <= end_date)
            .collect();
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, SigtraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| SigtraderError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                symbols.push(stem.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SigtraderError> {
        let bars = self.read_all(symbol)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}
