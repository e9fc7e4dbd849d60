//! CSV decision adapter: reads `date,symbol,alpha,side` rows into a
//! [`DecisionBook`].

use crate::domain::decision::{Decision, DecisionBook, DuplicatePolicy, Side};
use crate::domain::error::SigtraderError;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvSignalAdapter {
    path: PathBuf,
    policy: DuplicatePolicy,
}

impl CsvSignalAdapter {
    pub fn new(path: PathBuf, policy: DuplicatePolicy) -> Self {
        Self { path, policy }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the whole file. Symbols are upper-cased to match the bar files.
    pub fn load(&self) -> Result<DecisionBook, SigtraderError> {
        let content = fs::read_to_string(&self.path).map_err(|e| SigtraderError::Signal {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut book = DecisionBook::new(self.policy);

        for result in rdr.records() {
            let record = result.map_err(|e| self.error(0, format!("CSV parse error: {e}")))?;
            let line = record.position().map_or(0, |p| p.line());
            let get = |idx: usize, name: &str| {
                record
                    .get(idx)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| self.error(line, format!("missing {name} column")))
            };

            let date = NaiveDate::parse_from_str(&get(0, "date")?, "%Y-%m-%d")
                .map_err(|e| self.error(line, format!("invalid date format: {e}")))?;
            let symbol = get(1, "symbol")?.to_uppercase();
            let alpha: f64 = get(2, "alpha")?
                .parse()
                .map_err(|e| self.error(line, format!("invalid alpha value: {e}")))?;
            if !alpha.is_finite() {
                return Err(self.error(line, "alpha must be finite"));
            }
            let side: Side = get(3, "side")?
                .parse()
                .map_err(|e| self.error(line, e))?;

            book.insert(Decision {
                date,
                symbol,
                alpha,
                side,
            });
        }

        tracing::info!(
            path = %self.path.display(),
            decisions = book.len(),
            duplicates_ignored = book.duplicates_ignored(),
            policy = ?book.policy(),
            "loaded decisions"
        );
        Ok(book)
    }

    fn error(&self, line: u64, reason: impl std::fmt::Display) -> SigtraderError {
        SigtraderError::Signal {
            reason: format!("{}:{}: {}", self.path.display(), line, reason),
        }
    }
}
