//! Trading decisions produced upstream and consumed by the simulation.
//!
//! Side strings are parsed into [`Side`] at the provider boundary; nothing
//! inside the core ever looks at free-form text.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::ports::signal_port::SignalPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
            Side::Hold => "HOLD",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown side {0:?} (expected BUY, SELL or HOLD)")]
pub struct UnknownSide(pub String);

impl FromStr for Side {
    type Err = UnknownSide;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            "HOLD" => Ok(Side::Hold),
            _ => Err(UnknownSide(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub date: NaiveDate,
    pub symbol: String,
    pub alpha: f64,
    pub side: Side,
}

/// Tie-break applied when more than one decision exists for a (symbol, date).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Keep the first decision encountered.
    #[default]
    FirstWins,
    /// Keep the decision with the largest |alpha|; earlier wins on ties.
    MaxAbsAlpha,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "first_wins" => Ok(DuplicatePolicy::FirstWins),
            "max_abs_alpha" => Ok(DuplicatePolicy::MaxAbsAlpha),
            other => Err(format!(
                "unknown duplicate policy {other:?} (expected first or max_abs_alpha)"
            )),
        }
    }
}

/// In-memory `(symbol, date) -> Decision` lookup, materialized before a run.
#[derive(Debug, Clone, Default)]
pub struct DecisionBook {
    policy: DuplicatePolicy,
    decisions: HashMap<(String, NaiveDate), Decision>,
    duplicates_ignored: usize,
}

impl DecisionBook {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            decisions: HashMap::new(),
            duplicates_ignored: 0,
        }
    }

    pub fn from_decisions<I>(policy: DuplicatePolicy, decisions: I) -> Self
    where
        I: IntoIterator<Item = Decision>,
    {
        let mut book = Self::new(policy);
        for decision in decisions {
            book.insert(decision);
        }
        book
    }

    /// Insert a decision, resolving a collision with the configured policy.
    /// Returns `true` if the decision is now the one stored for its key.
    pub fn insert(&mut self, decision: Decision) -> bool {
        let key = (decision.symbol.clone(), decision.date);
        match self.decisions.get_mut(&key) {
            None => {
                self.decisions.insert(key, decision);
                true
            }
            Some(existing) => {
                self.duplicates_ignored += 1;
                let replace = match self.policy {
                    DuplicatePolicy::FirstWins => false,
                    DuplicatePolicy::MaxAbsAlpha => decision.alpha.abs() > existing.alpha.abs(),
                };
                tracing::debug!(
                    symbol = %decision.symbol,
                    date = %decision.date,
                    replaced = replace,
                    "duplicate decision"
                );
                if replace {
                    *existing = decision;
                }
                replace
            }
        }
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    pub fn duplicates_ignored(&self) -> usize {
        self.duplicates_ignored
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }
}

impl SignalPort for DecisionBook {
    fn fetch_decision(&self, symbol: &str, date: NaiveDate) -> Option<Decision> {
        self.decisions.get(&(symbol.to_string(), date)).cloned()
    }
}
