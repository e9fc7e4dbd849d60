//! Core domain types and simulation logic.

pub mod ohlcv;
pub mod decision;
pub mod position;
pub mod order;
pub mod ledger;
pub mod execution;
pub mod symbol_data;
pub mod universe;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod error;
