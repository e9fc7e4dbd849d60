//! sigtrader: signal-driven trade simulation engine.
//!
//! Hexagonal architecture: the simulation core lives in [`domain`], provider
//! traits in [`ports`], concrete CSV/INI implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
