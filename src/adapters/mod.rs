//! Concrete adapter implementations for ports.

pub mod csv_bar_adapter;
pub mod csv_signal_adapter;
pub mod csv_report_adapter;
pub mod file_config_adapter;
