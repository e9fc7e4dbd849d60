//! Port traits: the seams between the simulation core and the outside world.

pub mod bar_port;
pub mod signal_port;
pub mod config_port;
pub mod report_port;
