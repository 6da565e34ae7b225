//! Port traits consumed by the domain.

pub mod config_port;
pub mod trade_port;
pub mod market_port;
