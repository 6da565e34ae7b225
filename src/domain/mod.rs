//! Core domain types and logic.

pub mod trade;
pub mod market_key;
pub mod field_timing;
pub mod daily;
pub mod intraday;
pub mod lag_join;
pub mod enrich;
pub mod segmentation;
pub mod filters;
pub mod orb;
pub mod error;
