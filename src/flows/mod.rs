//! Pipeline definitions.
//!
//! Two pipelines ship with this crate: `generate_random`, a toy chain used to
//! demonstrate value handoff, and `stock_market`, the finance ETL chain.

pub mod random_number;
pub mod stock_market;
