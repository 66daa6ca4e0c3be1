//! Finance API access and local price storage.
//!
//! The three pieces of real logic in the stock pipeline live here: fetching
//! quote data over HTTP, persisting the raw JSON blob, and reformatting the
//! quote arrays into CSV rows.

pub mod format;
pub mod quotes;
pub mod store;

// Re-export main types for convenience
pub use format::{FormatError, PriceRow};
pub use quotes::MarketError;
pub use store::StoreError;
