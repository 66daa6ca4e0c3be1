//! Command-line interface for stockflow.
//!
//! Provides commands for listing the shipped pipelines and running one to
//! completion.

mod commands;

pub use commands::{parse_cli, run_with_cli};
