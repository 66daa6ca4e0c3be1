//! stockflow: declarative stock market data pipelines.
//!
//! This library provides two pipeline definitions (a toy random-number
//! pipeline and a stock market ETL pipeline) plus the small set of
//! building blocks they run on: a sequential task chain with keyed value
//! handoff, a polling sensor, named connections, a one-shot container
//! job, and a warehouse loader.

// Core modules
pub mod cli;
pub mod config;
pub mod connections;
pub mod error;
pub mod execution;
pub mod flows;
pub mod market;
pub mod metrics;
pub mod pipeline;
pub mod warehouse;

// Re-export commonly used error types
pub use error::DockerError;
pub use pipeline::{Pipeline, PipelineRunner, RunContext, Task, TaskError};
