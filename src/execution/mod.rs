//! One-shot container job execution.

pub mod container;

pub use container::{ContainerRunner, JobConfig, JobOutput};
