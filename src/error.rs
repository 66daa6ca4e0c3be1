//! Error types for container job execution.
//!
//! Subsystem-local errors (configuration, connections, tasks, warehouse)
//! live next to their modules; the Docker error is shared between the
//! execution wrapper and the pipeline tasks that launch container jobs,
//! so it is defined here.

use thiserror::Error;

/// Errors that can occur during Docker operations.
#[derive(Debug, Error)]
pub enum DockerError {
    #[error("Docker run failed: {0}")]
    RunFailed(String),

    #[error("Container '{id}' not found")]
    ContainerNotFound { id: String },

    #[error("Failed to pull image '{image}': {reason}")]
    PullFailed { image: String, reason: String },

    #[error("Docker daemon not available: {0}")]
    DaemonUnavailable(String),

    #[error("Container exited with non-zero code {code}: {logs}")]
    NonZeroExit { code: i64, logs: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
