//! Task and sensor abstractions.
//!
//! Every pipeline node implements `Task`. A sensor implements `Sensor` and is
//! wrapped in a `SensorTask`, which owns the poll loop: poke every
//! `poke_interval` until the condition holds or `timeout` elapses.

use async_trait::async_trait;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::pipeline::context::RunContext;

/// Errors that can occur during task execution.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A downstream task pulled an output its upstream never published.
    #[error("Missing upstream output from task '{0}'")]
    MissingUpstream(String),

    /// An upstream output had an unexpected shape.
    #[error("Output of task '{task_id}' is not a {expected}: {got}")]
    BadUpstream {
        task_id: String,
        expected: &'static str,
        got: Value,
    },

    /// A sensor did not become ready within its timeout.
    #[error("Sensor timed out after {0:?}")]
    SensorTimeout(Duration),

    /// Connection resolution failed.
    #[error("Connection error: {0}")]
    Connection(#[from] crate::connections::ConnectionError),

    /// Finance API error.
    #[error("Market error: {0}")]
    Market(#[from] crate::market::MarketError),

    /// Local price storage error.
    #[error("Storage error: {0}")]
    Store(#[from] crate::market::StoreError),

    /// CSV reformatting error.
    #[error("Format error: {0}")]
    Format(#[from] crate::market::FormatError),

    /// Container job error.
    #[error("Docker error: {0}")]
    Docker(#[from] crate::error::DockerError),

    /// Warehouse load error.
    #[error("Warehouse error: {0}")]
    Warehouse(#[from] crate::warehouse::WarehouseError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single node in a pipeline.
#[async_trait]
pub trait Task: Send + Sync {
    /// Stable identifier; also the handoff key for this task's output.
    fn id(&self) -> &str;

    /// Runs the task. Returning `Some(value)` publishes the value to the run
    /// context under this task's id.
    async fn execute(&self, ctx: &RunContext) -> Result<Option<Value>, TaskError>;
}

/// Outcome of one sensor poke.
#[derive(Debug, Clone, PartialEq)]
pub enum PokeStatus {
    /// Condition holds; the chain may proceed. Carries an optional handoff value.
    Done(Option<Value>),
    /// Condition does not hold yet; poke again after the interval.
    NotYet,
}

/// A polled condition gating pipeline progress.
#[async_trait]
pub trait Sensor: Send + Sync {
    /// Stable identifier; also the handoff key for the sensor's value.
    fn id(&self) -> &str;

    /// Checks the condition once.
    async fn poke(&self, ctx: &RunContext) -> Result<PokeStatus, TaskError>;
}

/// Adapter running a `Sensor` as a `Task` with a poll loop.
///
/// The wait before the last poke is shortened so that poke lands on the
/// timeout boundary; a sensor can still succeed at exactly `timeout` elapsed.
pub struct SensorTask {
    sensor: Box<dyn Sensor>,
    poke_interval: Duration,
    timeout: Duration,
}

impl SensorTask {
    /// Wraps a sensor with the given poke interval and timeout.
    pub fn new(sensor: Box<dyn Sensor>, poke_interval: Duration, timeout: Duration) -> Self {
        Self {
            sensor,
            poke_interval,
            timeout,
        }
    }
}

#[async_trait]
impl Task for SensorTask {
    fn id(&self) -> &str {
        self.sensor.id()
    }

    async fn execute(&self, ctx: &RunContext) -> Result<Option<Value>, TaskError> {
        let started = Instant::now();
        let mut pokes: u64 = 0;

        loop {
            pokes += 1;
            match self.sensor.poke(ctx).await? {
                PokeStatus::Done(value) => {
                    tracing::info!(task = self.id(), pokes, "sensor condition met");
                    return Ok(value);
                }
                PokeStatus::NotYet => {
                    crate::metrics::record_sensor_poke(self.id());
                    let elapsed = started.elapsed();
                    if elapsed >= self.timeout {
                        return Err(TaskError::SensorTimeout(self.timeout));
                    }
                    let wait = self.poke_interval.min(self.timeout - elapsed);
                    tracing::debug!(
                        task = self.id(),
                        pokes,
                        wait_ms = wait.as_millis() as u64,
                        "sensor not ready, waiting"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Sensor that becomes ready after a fixed number of pokes.
    struct CountdownSensor {
        remaining: AtomicU32,
    }

    #[async_trait]
    impl Sensor for CountdownSensor {
        fn id(&self) -> &str {
            "countdown"
        }

        async fn poke(&self, _ctx: &RunContext) -> Result<PokeStatus, TaskError> {
            if self.remaining.fetch_sub(1, Ordering::SeqCst) <= 1 {
                Ok(PokeStatus::Done(Some(json!("ready"))))
            } else {
                Ok(PokeStatus::NotYet)
            }
        }
    }

    /// Sensor that is never ready.
    struct NeverSensor;

    #[async_trait]
    impl Sensor for NeverSensor {
        fn id(&self) -> &str {
            "never"
        }

        async fn poke(&self, _ctx: &RunContext) -> Result<PokeStatus, TaskError> {
            Ok(PokeStatus::NotYet)
        }
    }

    #[tokio::test]
    async fn test_sensor_becomes_ready() {
        let task = SensorTask::new(
            Box::new(CountdownSensor {
                remaining: AtomicU32::new(3),
            }),
            Duration::from_millis(1),
            Duration::from_secs(5),
        );

        let ctx = RunContext::new();
        let value = task.execute(&ctx).await.unwrap();
        assert_eq!(value, Some(json!("ready")));
    }

    #[tokio::test]
    async fn test_sensor_ready_on_final_poke() {
        // Three full intervals do not fit in the budget; the last wait is
        // shortened so the fourth poke still happens at the timeout boundary.
        let task = SensorTask::new(
            Box::new(CountdownSensor {
                remaining: AtomicU32::new(4),
            }),
            Duration::from_millis(20),
            Duration::from_millis(50),
        );

        let ctx = RunContext::new();
        let value = task.execute(&ctx).await.unwrap();
        assert_eq!(value, Some(json!("ready")));
    }

    #[tokio::test]
    async fn test_sensor_times_out() {
        let task = SensorTask::new(
            Box::new(NeverSensor),
            Duration::from_millis(5),
            Duration::from_millis(20),
        );

        let ctx = RunContext::new();
        let result = task.execute(&ctx).await;
        assert!(matches!(result, Err(TaskError::SensorTimeout(_))));
    }

    #[tokio::test]
    async fn test_sensor_task_uses_sensor_id() {
        let task = SensorTask::new(
            Box::new(NeverSensor),
            Duration::from_millis(1),
            Duration::from_millis(1),
        );
        assert_eq!(task.id(), "never");
    }

    #[test]
    fn test_task_error_display() {
        let err = TaskError::MissingUpstream("get_stock_prices".to_string());
        assert!(err.to_string().contains("get_stock_prices"));

        let err = TaskError::SensorTimeout(Duration::from_secs(300));
        assert!(err.to_string().contains("300"));

        let err = TaskError::BadUpstream {
            task_id: "t".to_string(),
            expected: "string",
            got: json!(5),
        };
        assert!(err.to_string().contains("string"));
    }
}
