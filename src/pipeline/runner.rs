//! Sequential pipeline execution.
//!
//! The runner walks the task chain in order, publishes each task's output to
//! the run context, and produces a `RunReport`. The first failure marks the
//! run failed; remaining tasks are recorded as skipped. Retry, alerting, and
//! scheduling are out of scope: a failed report is the whole failure story.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{error, info};

use super::context::RunContext;
use super::task::Task;

/// A named, ordered chain of tasks.
pub struct Pipeline {
    name: String,
    tags: Vec<String>,
    schedule: Option<String>,
    tasks: Vec<Box<dyn Task>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("schedule", &self.schedule)
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

impl Pipeline {
    /// Creates an empty pipeline with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: Vec::new(),
            schedule: None,
            tasks: Vec::new(),
        }
    }

    /// Adds a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Records the schedule this pipeline would run on under a scheduler.
    /// Metadata only: runs are triggered explicitly.
    pub fn with_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.schedule = Some(schedule.into());
        self
    }

    /// Appends a task to the end of the chain.
    pub fn add_task(mut self, task: Box<dyn Task>) -> Self {
        self.tasks.push(task);
        self
    }

    /// Pipeline name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pipeline tags.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Declared schedule, if any.
    pub fn schedule(&self) -> Option<&str> {
        self.schedule.as_deref()
    }

    /// Task ids in execution order.
    pub fn task_ids(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.id()).collect()
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the pipeline has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Final status of one task within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Success,
    Failed,
    Skipped,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Success => write!(f, "success"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Outcome of one task within a run.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    /// Task id.
    pub task_id: String,
    /// Final status.
    pub status: TaskStatus,
    /// Wall-clock duration. Zero for skipped tasks.
    pub duration: Duration,
    /// Error message for failed tasks.
    pub error: Option<String>,
}

/// Outcome of a whole pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Pipeline name.
    pub pipeline: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Per-task outcomes in execution order.
    pub tasks: Vec<TaskReport>,
}

impl RunReport {
    /// Whether every task succeeded.
    pub fn succeeded(&self) -> bool {
        self.tasks.iter().all(|t| t.status == TaskStatus::Success)
    }

    /// The failed task, if any.
    pub fn failed_task(&self) -> Option<&TaskReport> {
        self.tasks.iter().find(|t| t.status == TaskStatus::Failed)
    }
}

/// Executes pipelines sequentially.
#[derive(Debug, Default)]
pub struct PipelineRunner;

impl PipelineRunner {
    /// Creates a new runner.
    pub fn new() -> Self {
        Self
    }

    /// Runs the pipeline with a fresh context.
    pub async fn run(&self, pipeline: &Pipeline) -> RunReport {
        let mut ctx = RunContext::new();
        self.run_with_context(pipeline, &mut ctx).await
    }

    /// Runs the pipeline against a caller-provided context, so callers can
    /// inspect published handoff values afterwards.
    pub async fn run_with_context(&self, pipeline: &Pipeline, ctx: &mut RunContext) -> RunReport {
        let started_at = Utc::now();
        let mut reports = Vec::with_capacity(pipeline.tasks.len());
        let mut failed = false;

        info!(
            pipeline = pipeline.name(),
            tasks = pipeline.len(),
            "starting pipeline run"
        );

        for task in &pipeline.tasks {
            if failed {
                reports.push(TaskReport {
                    task_id: task.id().to_string(),
                    status: TaskStatus::Skipped,
                    duration: Duration::ZERO,
                    error: None,
                });
                continue;
            }

            let task_started = Instant::now();
            info!(pipeline = pipeline.name(), task = task.id(), "running task");

            let result = task.execute(ctx).await;
            let duration = task_started.elapsed();
            crate::metrics::record_task_duration(pipeline.name(), task.id(), duration);

            match result {
                Ok(output) => {
                    if let Some(value) = output {
                        ctx.push(task.id(), value);
                    }
                    info!(
                        pipeline = pipeline.name(),
                        task = task.id(),
                        duration_ms = duration.as_millis() as u64,
                        "task succeeded"
                    );
                    reports.push(TaskReport {
                        task_id: task.id().to_string(),
                        status: TaskStatus::Success,
                        duration,
                        error: None,
                    });
                }
                Err(e) => {
                    error!(
                        pipeline = pipeline.name(),
                        task = task.id(),
                        error = %e,
                        "task failed, marking run failed"
                    );
                    reports.push(TaskReport {
                        task_id: task.id().to_string(),
                        status: TaskStatus::Failed,
                        duration,
                        error: Some(e.to_string()),
                    });
                    failed = true;
                }
            }
        }

        let report = RunReport {
            pipeline: pipeline.name().to_string(),
            started_at,
            finished_at: Utc::now(),
            tasks: reports,
        };

        let status = if report.succeeded() { "success" } else { "failed" };
        crate::metrics::record_pipeline_run(pipeline.name(), status);
        info!(pipeline = pipeline.name(), status, "pipeline run finished");

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::task::TaskError;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Emit {
        id: &'static str,
        value: i64,
    }

    #[async_trait]
    impl Task for Emit {
        fn id(&self) -> &str {
            self.id
        }

        async fn execute(&self, _ctx: &RunContext) -> Result<Option<Value>, TaskError> {
            Ok(Some(json!(self.value)))
        }
    }

    struct Double {
        id: &'static str,
        upstream: &'static str,
    }

    #[async_trait]
    impl Task for Double {
        fn id(&self) -> &str {
            self.id
        }

        async fn execute(&self, ctx: &RunContext) -> Result<Option<Value>, TaskError> {
            let n = ctx.pull_i64(self.upstream)?;
            Ok(Some(json!(n * 2)))
        }
    }

    struct Fail {
        id: &'static str,
    }

    #[async_trait]
    impl Task for Fail {
        fn id(&self) -> &str {
            self.id
        }

        async fn execute(&self, _ctx: &RunContext) -> Result<Option<Value>, TaskError> {
            Err(TaskError::MissingUpstream("boom".to_string()))
        }
    }

    #[test]
    fn test_pipeline_metadata() {
        let pipeline = Pipeline::new("p")
            .with_tag("demo")
            .with_schedule("@daily")
            .add_task(Box::new(Emit { id: "a", value: 1 }));

        assert_eq!(pipeline.name(), "p");
        assert_eq!(pipeline.tags(), &["demo".to_string()]);
        assert_eq!(pipeline.schedule(), Some("@daily"));
        assert_eq!(pipeline.task_ids(), vec!["a"]);
        assert_eq!(pipeline.len(), 1);
        assert!(!pipeline.is_empty());
    }

    #[tokio::test]
    async fn test_chain_hands_off_values() {
        let pipeline = Pipeline::new("chain")
            .add_task(Box::new(Emit { id: "a", value: 21 }))
            .add_task(Box::new(Double {
                id: "b",
                upstream: "a",
            }));

        let mut ctx = RunContext::new();
        let report = PipelineRunner::new()
            .run_with_context(&pipeline, &mut ctx)
            .await;

        assert!(report.succeeded());
        assert_eq!(ctx.pull_i64("a").unwrap(), 21);
        assert_eq!(ctx.pull_i64("b").unwrap(), 42);
    }

    #[tokio::test]
    async fn test_failure_skips_downstream() {
        let pipeline = Pipeline::new("fails")
            .add_task(Box::new(Emit { id: "a", value: 1 }))
            .add_task(Box::new(Fail { id: "b" }))
            .add_task(Box::new(Emit { id: "c", value: 3 }));

        let mut ctx = RunContext::new();
        let report = PipelineRunner::new()
            .run_with_context(&pipeline, &mut ctx)
            .await;

        assert!(!report.succeeded());
        assert_eq!(report.tasks.len(), 3);
        assert_eq!(report.tasks[0].status, TaskStatus::Success);
        assert_eq!(report.tasks[1].status, TaskStatus::Failed);
        assert!(report.tasks[1].error.as_deref().unwrap().contains("boom"));
        assert_eq!(report.tasks[2].status, TaskStatus::Skipped);
        assert!(!ctx.contains("c"));

        let failed = report.failed_task().unwrap();
        assert_eq!(failed.task_id, "b");
    }

    #[tokio::test]
    async fn test_missing_upstream_fails_consumer() {
        let pipeline = Pipeline::new("miswired").add_task(Box::new(Double {
            id: "b",
            upstream: "a",
        }));

        let report = PipelineRunner::new().run(&pipeline).await;
        assert!(!report.succeeded());
        assert_eq!(report.failed_task().unwrap().task_id, "b");
    }

    #[tokio::test]
    async fn test_empty_pipeline_succeeds() {
        let pipeline = Pipeline::new("empty");
        let report = PipelineRunner::new().run(&pipeline).await;
        assert!(report.succeeded());
        assert!(report.tasks.is_empty());
    }
}
