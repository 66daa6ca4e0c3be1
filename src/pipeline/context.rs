//! Run context: the value handoff store shared by tasks in one run.

use serde_json::Value;
use std::collections::HashMap;

use super::task::TaskError;

/// Per-run key/value store keyed by task id.
///
/// A task that produces an output has it pushed here under its own id;
/// downstream tasks pull it back by naming the producer. Pulling an id that
/// never published is an error, not an empty value: a missing upstream output
/// means the chain is wired wrong or the producer was skipped.
#[derive(Debug, Default)]
pub struct RunContext {
    values: HashMap<String, Value>,
}

impl RunContext {
    /// Creates an empty run context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the output of the task with the given id.
    pub fn push(&mut self, task_id: &str, value: Value) {
        self.values.insert(task_id.to_string(), value);
    }

    /// Retrieves the output published by the given task.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::MissingUpstream` if the task has not published.
    pub fn pull(&self, task_id: &str) -> Result<Value, TaskError> {
        self.values
            .get(task_id)
            .cloned()
            .ok_or_else(|| TaskError::MissingUpstream(task_id.to_string()))
    }

    /// Retrieves an upstream output expected to be a string.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::MissingUpstream` if absent and
    /// `TaskError::BadUpstream` if the value is not a string.
    pub fn pull_str(&self, task_id: &str) -> Result<String, TaskError> {
        match self.pull(task_id)? {
            Value::String(s) => Ok(s),
            other => Err(TaskError::BadUpstream {
                task_id: task_id.to_string(),
                expected: "string",
                got: other,
            }),
        }
    }

    /// Retrieves an upstream output expected to be an integer.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::MissingUpstream` if absent and
    /// `TaskError::BadUpstream` if the value is not an integer.
    pub fn pull_i64(&self, task_id: &str) -> Result<i64, TaskError> {
        let value = self.pull(task_id)?;
        value.as_i64().ok_or_else(|| TaskError::BadUpstream {
            task_id: task_id.to_string(),
            expected: "integer",
            got: value,
        })
    }

    /// Whether the given task has published an output.
    pub fn contains(&self, task_id: &str) -> bool {
        self.values.contains_key(task_id)
    }

    /// Number of published outputs.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no task has published yet.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
