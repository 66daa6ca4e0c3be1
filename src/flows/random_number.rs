//! Toy pipeline: generate a random number, classify it odd or even.
//!
//! Exists to demonstrate the task chain and value handoff with no external
//! systems involved: the number produced by the first task is pulled by the
//! second via the run context.

use async_trait::async_trait;
use rand::RngExt;
use serde_json::{json, Value};
use tracing::info;

use crate::pipeline::{Pipeline, RunContext, Task, TaskError};

/// Pipeline name.
pub const PIPELINE_NAME: &str = "generate_random";

/// Task id of the number generator.
pub const GENERATE_RANDOM_NUMBER: &str = "generate_random_number";

/// Task id of the classifier.
pub const CHECK_ODD_EVEN: &str = "check_odd_even";

/// Produces a uniform random number in 1..=100.
struct GenerateRandomNumber;

#[async_trait]
impl Task for GenerateRandomNumber {
    fn id(&self) -> &str {
        GENERATE_RANDOM_NUMBER
    }

    async fn execute(&self, _ctx: &RunContext) -> Result<Option<Value>, TaskError> {
        let number: i64 = rand::rng().random_range(1..=100);
        info!(number, "generated number");
        Ok(Some(json!(number)))
    }
}

/// Classifies the generated number as odd or even.
struct CheckOddEven;

#[async_trait]
impl Task for CheckOddEven {
    fn id(&self) -> &str {
        CHECK_ODD_EVEN
    }

    async fn execute(&self, ctx: &RunContext) -> Result<Option<Value>, TaskError> {
        let number = ctx.pull_i64(GENERATE_RANDOM_NUMBER)?;
        let result = if number % 2 == 0 { "even" } else { "odd" };
        info!(number, result, "classified number");
        Ok(Some(json!(result)))
    }
}

/// Builds the toy pipeline.
pub fn build_pipeline() -> Pipeline {
    Pipeline::new(PIPELINE_NAME)
        .with_tag("generate_random")
        .with_schedule("@daily")
        .add_task(Box::new(GenerateRandomNumber))
        .add_task(Box::new(CheckOddEven))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineRunner;

    #[test]
    fn test_pipeline_shape() {
        let pipeline = build_pipeline();
        assert_eq!(pipeline.name(), PIPELINE_NAME);
        assert_eq!(
            pipeline.task_ids(),
            vec![GENERATE_RANDOM_NUMBER, CHECK_ODD_EVEN]
        );
        assert_eq!(pipeline.schedule(), Some("@daily"));
    }

    #[tokio::test]
    async fn test_classification_matches_parity() {
        let pipeline = build_pipeline();
        let mut ctx = RunContext::new();
        let report = PipelineRunner::new()
            .run_with_context(&pipeline, &mut ctx)
            .await;

        assert!(report.succeeded());

        let number = ctx.pull_i64(GENERATE_RANDOM_NUMBER).unwrap();
        assert!((1..=100).contains(&number));

        let result = ctx.pull_str(CHECK_ODD_EVEN).unwrap();
        let expected = if number % 2 == 0 { "even" } else { "odd" };
        assert_eq!(result, expected);
    }
}
