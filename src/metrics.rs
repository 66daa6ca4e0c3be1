//! Prometheus metrics registration and export.
//!
//! Defines the metrics stockflow records during pipeline runs and provides
//! initialization and text-format export. Recording helpers are no-ops until
//! `init_metrics` has been called, so library users and tests are not forced
//! to initialize the registry.

use prometheus::{CounterVec, Encoder, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;
use std::time::Duration;

/// Global Prometheus registry for all stockflow metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Total pipeline runs, labeled by pipeline and final status.
pub static PIPELINE_RUNS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Task execution duration in seconds, labeled by pipeline and task.
pub static TASK_DURATION: OnceLock<HistogramVec> = OnceLock::new();

/// Total sensor pokes that found the condition not yet met, labeled by task.
pub static SENSOR_POKES_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Initialize all metrics and register them with the registry.
///
/// Idempotent: calling it again after a successful initialization leaves the
/// existing registry in place.
///
/// # Errors
///
/// Returns a `prometheus::Error` if metric registration fails.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    if REGISTRY.get().is_some() {
        return Ok(());
    }

    let registry = Registry::new();

    let pipeline_runs_total = CounterVec::new(
        Opts::new("stockflow_pipeline_runs_total", "Total pipeline runs"),
        &["pipeline", "status"],
    )?;

    let task_duration = HistogramVec::new(
        prometheus::HistogramOpts::new(
            "stockflow_task_duration_seconds",
            "Task execution duration in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 300.0]),
        &["pipeline", "task"],
    )?;

    let sensor_pokes_total = CounterVec::new(
        Opts::new(
            "stockflow_sensor_pokes_total",
            "Sensor pokes that found the condition not yet met",
        ),
        &["task"],
    )?;

    registry.register(Box::new(pipeline_runs_total.clone()))?;
    registry.register(Box::new(task_duration.clone()))?;
    registry.register(Box::new(sensor_pokes_total.clone()))?;

    let _ = REGISTRY.set(registry);
    let _ = PIPELINE_RUNS_TOTAL.set(pipeline_runs_total);
    let _ = TASK_DURATION.set(task_duration);
    let _ = SENSOR_POKES_TOTAL.set(sensor_pokes_total);

    tracing::debug!("Prometheus metrics initialized");

    Ok(())
}

/// Records a finished pipeline run.
pub fn record_pipeline_run(pipeline: &str, status: &str) {
    if let Some(counter) = PIPELINE_RUNS_TOTAL.get() {
        counter.with_label_values(&[pipeline, status]).inc();
    }
}

/// Records a task's execution duration.
pub fn record_task_duration(pipeline: &str, task: &str, duration: Duration) {
    if let Some(histogram) = TASK_DURATION.get() {
        histogram
            .with_label_values(&[pipeline, task])
            .observe(duration.as_secs_f64());
    }
}

/// Records a sensor poke that found the condition not yet met.
pub fn record_sensor_poke(task: &str) {
    if let Some(counter) = SENSOR_POKES_TOTAL.get() {
        counter.with_label_values(&[task]).inc();
    }
}

/// Export all registered metrics in Prometheus text format.
pub fn export_metrics() -> String {
    let Some(registry) = REGISTRY.get() else {
        return "# Metrics not initialized. Call init_metrics() first.\n".to_string();
    };

    let encoder = TextEncoder::new();
    let metric_families = registry.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return format!("# Error encoding metrics: {}\n", e);
    }

    String::from_utf8(buffer)
        .unwrap_or_else(|e| format!("# Error converting metrics to UTF-8: {}\n", e))
}
