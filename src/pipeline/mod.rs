//! Pipeline primitives: task chains with keyed value handoff.
//!
//! A pipeline is a named, strictly ordered list of tasks. The runner executes
//! tasks one at a time; a task may publish one output value, which downstream
//! tasks retrieve from the run context by the producing task's id. There is no
//! branching, no fan-out, and no retry policy: the first task failure marks
//! the run failed and the remaining tasks are skipped.
//!
//! Sensors are tasks that block the chain until a polled condition holds. The
//! `SensorTask` adapter owns the poll loop (poke interval and timeout); a
//! sensor that never becomes ready fails the run with a timeout error.

pub mod context;
pub mod runner;
pub mod task;

// Re-export main types for convenience
pub use context::RunContext;
pub use runner::{Pipeline, PipelineRunner, RunReport, TaskReport, TaskStatus};
pub use task::{PokeStatus, Sensor, SensorTask, Task, TaskError};
