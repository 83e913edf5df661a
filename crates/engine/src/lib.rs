//! `engine` crate — workflow definition model, structural validation, and
//! the step-sequencing execution engine.

pub mod context;
pub mod error;
pub mod models;
pub mod runner;
pub mod sink;
pub mod validate;

pub use context::{ExecutionContext, LogEntry, RunResult, RunStatus, StepStatus};
pub use error::EngineError;
pub use models::{Step, WorkflowDefinition, WorkflowStatus};
pub use runner::{CancelHandle, Engine, FailureAction, RunPolicy};
pub use sink::{RunEvent, RunSink, TracingSink};
pub use validate::{validate, ValidationError};

#[cfg(test)]
mod runner_tests;
