//! `steps` crate — the `StepExecutor` trait, the executor registry, and the
//! built-in step implementations.
//!
//! Every step kind — built-in and custom alike — is a [`StepExecutor`]
//! behind the [`ExecutorRegistry`]. The engine crate dispatches execution
//! through this trait object and never matches on step kinds itself.

pub mod builtin;
pub mod error;
pub mod mock;
pub mod registry;
pub mod traits;

pub use builtin::agent::{AgentDescriptor, AgentDirectory, InMemoryAgentDirectory};
pub use error::StepError;
pub use registry::ExecutorRegistry;
pub use traits::{StepContext, StepExecutor, StepOutput, Successor};
