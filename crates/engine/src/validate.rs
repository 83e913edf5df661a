//! Structural validation — run this before persisting or executing a
//! workflow definition.
//!
//! Rules enforced:
//! 1. `steps` must be non-empty.
//! 2. Step IDs must be unique within the definition.
//! 3. Every `connections` entry must reference an existing step.
//!
//! The `active` check is deliberately not here: a draft definition is
//! structurally valid and only becomes unrunnable at execution time.
//! Validation is pure — no storage, no network.

use std::collections::HashSet;

use thiserror::Error;

use crate::models::WorkflowDefinition;

/// Structural defects in a workflow definition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A runnable definition needs at least one step.
    #[error("workflow has no steps")]
    EmptySteps,

    /// Two or more steps share the same ID.
    #[error("duplicate step ID: '{0}'")]
    DuplicateStepId(String),

    /// A connection references a step ID that doesn't exist.
    #[error("step '{step_id}' connects to unknown step '{target}'")]
    DanglingConnection { step_id: String, target: String },
}

/// Validate the definition's structure.
///
/// # Errors
/// - [`ValidationError::EmptySteps`] if there are no steps.
/// - [`ValidationError::DuplicateStepId`] if two steps share an ID.
/// - [`ValidationError::DanglingConnection`] if a connection targets a
///   missing step.
pub fn validate(definition: &WorkflowDefinition) -> Result<(), ValidationError> {
    if definition.steps.is_empty() {
        return Err(ValidationError::EmptySteps);
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for step in &definition.steps {
        if !seen.insert(step.id.as_str()) {
            return Err(ValidationError::DuplicateStepId(step.id.clone()));
        }
    }

    for step in &definition.steps {
        for target in &step.connections {
            if !seen.contains(target.as_str()) {
                return Err(ValidationError::DanglingConnection {
                    step_id: step.id.clone(),
                    target: target.clone(),
                });
            }
        }
    }

    Ok(())
}
