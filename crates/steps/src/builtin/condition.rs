//! `condition` step — evaluates a predicate against the context and picks
//! a branch.
//!
//! Evaluation is deliberately lenient: an unknown operator, a missing
//! field, or mismatched types all evaluate to `false`. A condition step
//! never fails a run.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::{StepContext, StepError, StepExecutor, StepOutput, Successor};

#[derive(Deserialize)]
struct ConditionConfig {
    field: String,
    operator: String,
    value: Value,
}

/// Executor for `kind = "condition"`.
///
/// Branch selection: with two or more `connections`, the first is the
/// true-branch and the second the false-branch. With fewer than two the
/// step falls back to declared order (one connection is followed only when
/// the condition holds).
pub struct ConditionExecutor;

#[async_trait]
impl StepExecutor for ConditionExecutor {
    async fn execute(&self, config: &Value, ctx: &StepContext) -> Result<StepOutput, StepError> {
        let config: ConditionConfig = serde_json::from_value(config.clone())
            .map_err(|e| StepError::Fatal(format!("invalid condition config: {e}")))?;

        let met = ctx
            .lookup(&config.field)
            .map(|actual| evaluate(&config.operator, actual, &config.value))
            .unwrap_or(false);

        debug!(
            step_id = %ctx.step_id,
            field = %config.field,
            operator = %config.operator,
            met,
            "condition evaluated"
        );

        let value = json!({ "conditionMet": met });

        // With both branches defined, jump; with fewer than two
        // connections, only a met condition follows the single target and
        // everything else falls back to declared order.
        let next = match ctx.connections.as_slice() {
            [true_branch, false_branch, ..] => {
                Successor::Goto(if met { true_branch } else { false_branch }.clone())
            }
            [only] if met => Successor::Goto(only.clone()),
            _ => Successor::FallThrough,
        };

        Ok(StepOutput {
            value,
            next: Some(next),
        })
    }
}

fn evaluate(operator: &str, actual: &Value, expected: &Value) -> bool {
    match operator {
        "equals" => loose_eq(actual, expected),
        "not_equals" => !loose_eq(actual, expected),
        "greater_than" => compare(actual, expected).is_some_and(|ord| ord.is_gt()),
        "less_than" => compare(actual, expected).is_some_and(|ord| ord.is_lt()),
        "contains" => contains(actual, expected),
        // Unknown operators evaluate to false rather than erroring.
        _ => false,
    }
}

/// Equality with numeric coercion, so `5` and `5.0` compare equal.
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

fn contains(actual: &Value, expected: &Value) -> bool {
    match actual {
        Value::String(haystack) => expected
            .as_str()
            .map(|needle| haystack.contains(needle))
            .unwrap_or(false),
        Value::Array(items) => items.iter().any(|item| loose_eq(item, expected)),
        _ => false,
    }
}
