//! Parse-then-validate for planner output.
//!
//! Callers decide between retrying and giving up purely from the returned
//! tag; nothing here panics or logs.

use std::collections::HashSet;

use serde_json::Value;
use thiserror::Error;

use crate::core::schema::plan_violations;
use crate::core::types::Plan;

/// Why a raw planner response could not become a [`Plan`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanRejection {
    #[error("invalid json: {0}")]
    InvalidJson(String),
    #[error("schema validation failed:\n- {}", .0.join("\n- "))]
    Schema(Vec<String>),
    #[error("plan shape mismatch: {0}")]
    Shape(String),
}

/// Parse `raw` as JSON and validate it against the plan schema.
///
/// Unknown fields are ignored. Missing `id`, `action` or `tool` on any step
/// rejects the whole plan.
pub fn parse_plan(raw: &str) -> Result<Plan, PlanRejection> {
    let value: Value =
        serde_json::from_str(raw).map_err(|err| PlanRejection::InvalidJson(err.to_string()))?;
    let errors = plan_violations(&value);
    if !errors.is_empty() {
        return Err(PlanRejection::Schema(errors));
    }
    serde_json::from_value(value).map_err(|err| PlanRejection::Shape(err.to_string()))
}

/// Check plan invariants not expressible in JSON Schema:
/// - No duplicate step ids
/// - Ids run 1, 2, 3, ... in plan order
/// - Tool names are non-blank
pub fn plan_invariant_violations(plan: &Plan) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    for (index, step) in plan.steps.iter().enumerate() {
        if !seen.insert(step.id) {
            errors.push(format!("duplicate step id {}", step.id));
        }
        let expected = index as u32 + 1;
        if step.id != expected {
            errors.push(format!(
                "step at position {} has id {} (expected {expected})",
                index + 1,
                step.id
            ));
        }
        if step.tool.trim().is_empty() {
            errors.push(format!("step {}: tool must be non-empty", step.id));
        }
    }
    errors
}
