//! JSON Schema checks for model-produced documents.
//!
//! Schemas are embedded at compile time and compiled once on first use.

use std::sync::LazyLock;

use jsonschema::{Draft, Validator};
use serde_json::Value;

const PLAN_SCHEMA: &str = include_str!("../../schemas/plan.schema.json");
const VERIFICATION_SCHEMA: &str = include_str!("../../schemas/verification.schema.json");

static PLAN_VALIDATOR: LazyLock<Validator> =
    LazyLock::new(|| compile(PLAN_SCHEMA).expect("plan schema should be valid"));
static VERIFICATION_VALIDATOR: LazyLock<Validator> = LazyLock::new(|| {
    compile(VERIFICATION_SCHEMA).expect("verification schema should be valid")
});

/// Raw text of the embedded plan schema.
pub fn plan_schema() -> &'static str {
    PLAN_SCHEMA
}

/// Raw text of the embedded verification schema.
pub fn verification_schema() -> &'static str {
    VERIFICATION_SCHEMA
}

/// Validate `instance` against the plan schema, returning one message per violation.
pub fn plan_violations(instance: &Value) -> Vec<String> {
    violations(&PLAN_VALIDATOR, instance)
}

/// Validate `instance` against the verification schema, returning one message per violation.
pub fn verification_violations(instance: &Value) -> Vec<String> {
    violations(&VERIFICATION_VALIDATOR, instance)
}

fn compile(raw: &str) -> Result<Validator, String> {
    let schema: Value = serde_json::from_str(raw).map_err(|err| err.to_string())?;
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .map_err(|err| err.to_string())
}

fn violations(validator: &Validator, instance: &Value) -> Vec<String> {
    validator
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect()
}
