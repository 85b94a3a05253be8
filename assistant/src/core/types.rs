//! Data contracts shared by the planner, executor and verifier.
//!
//! These types define stable JSON shapes between pipeline stages. They carry
//! no behavior that depends on external state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON object used for tool inputs, tool outputs and structured answers.
pub type JsonObject = Map<String, Value>;

/// Key whose presence in a tool output marks the step as failed.
pub const ERROR_KEY: &str = "error";

/// One planned tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Step id assigned by the planner, starting from 1.
    pub id: u32,
    /// Human-readable description of what the step does.
    pub action: String,
    /// Registered tool name, e.g. `github` or `weather`.
    pub tool: String,
    /// Tool-specific arguments.
    #[serde(default)]
    pub input: JsonObject,
}

/// Ordered list of steps. Order is the default execution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn step_ids(&self) -> Vec<u32> {
        self.steps.iter().map(|step| step.id).collect()
    }

    pub fn contains(&self, step_id: u32) -> bool {
        self.steps.iter().any(|step| step.id == step_id)
    }
}

/// Recorded outcome of attempting one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: u32,
    pub tool: String,
    pub action: String,
    pub input: JsonObject,
    pub output: JsonObject,
    pub success: bool,
}

impl StepResult {
    /// Build a result for `step`, deriving `success` from the error convention.
    pub fn from_output(step: &Step, output: JsonObject) -> Self {
        let success = !output.contains_key(ERROR_KEY);
        Self {
            step_id: step.id,
            tool: step.tool.clone(),
            action: step.action.clone(),
            input: step.input.clone(),
            output,
            success,
        }
    }

    /// Error message captured in `output`, if any.
    pub fn error(&self) -> Option<&str> {
        self.output.get(ERROR_KEY).and_then(Value::as_str)
    }
}

/// All step results for one execution pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLog {
    #[serde(default)]
    pub steps: Vec<StepResult>,
}

impl ExecutionLog {
    pub fn step_ids(&self) -> Vec<u32> {
        self.steps.iter().map(|result| result.step_id).collect()
    }

    pub fn get(&self, step_id: u32) -> Option<&StepResult> {
        self.steps.iter().find(|result| result.step_id == step_id)
    }

    pub fn failed_count(&self) -> usize {
        self.steps.iter().filter(|result| !result.success).count()
    }
}

/// Judge's overall decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Ok,
    Retry,
}

/// Judge's verdict on a single step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedStep {
    pub step_id: u32,
    pub ok: bool,
    #[serde(default)]
    pub issues: Vec<String>,
}

/// Structured verdict returned by the verification judge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub status: VerificationStatus,
    #[serde(default)]
    pub retry_step_ids: Vec<u32>,
    /// Natural-language answer for the user.
    pub summary: String,
    /// Machine-friendly final result.
    #[serde(default)]
    pub structured_output: JsonObject,
    #[serde(default)]
    pub steps: Vec<VerifiedStep>,
}

impl VerificationResult {
    /// True when the judge asked for specific steps to be re-executed.
    pub fn requests_retry(&self) -> bool {
        self.status == VerificationStatus::Retry && !self.retry_step_ids.is_empty()
    }
}

/// Terminal output of one assistant run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalPayload {
    pub task: String,
    pub plan: Plan,
    pub execution: ExecutionLog,
    pub verification: VerificationResult,
}
