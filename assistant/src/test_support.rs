//! Test-only helpers: plan builders and scripted collaborators.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};

use crate::core::types::{JsonObject, Plan, Step, StepResult};
use crate::io::llm::Completer;
use crate::tools::{Tool, ToolError, error_output};

/// Convert a JSON object literal into a [`JsonObject`].
pub fn object(value: Value) -> JsonObject {
    match value {
        Value::Object(map) => map,
        other => panic!("expected json object, got {other}"),
    }
}

/// Create a deterministic step with an empty input.
pub fn step(id: u32, tool: &str) -> Step {
    Step {
        id,
        action: format!("step {id} via {tool}"),
        tool: tool.to_string(),
        input: JsonObject::new(),
    }
}

/// Create a step with explicit input.
pub fn step_with_input(id: u32, tool: &str, input: Value) -> Step {
    Step {
        input: object(input),
        ..step(id, tool)
    }
}

pub fn plan(steps: Vec<Step>) -> Plan {
    Plan { steps }
}

/// Successful result for `step(id, tool)`.
pub fn ok_result(id: u32, tool: &str) -> StepResult {
    StepResult::from_output(&step(id, tool), object(json!({ "ok": true })))
}

/// Failed result for `step(id, tool)` carrying `message`.
pub fn failed_result(id: u32, tool: &str, message: &str) -> StepResult {
    StepResult::from_output(&step(id, tool), error_output(message))
}

/// Tool that replays a script of outcomes, then repeats a fallback.
pub struct ScriptedTool {
    name: String,
    script: Mutex<VecDeque<Result<JsonObject, ToolError>>>,
    fallback: Result<JsonObject, ToolError>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedTool {
    pub fn new(
        name: &str,
        script: Vec<Result<Value, &str>>,
        fallback: Result<Value, &str>,
    ) -> Self {
        Self {
            name: name.to_string(),
            script: Mutex::new(script.into_iter().map(convert).collect()),
            fallback: convert(fallback),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always returns `output`.
    pub fn succeeding(name: &str, output: Value) -> Self {
        Self::new(name, Vec::new(), Ok(output))
    }

    /// Always fails with `message`.
    pub fn always_failing(name: &str, message: &str) -> Self {
        Self::new(name, Vec::new(), Err(message))
    }

    /// Fails `failures` times, then returns `output`.
    pub fn flaky(name: &str, failures: usize, output: Value) -> Self {
        let script = (0..failures)
            .map(|n| Err(if n == 0 { "transient failure" } else { "still failing" }))
            .collect();
        Self::new(name, script, Ok(output))
    }

    /// Shared counter of `invoke` calls; stays valid after registration.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

fn convert(outcome: Result<Value, &str>) -> Result<JsonObject, ToolError> {
    outcome
        .map(object)
        .map_err(|message| ToolError::Failed(message.to_string()))
}

#[async_trait]
impl Tool for ScriptedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "scripted test tool"
    }

    async fn invoke(&self, _input: &JsonObject) -> Result<JsonObject, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .expect("script lock")
            .pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// One recorded completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCall {
    pub system: String,
    pub user: String,
}

#[derive(Default)]
struct CompleterScript {
    responses: VecDeque<Result<String, String>>,
    calls: Vec<CompletionCall>,
}

/// Completer that returns queued responses in order and records every call.
///
/// Clones share the same script, so a test can keep a handle after handing a
/// clone to the code under test.
#[derive(Clone, Default)]
pub struct ScriptedCompleter {
    inner: Arc<Mutex<CompleterScript>>,
}

impl ScriptedCompleter {
    pub fn new<S: Into<String>>(responses: Vec<S>) -> Self {
        let completer = Self::default();
        for response in responses {
            completer.push(response);
        }
        completer
    }

    /// Queue a successful response.
    pub fn push(&self, response: impl Into<String>) {
        self.lock().responses.push_back(Ok(response.into()));
    }

    /// Queue a backend failure.
    pub fn push_error(&self, message: impl Into<String>) {
        self.lock().responses.push_back(Err(message.into()));
    }

    pub fn calls(&self) -> Vec<CompletionCall> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CompleterScript> {
        self.inner.lock().expect("completer lock")
    }
}

#[async_trait]
impl Completer for ScriptedCompleter {
    async fn complete_json(&self, system: &str, user: &str) -> Result<String> {
        let mut script = self.lock();
        script.calls.push(CompletionCall {
            system: system.to_string(),
            user: user.to_string(),
        });
        match script.responses.pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted completer exhausted")),
        }
    }
}

/// Planner response with one `github` step and one `weather` step.
pub fn two_step_plan_json() -> String {
    json!({
        "steps": [
            {"id": 1, "action": "Find repositories about rust", "tool": "github",
             "input": {"query": "rust", "per_page": 2}},
            {"id": 2, "action": "Get the weather in Paris", "tool": "weather",
             "input": {"city": "Paris"}}
        ]
    })
    .to_string()
}

/// Verifier response with the given status and retry ids.
pub fn verdict_json(status: &str, retry_step_ids: &[u32]) -> String {
    json!({
        "status": status,
        "retry_step_ids": retry_step_ids,
        "summary": format!("verdict {status}"),
        "structured_output": {},
        "steps": []
    })
    .to_string()
}
