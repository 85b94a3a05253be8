//! Planner agent: turns a task into a validated [`Plan`].

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::core::plan::{parse_plan, plan_invariant_violations};
use crate::core::types::Plan;
use crate::io::llm::Completer;
use crate::io::prompt::{PromptEngine, ToolSpec};

/// The planner could not produce a valid plan within its attempt budget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("plan generation failed after {attempts} attempt(s): {last_reason}")]
pub struct PlanGenerationError {
    pub attempts: u32,
    pub last_reason: String,
}

/// Planner agent wrapper that owns prompts, the tool catalog and the retry bound.
#[derive(Debug)]
pub struct PlannerAgent {
    prompts: PromptEngine,
    tools: Vec<ToolSpec>,
    max_retries: u32,
}

impl PlannerAgent {
    pub fn new(tools: Vec<ToolSpec>, max_retries: u32) -> Self {
        Self {
            prompts: PromptEngine::new(),
            tools,
            max_retries,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Ask the completer for a plan, retrying on unusable output.
    ///
    /// Invalid JSON, schema violations and completion failures each consume
    /// one attempt. Never returns a partial or empty fallback plan.
    #[instrument(skip_all, fields(max_attempts = self.max_attempts()))]
    pub async fn create_plan<C: Completer + ?Sized>(
        &self,
        completer: &C,
        task: &str,
    ) -> Result<Plan, PlanGenerationError> {
        let prompt = self
            .prompts
            .render_planner(task, &self.tools)
            .map_err(|err| PlanGenerationError {
                attempts: 0,
                last_reason: format!("{err:#}"),
            })?;

        let mut last_reason = String::new();
        for attempt in 1..=self.max_attempts() {
            let raw = match completer.complete_json(&prompt.system, &prompt.user).await {
                Ok(raw) => raw,
                Err(err) => {
                    last_reason = format!("completion failed: {err:#}");
                    warn!(attempt, reason = %last_reason, "planner completion failed");
                    continue;
                }
            };
            match parse_plan(&raw) {
                Ok(plan) => {
                    let violations = plan_invariant_violations(&plan);
                    if !violations.is_empty() {
                        warn!(violations = ?violations, "plan accepted with invariant violations");
                    }
                    info!(attempt, steps = plan.steps.len(), "plan created");
                    return Ok(plan);
                }
                Err(rejection) => {
                    warn!(attempt, reason = %rejection, "planner output rejected");
                    debug!(raw = %raw, "rejected planner output");
                    last_reason = rejection.to_string();
                }
            }
        }

        Err(PlanGenerationError {
            attempts: self.max_attempts(),
            last_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedCompleter, two_step_plan_json};

    fn catalog() -> Vec<ToolSpec> {
        vec![ToolSpec {
            name: "github".to_string(),
            description: "search repositories".to_string(),
        }]
    }

    #[tokio::test]
    async fn returns_first_valid_plan() {
        let completer = ScriptedCompleter::new(vec![two_step_plan_json()]);
        let agent = PlannerAgent::new(catalog(), 2);

        let plan = agent.create_plan(&completer, "repos and weather").await.expect("plan");
        assert_eq!(plan.step_ids(), vec![1, 2]);

        let calls = completer.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].system.contains("`github`: search repositories"));
        assert!(calls[0].user.contains("repos and weather"));
    }

    #[tokio::test]
    async fn retries_invalid_output_with_same_prompts() {
        let completer = ScriptedCompleter::new(vec![
            "not json".to_string(),
            r#"{"steps": [{"id": 1, "action": "x"}]}"#.to_string(),
            two_step_plan_json(),
        ]);
        let agent = PlannerAgent::new(catalog(), 2);

        let plan = agent.create_plan(&completer, "task").await.expect("plan");
        assert_eq!(plan.steps.len(), 2);

        let calls = completer.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], calls[2]);
    }

    #[tokio::test]
    async fn completion_failure_counts_as_attempt() {
        let completer = ScriptedCompleter::default();
        completer.push_error("rate limited");
        completer.push(two_step_plan_json());
        let agent = PlannerAgent::new(catalog(), 1);

        let plan = agent.create_plan(&completer, "task").await.expect("plan");
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(completer.calls().len(), 2);
    }

    #[tokio::test]
    async fn exhausting_attempts_is_fatal() {
        let completer = ScriptedCompleter::new(vec!["nope", "still nope", "{\"steps\": 5}", "unused"]);
        let agent = PlannerAgent::new(catalog(), 2);

        let err = agent.create_plan(&completer, "task").await.expect_err("should fail");
        assert_eq!(err.attempts, 3);
        assert!(err.last_reason.starts_with("schema validation failed"));
        assert_eq!(completer.calls().len(), 3);
        assert!(err.to_string().contains("after 3 attempt(s)"));
    }

    #[test]
    fn attempt_count_saturates_instead_of_overflowing() {
        assert_eq!(PlannerAgent::new(catalog(), 2).max_attempts(), 3);
        assert_eq!(PlannerAgent::new(catalog(), u32::MAX).max_attempts(), u32::MAX);
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let completer = ScriptedCompleter::new(vec!["garbage", "unused"]);
        let agent = PlannerAgent::new(catalog(), 0);

        let err = agent.create_plan(&completer, "task").await.expect_err("should fail");
        assert_eq!(err.attempts, 1);
        assert!(err.last_reason.starts_with("invalid json"));
        assert_eq!(completer.calls().len(), 1);
    }
}
