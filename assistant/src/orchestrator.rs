//! Orchestration for a single assistant run.
//!
//! Sequences planning, execution and verification, with at most
//! [`MAX_RETRY_ROUNDS`] selective re-execution round driven by the verifier.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::agents::executor::ExecutorAgent;
use crate::agents::planner::{PlanGenerationError, PlannerAgent};
use crate::agents::verifier::VerifierAgent;
use crate::core::merge::merge_execution_logs;
use crate::core::types::{ExecutionLog, FinalPayload, Plan, VerificationResult};
use crate::io::config::AssistantConfig;
use crate::io::llm::{Completer, OpenAiCompleter};
use crate::tools::ToolRegistry;

/// Upper bound on verifier-requested re-execution rounds per run.
pub const MAX_RETRY_ROUNDS: u32 = 1;

/// Pipeline states, in the order a run can visit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Planning,
    Executing,
    Verifying,
    RetryExecuting,
    ReVerifying,
    Done,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Planning => "planning",
            Phase::Executing => "executing",
            Phase::Verifying => "verifying",
            Phase::RetryExecuting => "retry_executing",
            Phase::ReVerifying => "re_verifying",
            Phase::Done => "done",
        }
    }
}

/// Artifacts reported to a [`RunObserver`] as a run progresses.
///
/// `round` is 0 for the first pass and counts retry rounds after that.
#[derive(Debug, Clone, Copy)]
pub enum RunEvent<'a> {
    PhaseEntered(Phase),
    Planned(&'a Plan),
    Executed {
        round: u32,
        execution: &'a ExecutionLog,
    },
    Verified {
        round: u32,
        verification: &'a VerificationResult,
    },
    Finished(&'a FinalPayload),
}

/// Receives run events. Implementations must not fail the run.
pub trait RunObserver: Send + Sync {
    fn on_event(&self, event: &RunEvent<'_>);
}

/// The Plan → Execute → Verify pipeline with its injected collaborators.
///
/// Holds no per-run state; one instance can serve concurrent runs.
pub struct Assistant {
    completer: Arc<dyn Completer>,
    tools: ToolRegistry,
    planner: PlannerAgent,
    executor: ExecutorAgent,
    verifier: VerifierAgent,
    observer: Option<Arc<dyn RunObserver>>,
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("tools", &self.tools)
            .field("planner", &self.planner)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

impl Assistant {
    pub fn new(
        completer: Arc<dyn Completer>,
        tools: ToolRegistry,
        config: &AssistantConfig,
    ) -> Self {
        let planner = PlannerAgent::new(tools.specs(), config.max_plan_retries);
        Self {
            completer,
            tools,
            planner,
            executor: ExecutorAgent::new(config.max_retries_per_step),
            verifier: VerifierAgent::new(),
            observer: None,
        }
    }

    /// Build with the production collaborators described by `config`.
    ///
    /// Fails fast when the completion API key is not set.
    pub fn from_config(config: &AssistantConfig) -> anyhow::Result<Self> {
        let completer = OpenAiCompleter::from_env(&config.llm)?;
        let tools = ToolRegistry::with_defaults(&config.tools)?;
        info!(model = completer.model(), tools = ?tools.names(), "assistant ready");
        Ok(Self::new(Arc::new(completer), tools, config))
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run only the planning stage.
    pub async fn plan(&self, task: &str) -> Result<Plan, PlanGenerationError> {
        self.planner.create_plan(self.completer.as_ref(), task).await
    }

    /// Run the full pipeline for `task`.
    ///
    /// Only planning failure is fatal. Step failures and unusable verifier
    /// output are carried as data, so a payload is always produced once a
    /// plan exists.
    #[instrument(skip_all, fields(task_len = task.len()))]
    pub async fn run_task(&self, task: &str) -> Result<FinalPayload, PlanGenerationError> {
        self.enter(Phase::Planning);
        let plan = self.plan(task).await?;
        self.emit(&RunEvent::Planned(&plan));

        self.enter(Phase::Executing);
        let mut execution = self.executor.execute_plan(&self.tools, &plan, None).await;
        self.emit(&RunEvent::Executed {
            round: 0,
            execution: &execution,
        });

        self.enter(Phase::Verifying);
        let mut verification = self
            .verifier
            .analyze(self.completer.as_ref(), task, &plan, &execution)
            .await;
        self.emit(&RunEvent::Verified {
            round: 0,
            verification: &verification,
        });

        let mut round = 0;
        while round < MAX_RETRY_ROUNDS && verification.requests_retry() {
            round += 1;
            self.enter(Phase::RetryExecuting);
            let retry_ids = verification.retry_step_ids.clone();
            let unknown: Vec<u32> = retry_ids
                .iter()
                .copied()
                .filter(|id| !plan.contains(*id))
                .collect();
            if !unknown.is_empty() {
                warn!(unknown = ?unknown, "verifier requested retry of steps not in the plan");
            }

            let retried = self
                .executor
                .execute_plan(&self.tools, &plan, Some(&retry_ids))
                .await;
            self.emit(&RunEvent::Executed {
                round,
                execution: &retried,
            });
            execution = merge_execution_logs(&execution, &retried);

            self.enter(Phase::ReVerifying);
            verification = self
                .verifier
                .analyze(self.completer.as_ref(), task, &plan, &execution)
                .await;
            self.emit(&RunEvent::Verified {
                round,
                verification: &verification,
            });
        }

        self.enter(Phase::Done);
        let payload = self
            .verifier
            .build_final_payload(task, &plan, &execution, &verification);
        info!(
            retry_rounds = round,
            failed_steps = payload.execution.failed_count(),
            status = ?payload.verification.status,
            "run finished"
        );
        self.emit(&RunEvent::Finished(&payload));
        Ok(payload)
    }

    fn enter(&self, phase: Phase) {
        info!(phase = phase.as_str(), "entering phase");
        self.emit(&RunEvent::PhaseEntered(phase));
    }

    fn emit(&self, event: &RunEvent<'_>) {
        if let Some(observer) = &self.observer {
            observer.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::VerificationStatus;
    use crate::test_support::{ScriptedCompleter, ScriptedTool, two_step_plan_json, verdict_json};
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::Ordering;

    #[derive(Default)]
    struct PhaseLog {
        phases: Mutex<Vec<Phase>>,
    }

    impl RunObserver for PhaseLog {
        fn on_event(&self, event: &RunEvent<'_>) {
            if let RunEvent::PhaseEntered(phase) = event {
                self.phases.lock().expect("lock").push(*phase);
            }
        }
    }

    fn assistant(completer: &ScriptedCompleter, tools: ToolRegistry) -> Assistant {
        Assistant::new(
            Arc::new(completer.clone()),
            tools,
            &AssistantConfig::default(),
        )
    }

    fn default_tools() -> ToolRegistry {
        let mut tools = ToolRegistry::new();
        tools
            .register(ScriptedTool::succeeding("github", json!({"items": []})))
            .register(ScriptedTool::succeeding("weather", json!({"temperature": 9})));
        tools
    }

    #[tokio::test]
    async fn ok_verdict_skips_retry_round() {
        let completer = ScriptedCompleter::new(vec![two_step_plan_json(), verdict_json("ok", &[])]);
        let phases = Arc::new(PhaseLog::default());
        let assistant = assistant(&completer, default_tools()).with_observer(phases.clone());

        let payload = assistant.run_task("task").await.expect("payload");
        assert_eq!(payload.verification.status, VerificationStatus::Ok);
        assert_eq!(completer.calls().len(), 2);
        assert_eq!(
            *phases.phases.lock().expect("lock"),
            vec![Phase::Planning, Phase::Executing, Phase::Verifying, Phase::Done]
        );
    }

    #[tokio::test]
    async fn retry_status_without_ids_does_not_retry() {
        let completer =
            ScriptedCompleter::new(vec![two_step_plan_json(), verdict_json("retry", &[])]);
        let assistant = assistant(&completer, default_tools());

        let payload = assistant.run_task("task").await.expect("payload");
        assert_eq!(payload.verification.status, VerificationStatus::Retry);
        assert_eq!(completer.calls().len(), 2);
    }

    #[tokio::test]
    async fn retry_round_reruns_only_requested_steps() {
        let github = ScriptedTool::succeeding("github", json!({"items": []}));
        let github_calls = github.call_counter();
        let weather = ScriptedTool::new(
            "weather",
            vec![Ok(json!({"city": "Paris", "error": "rate limited"}))],
            Ok(json!({"city": "Paris", "temperature": 14})),
        );
        let weather_calls = weather.call_counter();
        let mut tools = ToolRegistry::new();
        tools.register(github).register(weather);

        let completer = ScriptedCompleter::new(vec![
            two_step_plan_json(),
            verdict_json("retry", &[2]),
            verdict_json("ok", &[]),
        ]);
        let phases = Arc::new(PhaseLog::default());
        let assistant = assistant(&completer, tools).with_observer(phases.clone());

        let payload = assistant.run_task("task").await.expect("payload");
        assert_eq!(github_calls.load(Ordering::SeqCst), 1);
        assert_eq!(weather_calls.load(Ordering::SeqCst), 2);
        assert_eq!(payload.execution.step_ids(), vec![1, 2]);
        assert!(payload.execution.steps.iter().all(|result| result.success));
        assert_eq!(payload.verification.status, VerificationStatus::Ok);
        assert_eq!(
            *phases.phases.lock().expect("lock"),
            vec![
                Phase::Planning,
                Phase::Executing,
                Phase::Verifying,
                Phase::RetryExecuting,
                Phase::ReVerifying,
                Phase::Done
            ]
        );

        let reverify_prompt = &completer.calls()[2].user;
        assert!(reverify_prompt.contains("\"temperature\": 14"));
    }

    #[tokio::test]
    async fn planning_failure_is_fatal() {
        let completer = ScriptedCompleter::new(vec!["x", "y", "z"]);
        let phases = Arc::new(PhaseLog::default());
        let assistant = assistant(&completer, default_tools()).with_observer(phases.clone());

        let err = assistant.run_task("task").await.expect_err("should fail");
        assert_eq!(err.attempts, 3);
        assert_eq!(*phases.phases.lock().expect("lock"), vec![Phase::Planning]);
    }

    #[test]
    fn phase_names_are_snake_case() {
        assert_eq!(Phase::RetryExecuting.as_str(), "retry_executing");
        assert_eq!(Phase::ReVerifying.as_str(), "re_verifying");
    }
}
