//! Executor agent: runs plan steps through the tool registry.

use std::collections::HashSet;

use tracing::{debug, info, instrument, warn};

use crate::core::types::{ExecutionLog, Plan, Step, StepResult};
use crate::tools::{ToolRegistry, error_output};

/// Executor agent wrapper that owns the per-step retry bound.
#[derive(Debug, Clone)]
pub struct ExecutorAgent {
    max_retries_per_step: u32,
}

impl Default for ExecutorAgent {
    fn default() -> Self {
        Self::new(1)
    }
}

impl ExecutorAgent {
    pub fn new(max_retries_per_step: u32) -> Self {
        Self {
            max_retries_per_step,
        }
    }

    pub fn max_attempts_per_step(&self) -> u32 {
        self.max_retries_per_step.saturating_add(1)
    }

    /// Execute `plan` in order, restricted to `only_step_ids` when given.
    ///
    /// Steps run sequentially. Every executed step yields exactly one
    /// [`StepResult`]; failures are carried as data and never stop the pass.
    #[instrument(skip_all, fields(steps = plan.steps.len(), restricted = only_step_ids.is_some()))]
    pub async fn execute_plan(
        &self,
        registry: &ToolRegistry,
        plan: &Plan,
        only_step_ids: Option<&[u32]>,
    ) -> ExecutionLog {
        let allowed: Option<HashSet<u32>> = only_step_ids.map(|ids| ids.iter().copied().collect());

        let mut results = Vec::new();
        for step in &plan.steps {
            if let Some(allowed) = &allowed
                && !allowed.contains(&step.id)
            {
                continue;
            }
            results.push(self.execute_step(registry, step).await);
        }

        let log = ExecutionLog { steps: results };
        info!(
            executed = log.steps.len(),
            failed = log.failed_count(),
            "execution pass finished"
        );
        log
    }

    /// Dispatch one step, retrying only when the invocation itself errors.
    ///
    /// A well-formed output ends the loop even if it reports an error.
    #[instrument(skip_all, fields(step_id = step.id, tool = %step.tool))]
    async fn execute_step(&self, registry: &ToolRegistry, step: &Step) -> StepResult {
        let max_attempts = self.max_attempts_per_step();
        let mut result = StepResult::from_output(step, error_output("step was not attempted"));
        for attempt in 1..=max_attempts {
            match registry.dispatch(&step.tool, &step.input).await {
                Ok(output) => {
                    result = StepResult::from_output(step, output);
                    debug!(attempt, success = result.success, "step dispatched");
                    break;
                }
                Err(err) => {
                    warn!(attempt, max_attempts, err = %err, "step dispatch failed");
                    result = StepResult::from_output(step, error_output(err.to_string()));
                }
            }
        }
        result
    }
}
