//! Verifier agent: judges an execution log against the task.

use tracing::{info, instrument, warn};

use crate::core::types::{ExecutionLog, FinalPayload, Plan, VerificationResult};
use crate::core::verification::{fallback_verification, parse_verification};
use crate::io::llm::Completer;
use crate::io::prompt::PromptEngine;

/// Verifier agent wrapper that owns its prompts.
#[derive(Debug, Default)]
pub struct VerifierAgent {
    prompts: PromptEngine,
}

impl VerifierAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the completer for a verdict on `execution`.
    ///
    /// Never fails: an unusable response (or a failed completion call) is
    /// replaced by [`fallback_verification`], which reports `ok` so the run
    /// finishes without a retry round.
    #[instrument(skip_all, fields(steps = execution.steps.len()))]
    pub async fn analyze<C: Completer + ?Sized>(
        &self,
        completer: &C,
        task: &str,
        plan: &Plan,
        execution: &ExecutionLog,
    ) -> VerificationResult {
        let prompt = match self.prompts.render_verifier(task, plan, execution) {
            Ok(prompt) => prompt,
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(reason = %reason, "verifier prompt rendering failed");
                return fallback_verification(&reason);
            }
        };

        let raw = match completer.complete_json(&prompt.system, &prompt.user).await {
            Ok(raw) => raw,
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(reason = %reason, "verifier completion failed");
                return fallback_verification(&reason);
            }
        };

        match parse_verification(&raw) {
            Ok(verdict) => {
                info!(
                    status = ?verdict.status,
                    retry_step_ids = ?verdict.retry_step_ids,
                    "verification received"
                );
                verdict
            }
            Err(reason) => {
                warn!(reason = %reason, "verifier output rejected, using fallback");
                fallback_verification(&raw)
            }
        }
    }

    /// Assemble the terminal payload for a run.
    pub fn build_final_payload(
        &self,
        task: &str,
        plan: &Plan,
        execution: &ExecutionLog,
        verification: &VerificationResult,
    ) -> FinalPayload {
        FinalPayload {
            task: task.to_string(),
            plan: plan.clone(),
            execution: execution.clone(),
            verification: verification.clone(),
        }
    }
}
