//! Prompt rendering for the planner and verifier.
//!
//! System and user prompts are rendered separately: the completion boundary
//! keeps them as two inputs so planner retries reuse the same system framing.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::types::{ExecutionLog, Plan};

const PLANNER_SYSTEM_TEMPLATE: &str = include_str!("../prompts/planner_system.md");
const PLANNER_USER_TEMPLATE: &str = include_str!("../prompts/planner_user.md");
const VERIFIER_SYSTEM_TEMPLATE: &str = include_str!("../prompts/verifier_system.md");
const VERIFIER_USER_TEMPLATE: &str = include_str!("../prompts/verifier_user.md");

/// Tool entry advertised to the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
}

/// A rendered system/user prompt pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// Template engine wrapper around minijinja.
#[derive(Debug)]
pub struct PromptEngine {
    env: Environment<'static>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("planner_system", PLANNER_SYSTEM_TEMPLATE)
            .expect("planner system template should be valid");
        env.add_template("planner_user", PLANNER_USER_TEMPLATE)
            .expect("planner user template should be valid");
        env.add_template("verifier_system", VERIFIER_SYSTEM_TEMPLATE)
            .expect("verifier system template should be valid");
        env.add_template("verifier_user", VERIFIER_USER_TEMPLATE)
            .expect("verifier user template should be valid");
        Self { env }
    }

    pub fn render_planner(&self, task: &str, tools: &[ToolSpec]) -> Result<PromptPair> {
        let system = self
            .env
            .get_template("planner_system")?
            .render(context! { tools => tools })
            .context("render planner system prompt")?;
        let user = self
            .env
            .get_template("planner_user")?
            .render(context! { task => task.trim() })
            .context("render planner user prompt")?;
        Ok(PromptPair { system, user })
    }

    pub fn render_verifier(
        &self,
        task: &str,
        plan: &Plan,
        execution: &ExecutionLog,
    ) -> Result<PromptPair> {
        let plan_json = serde_json::to_string_pretty(plan).context("serialize plan")?;
        let execution_json =
            serde_json::to_string_pretty(execution).context("serialize execution log")?;
        let system = self
            .env
            .get_template("verifier_system")?
            .render(())
            .context("render verifier system prompt")?;
        let user = self
            .env
            .get_template("verifier_user")?
            .render(context! {
                task => task.trim(),
                plan_json => plan_json,
                execution_json => execution_json,
            })
            .context("render verifier user prompt")?;
        Ok(PromptPair { system, user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ok_result, plan, step};

    fn specs() -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "github".to_string(),
                description: "search repositories".to_string(),
            },
            ToolSpec {
                name: "weather".to_string(),
                description: "current weather".to_string(),
            },
        ]
    }

    #[test]
    fn planner_prompt_lists_tools_and_task() {
        let engine = PromptEngine::new();
        let prompt = engine
            .render_planner("  weather in Paris  ", &specs())
            .expect("render");

        assert!(prompt.system.contains("`github`: search repositories"));
        assert!(prompt.system.contains("`weather`: current weather"));
        assert!(!prompt.system.contains("Paris"));
        assert!(prompt.user.contains("User task:\nweather in Paris\n"));
    }

    #[test]
    fn verifier_prompt_embeds_plan_and_execution_json() {
        let engine = PromptEngine::new();
        let plan = plan(vec![step(1, "github")]);
        let execution = ExecutionLog {
            steps: vec![ok_result(1, "github")],
        };

        let prompt = engine
            .render_verifier("find repos", &plan, &execution)
            .expect("render");

        assert!(prompt.system.contains("retry_step_ids"));
        assert!(prompt.user.contains("find repos"));
        assert!(prompt.user.contains("\"tool\": \"github\""));
        assert!(prompt.user.contains("\"success\": true"));
    }
}
