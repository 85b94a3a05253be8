//! Tool registry and dispatch.
//!
//! A [`Tool`] is one external capability invoked with a step's `input`
//! object. The [`ToolRegistry`] maps tool names to capabilities; adding a tool
//! means registering it, not editing a branch chain.
//!
//! Output convention: a returned object containing an `error` key marks the
//! step as failed. Tools report failed outbound calls that way. An `Err` from
//! [`Tool::invoke`] is reserved for the call itself going wrong (bad
//! arguments, internal failure) and is eligible for per-step retry.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::core::types::{ERROR_KEY, JsonObject};
use crate::io::config::ToolsConfig;
use crate::io::prompt::ToolSpec;

pub mod github;
pub mod weather;

/// Failure raised by a tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("invalid input for tool '{tool}': {reason}")]
    InvalidInput { tool: String, reason: String },
    #[error("{0}")]
    Failed(String),
}

/// One external capability.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the planner uses in `step.tool`.
    fn name(&self) -> &str;

    /// One-line description advertised to the planner.
    fn description(&self) -> &str;

    async fn invoke(&self, input: &JsonObject) -> Result<JsonObject, ToolError>;
}

/// Deserialize keyword-style arguments from a step input.
pub fn parse_args<T: DeserializeOwned>(tool: &str, input: &JsonObject) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(input.clone())).map_err(|err| ToolError::InvalidInput {
        tool: tool.to_string(),
        reason: err.to_string(),
    })
}

/// Output object carrying only an error message.
pub fn error_output(message: impl Into<String>) -> JsonObject {
    let mut output = JsonObject::new();
    output.insert(ERROR_KEY.to_string(), Value::String(message.into()));
    output
}

/// Registered tools, keyed by name.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `github` and `weather` tools.
    ///
    /// One HTTP client is shared by every tool. Credentials are read from the
    /// environment variables named in `config`.
    pub fn with_defaults(config: &ToolsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .context("build tool http client")?;
        let github_token = read_env(&config.github_token_env);
        let weather_key = read_env(&config.weather_api_key_env);

        let mut registry = Self::new();
        registry.register(github::GithubSearchTool::new(
            client.clone(),
            &config.github_url,
            github_token,
        ));
        registry.register(weather::WeatherTool::new(
            client,
            &config.weather_url,
            weather_key,
            &config.weather_api_key_env,
        ));
        Ok(registry)
    }

    /// Register `tool`, replacing any tool with the same name.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> &mut Self {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Registered tool names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Catalog entries for the planner prompt.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools
            .values()
            .map(|tool| ToolSpec {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
            })
            .collect()
    }

    /// Invoke the tool registered under `tool` with `input`.
    ///
    /// An unknown tool name is a data-level failure: it returns
    /// `Ok({"error": "Unknown tool '<tool>'"})`.
    #[instrument(skip(self, input))]
    pub async fn dispatch(&self, tool: &str, input: &JsonObject) -> Result<JsonObject, ToolError> {
        let Some(capability) = self.tools.get(tool) else {
            warn!("unknown tool requested");
            return Ok(error_output(format!("Unknown tool '{tool}'")));
        };
        let output = capability.invoke(input).await?;
        debug!(failed = output.contains_key(ERROR_KEY), "tool returned");
        Ok(output)
    }
}

fn read_env(name: &str) -> Option<String> {
    if name.trim().is_empty() {
        return None;
    }
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedTool;
    use serde::Deserialize;
    use serde_json::json;

    #[tokio::test]
    async fn unknown_tool_is_reported_as_data() {
        let registry = ToolRegistry::new();
        let output = registry
            .dispatch("stocks", &JsonObject::new())
            .await
            .expect("dispatch should not fail");
        assert_eq!(output.get(ERROR_KEY), Some(&json!("Unknown tool 'stocks'")));
    }

    #[tokio::test]
    async fn dispatch_routes_by_name() {
        let mut registry = ToolRegistry::new();
        registry
            .register(ScriptedTool::succeeding("github", json!({"items": []})))
            .register(ScriptedTool::succeeding("weather", json!({"temperature": 20})));

        let output = registry
            .dispatch("weather", &JsonObject::new())
            .await
            .expect("dispatch");
        assert_eq!(output.get("temperature"), Some(&json!(20)));
        assert_eq!(registry.names(), vec!["github".to_string(), "weather".to_string()]);
    }

    #[tokio::test]
    async fn dispatch_propagates_tool_errors() {
        let mut registry = ToolRegistry::new();
        registry.register(ScriptedTool::always_failing("github", "socket closed"));

        let err = registry
            .dispatch("github", &JsonObject::new())
            .await
            .expect_err("should fail");
        assert_eq!(err.to_string(), "socket closed");
    }

    #[test]
    fn register_replaces_existing_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(ScriptedTool::succeeding("github", json!({"v": 1})));
        registry.register(ScriptedTool::succeeding("github", json!({"v": 2})));
        assert_eq!(registry.names().len(), 1);
        assert!(registry.get("github").is_some());
    }

    #[test]
    fn defaults_register_github_and_weather() {
        let registry = ToolRegistry::with_defaults(&ToolsConfig::default()).expect("registry");
        assert_eq!(registry.names(), vec!["github".to_string(), "weather".to_string()]);
        let specs = registry.specs();
        assert!(specs.iter().all(|spec| !spec.description.is_empty()));
    }

    #[derive(Debug, Deserialize)]
    struct Args {
        city: String,
        #[serde(default)]
        units: Option<String>,
    }

    #[test]
    fn parse_args_reads_keyword_arguments() {
        let mut input = JsonObject::new();
        input.insert("city".to_string(), json!("Paris"));
        input.insert("ignored".to_string(), json!(true));
        let args: Args = parse_args("weather", &input).expect("args");
        assert_eq!(args.city, "Paris");
        assert_eq!(args.units, None);
    }

    #[test]
    fn parse_args_reports_missing_argument() {
        let err = parse_args::<Args>("weather", &JsonObject::new()).expect_err("should fail");
        assert!(matches!(err, ToolError::InvalidInput { .. }));
        assert!(err.to_string().contains("invalid input for tool 'weather'"));
        assert!(err.to_string().contains("city"));
    }
}
