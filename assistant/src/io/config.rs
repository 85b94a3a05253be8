//! Assistant configuration stored in `assistant.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default location of the config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "assistant.toml";

/// Upper bound for `max_plan_retries` and `max_retries_per_step`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Environment variable that overrides `llm.model`.
pub const MODEL_OVERRIDE_ENV: &str = "OPENAI_MODEL";

/// Assistant configuration (TOML).
///
/// Secrets never live here: the file only names the environment variables
/// they are read from. Missing fields default to the values below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssistantConfig {
    /// Extra planner attempts after the first invalid plan.
    pub max_plan_retries: u32,

    /// Extra dispatch attempts for a step whose tool call errors.
    pub max_retries_per_step: u32,

    pub llm: LlmConfig,

    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`).
    pub base_url: String,
    pub temperature: f32,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolsConfig {
    pub github_url: String,
    pub weather_url: String,
    pub user_agent: String,
    /// Per-request timeout for tool HTTP calls.
    pub timeout_secs: u64,
    /// Optional bearer token for GitHub search.
    pub github_token_env: String,
    pub weather_api_key_env: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            max_plan_retries: 2,
            max_retries_per_step: 1,
            llm: LlmConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: 0.1,
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            github_url: "https://api.github.com/search/repositories".to_string(),
            weather_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            user_agent: "ai-ops-assistant".to_string(),
            timeout_secs: 10,
            github_token_env: "GITHUB_TOKEN".to_string(),
            weather_api_key_env: "OPENWEATHER_API_KEY".to_string(),
        }
    }
}

impl AssistantConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_plan_retries > MAX_RETRIES_LIMIT {
            return Err(anyhow!("max_plan_retries must be <= {MAX_RETRIES_LIMIT}"));
        }
        if self.max_retries_per_step > MAX_RETRIES_LIMIT {
            return Err(anyhow!("max_retries_per_step must be <= {MAX_RETRIES_LIMIT}"));
        }
        if self.llm.model.trim().is_empty() {
            return Err(anyhow!("llm.model must be non-empty"));
        }
        if self.llm.base_url.trim().is_empty() {
            return Err(anyhow!("llm.base_url must be non-empty"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(anyhow!("llm.temperature must be within 0.0..=2.0"));
        }
        if self.llm.api_key_env.trim().is_empty() {
            return Err(anyhow!("llm.api_key_env must be non-empty"));
        }
        if self.llm.timeout_secs == 0 {
            return Err(anyhow!("llm.timeout_secs must be > 0"));
        }
        if self.tools.github_url.trim().is_empty() || self.tools.weather_url.trim().is_empty() {
            return Err(anyhow!("tools.github_url and tools.weather_url must be non-empty"));
        }
        if self.tools.timeout_secs == 0 {
            return Err(anyhow!("tools.timeout_secs must be > 0"));
        }
        Ok(())
    }

    /// Replace the model with `model` when it is set and non-blank.
    ///
    /// Used for the `OPENAI_MODEL` environment override.
    pub fn apply_model_override(&mut self, model: Option<String>) {
        if let Some(model) = model.filter(|m| !m.trim().is_empty()) {
            self.llm.model = model;
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AssistantConfig::default()`.
pub fn load_config(path: &Path) -> Result<AssistantConfig> {
    if !path.exists() {
        let cfg = AssistantConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AssistantConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Load config from `path`, then apply environment overrides.
pub fn load_effective_config(path: &Path) -> Result<AssistantConfig> {
    let mut cfg = load_config(path)?;
    cfg.apply_model_override(std::env::var(MODEL_OVERRIDE_ENV).ok());
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AssistantConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
