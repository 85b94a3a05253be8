//! Live run against the configured completion API and real tool endpoints.
//!
//! Requires `OPENAI_API_KEY` (and optionally `OPENWEATHER_API_KEY`,
//! `GITHUB_TOKEN`). Run with `cargo test -p assistant --test live -- --ignored`.

use std::sync::Arc;

use assistant::io::config::AssistantConfig;
use assistant::io::llm::OpenAiCompleter;
use assistant::orchestrator::Assistant;
use assistant::tools::ToolRegistry;

#[tokio::test]
#[ignore = "needs network access and OPENAI_API_KEY"]
async fn live_run_produces_payload() {
    let config = AssistantConfig::default();
    let completer = OpenAiCompleter::from_env(&config.llm).expect("completer");
    let tools = ToolRegistry::with_defaults(&config.tools).expect("tools");
    let assistant = Assistant::new(Arc::new(completer), tools, &config);

    let payload = assistant
        .run_task("Find 2 popular GitHub repositories about rust and the weather in Paris.")
        .await
        .expect("payload");

    assert!(!payload.plan.steps.is_empty());
    assert_eq!(payload.execution.steps.len(), payload.plan.steps.len());
    assert!(!payload.verification.summary.is_empty());
}
