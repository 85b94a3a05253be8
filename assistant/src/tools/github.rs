//! GitHub repository search via the public REST API.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use crate::core::types::{ERROR_KEY, JsonObject};

use super::{Tool, ToolError, parse_args};

pub const NAME: &str = "github";

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default = "default_per_page")]
    per_page: u32,
}

fn default_per_page() -> u32 {
    3
}

/// Searches repositories sorted by stars.
#[derive(Debug, Clone)]
pub struct GithubSearchTool {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl GithubSearchTool {
    pub fn new(client: reqwest::Client, url: &str, token: Option<String>) -> Self {
        Self {
            client,
            url: url.to_string(),
            token,
        }
    }

    async fn search(&self, args: &SearchArgs) -> Result<Value, reqwest::Error> {
        let per_page = args.per_page.to_string();
        let mut request = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/vnd.github+json")
            .query(&[
                ("q", args.query.as_str()),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
            ]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request.send().await?.error_for_status()?.json().await
    }
}

#[async_trait]
impl Tool for GithubSearchTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "search GitHub repositories by stars. input: {\"query\": string, \"per_page\": integer (optional, default 3)}"
    }

    #[instrument(skip_all, fields(tool = NAME))]
    async fn invoke(&self, input: &JsonObject) -> Result<JsonObject, ToolError> {
        let args: SearchArgs = parse_args(NAME, input)?;
        debug!(query = %args.query, per_page = args.per_page, "searching repositories");
        match self.search(&args).await {
            Ok(data) => Ok(summarize_search(&args.query, &data)),
            Err(err) => {
                warn!(err = %err, "github search failed");
                Ok(search_failure(&args.query, &err.to_string()))
            }
        }
    }
}

/// Reduce a search response to the fields the verifier needs.
pub fn summarize_search(query: &str, data: &Value) -> JsonObject {
    let items: Vec<Value> = data
        .get("items")
        .and_then(Value::as_array)
        .map(|repos| {
            repos
                .iter()
                .map(|repo| {
                    json!({
                        "full_name": repo.get("full_name"),
                        "html_url": repo.get("html_url"),
                        "stargazers_count": repo.get("stargazers_count"),
                        "description": repo.get("description"),
                        "language": repo.get("language"),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let mut output = JsonObject::new();
    output.insert("query".to_string(), Value::String(query.to_string()));
    output.insert(
        "total_count".to_string(),
        data.get("total_count").cloned().unwrap_or(Value::Null),
    );
    output.insert("items".to_string(), Value::Array(items));
    output
}

fn search_failure(query: &str, detail: &str) -> JsonObject {
    let mut output = JsonObject::new();
    output.insert("query".to_string(), Value::String(query.to_string()));
    output.insert(
        ERROR_KEY.to_string(),
        Value::String(format!("GitHub API request failed: {detail}")),
    );
    output
}
