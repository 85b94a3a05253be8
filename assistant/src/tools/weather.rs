//! Current weather via the OpenWeatherMap API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::core::types::{ERROR_KEY, JsonObject};

use super::{Tool, ToolError, parse_args};

pub const NAME: &str = "weather";

#[derive(Debug, Deserialize)]
struct WeatherArgs {
    city: String,
    #[serde(default = "default_units")]
    units: String,
}

fn default_units() -> String {
    "metric".to_string()
}

/// Looks up current conditions for a city.
#[derive(Debug, Clone)]
pub struct WeatherTool {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    api_key_env: String,
}

impl WeatherTool {
    pub fn new(
        client: reqwest::Client,
        url: &str,
        api_key: Option<String>,
        api_key_env: &str,
    ) -> Self {
        Self {
            client,
            url: url.to_string(),
            api_key,
            api_key_env: api_key_env.to_string(),
        }
    }

    async fn fetch(&self, args: &WeatherArgs, api_key: &str) -> Result<Value, reqwest::Error> {
        self.client
            .get(&self.url)
            .query(&[
                ("q", args.city.as_str()),
                ("appid", api_key),
                ("units", args.units.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "current weather for a city. input: {\"city\": string, \"units\": \"metric\" | \"imperial\" (optional, default \"metric\")}"
    }

    #[instrument(skip_all, fields(tool = NAME))]
    async fn invoke(&self, input: &JsonObject) -> Result<JsonObject, ToolError> {
        let args: WeatherArgs = parse_args(NAME, input)?;
        let Some(api_key) = self.api_key.as_deref() else {
            warn!(env = %self.api_key_env, "weather api key missing");
            return Ok(weather_failure(
                &args.city,
                &format!("Missing {} environment variable.", self.api_key_env),
            ));
        };
        debug!(city = %args.city, units = %args.units, "fetching weather");
        match self.fetch(&args, api_key).await {
            Ok(data) => Ok(summarize_weather(&args.city, data)),
            Err(err) => {
                // reqwest includes the full URL in errors; drop it so the key never leaks.
                let detail = err.without_url().to_string();
                warn!(err = %detail, "weather lookup failed");
                Ok(weather_failure(
                    &args.city,
                    &format!("Weather API request failed: {detail}"),
                ))
            }
        }
    }
}

/// Reduce a weather response to headline fields, keeping the raw document.
pub fn summarize_weather(city: &str, data: Value) -> JsonObject {
    let main = data.get("main");
    let field = |name: &str| {
        main.and_then(|m| m.get(name))
            .cloned()
            .unwrap_or(Value::Null)
    };
    let description = data
        .get("weather")
        .and_then(Value::as_array)
        .and_then(|list| list.first())
        .and_then(|first| first.get("description"))
        .cloned()
        .unwrap_or(Value::Null);

    let mut output = JsonObject::new();
    output.insert("city".to_string(), Value::String(city.to_string()));
    output.insert("temperature".to_string(), field("temp"));
    output.insert("feels_like".to_string(), field("feels_like"));
    output.insert("humidity".to_string(), field("humidity"));
    output.insert("description".to_string(), description);
    output.insert("raw".to_string(), data);
    output
}

fn weather_failure(city: &str, message: &str) -> JsonObject {
    let mut output = JsonObject::new();
    output.insert("city".to_string(), Value::String(city.to_string()));
    output.insert(ERROR_KEY.to_string(), Value::String(message.to_string()));
    output
}
