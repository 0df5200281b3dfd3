use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::{
    dispatch::{Captures, Plugin, RuleSpec},
    domain::IncomingMessage,
    messaging::types::Reply,
    ports::{HttpQuery, JsonSource},
    Result,
};

const FORECAST_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";
const NUM_WEATHERS: usize = 3;

pub struct WeatherPlugin {
    http: Arc<dyn JsonSource>,
    api_key: String,
}

fn describe(entry: &Value) -> Option<String> {
    let status = entry.pointer("/weather/0/description")?.as_str()?;
    let temp = entry.pointer("/main/temp")?.as_f64()?;
    Some(format!("{status} ({temp}ºF)"))
}

impl WeatherPlugin {
    pub fn new(http: Arc<dyn JsonSource>, api_key: String) -> Self {
        Self { http, api_key }
    }

    /// The next few 3-hour forecast blocks for `location`.
    async fn forecast(&self, location: &str) -> String {
        let req = HttpQuery::get(FORECAST_URL)
            .param("q", location)
            .param("units", "imperial")
            .param("cnt", NUM_WEATHERS.to_string())
            .param("appid", &self.api_key);

        let lines: Option<Vec<String>> = match self.http.fetch(req).await {
            Ok(body) => body.get("list").and_then(Value::as_array).map(|list| {
                list.iter()
                    .take(NUM_WEATHERS)
                    .filter_map(describe)
                    .collect()
            }),
            Err(e) => {
                warn!("weather lookup for {location} failed: {e}");
                None
            }
        };

        match lines {
            Some(lines) if !lines.is_empty() => format!(
                "Next {NUM_WEATHERS} 3-hour weathers for {location}\n{}",
                lines.join("\n")
            ),
            _ => format!("No idea what the weather is doing in {location}"),
        }
    }
}

#[async_trait]
impl Plugin for WeatherPlugin {
    fn name(&self) -> &'static str {
        "weather"
    }

    fn rules(&self) -> Vec<RuleSpec> {
        vec![RuleSpec::mention("forecast", r"^weather\s(?P<location>.+)$")
            .requires(&["location"])
            .help("the next few 3-hour forecasts for a place. Example: weather Portland, OR")]
    }

    async fn handle(
        &self,
        _action: &str,
        _msg: &IncomingMessage,
        caps: &Captures,
    ) -> Result<Vec<Reply>> {
        let location = caps.get("location").unwrap_or_default().trim();
        Ok(vec![Reply::Reply(self.forecast(location).await)])
    }
}
