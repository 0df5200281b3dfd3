use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::America::Los_Angeles;
use serde_json::Value;
use tracing::warn;

use crate::{
    dispatch::{Captures, Plugin, RuleSpec},
    domain::IncomingMessage,
    messaging::types::Reply,
    ports::{HttpQuery, JsonSource},
    Result,
};

const BRIDGES_URL: &str = "https://api.multco.us/bridges";
const UNAVAILABLE: &str = "the bridges are not talking to me right now";

/// Scheduled lifts of the Multnomah County drawbridges.
pub struct BridgesPlugin {
    http: Arc<dyn JsonSource>,
    token: String,
}

/// RFC 3339 timestamp rendered in Pacific time.
fn pacific(raw: &str) -> Option<String> {
    let t = DateTime::parse_from_rfc3339(raw).ok()?;
    Some(
        t.with_timezone(&Los_Angeles)
            .format("%Y-%m-%d %H:%M:%S%:z")
            .to_string(),
    )
}

impl BridgesPlugin {
    pub fn new(http: Arc<dyn JsonSource>, token: String) -> Self {
        Self { http, token }
    }

    fn query(&self, path: &str) -> HttpQuery {
        HttpQuery::get(format!("{BRIDGES_URL}{path}"))
            .param("access_token", &self.token)
            .header("Content-type", "application/json")
    }

    async fn scheduled(&self, bridge: &str) -> Vec<String> {
        let events = match self.http.fetch(self.query(&format!("/{bridge}/events"))).await {
            Ok(events) => events,
            Err(e) => {
                warn!("events for {bridge} unavailable: {e}");
                return Vec::new();
            }
        };

        let mut times: Vec<(DateTime<chrono::FixedOffset>, String)> = events
            .get("scheduledEvents")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|ev| ev.get("upTime").and_then(Value::as_str))
            .filter_map(|raw| Some((DateTime::parse_from_rfc3339(raw).ok()?, pacific(raw)?)))
            .collect();
        times.sort_by_key(|(t, _)| *t);
        times.into_iter().map(|(_, shown)| shown).collect()
    }

    async fn report(&self) -> String {
        let bridges = match self.http.fetch(self.query("")).await {
            Ok(Value::Array(bridges)) => bridges,
            Ok(_) => return UNAVAILABLE.to_string(),
            Err(e) => {
                warn!("bridge listing failed: {e}");
                return UNAVAILABLE.to_string();
            }
        };

        let mut out = Vec::new();
        for bridge in &bridges {
            let Some(name) = bridge.get("name").and_then(Value::as_str) else {
                continue;
            };
            out.push(format!("{name} scheduled events:"));
            let times = self.scheduled(name).await;
            if times.is_empty() {
                out.push("None".to_string());
            } else {
                out.extend(times.iter().map(|t| format!("- {t}")));
            }
        }

        if out.is_empty() {
            return UNAVAILABLE.to_string();
        }
        out.join("\n")
    }
}

#[async_trait]
impl Plugin for BridgesPlugin {
    fn name(&self) -> &'static str {
        "bridges"
    }

    fn rules(&self) -> Vec<RuleSpec> {
        vec![RuleSpec::mention("scheduled", r"^bridges\??$")
            .help("upcoming scheduled bridge lifts in Portland")]
    }

    async fn handle(
        &self,
        _action: &str,
        _msg: &IncomingMessage,
        _caps: &Captures,
    ) -> Result<Vec<Reply>> {
        Ok(vec![Reply::Reply(self.report().await)])
    }
}
