use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone};
use chrono_tz::America::Los_Angeles;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    dispatch::{Captures, Plugin, RuleSpec},
    domain::IncomingMessage,
    messaging::types::Reply,
    ports::{HttpQuery, JsonSource},
    Result,
};

const PASS_URL: &str = "http://api.open-notify.org/iss-pass.json";
const NOW_URL: &str = "http://api.open-notify.org/iss-now.json";
const NO_PASS: &str = "nobody knows anything about a space station";
const NO_POSITION: &str = "nobody knows where it is";

/// International Space Station passes and position.
pub struct IssPlugin {
    http: Arc<dyn JsonSource>,
    longitude: f64,
    latitude: f64,
}

fn pacific(ts: i64) -> Option<String> {
    let utc = DateTime::from_timestamp(ts, 0)?;
    Some(
        Los_Angeles
            .from_utc_datetime(&utc.naive_utc())
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
    )
}

/// Accepts coordinates as JSON numbers or numeric strings.
fn coord(v: &Value) -> Option<f64> {
    v.as_f64().or_else(|| v.as_str()?.trim().parse().ok())
}

fn hemisphere(value: f64, pos: &str, neg: &str) -> String {
    format!("{} {}", value.abs(), if value >= 0.0 { pos } else { neg })
}

impl IssPlugin {
    pub fn new(http: Arc<dyn JsonSource>, longitude: f64, latitude: f64) -> Self {
        Self {
            http,
            longitude,
            latitude,
        }
    }

    async fn next_pass(&self, longitude: f64, latitude: f64) -> String {
        let req = HttpQuery::get(PASS_URL)
            .param("lat", latitude.to_string())
            .param("lon", longitude.to_string());

        let body = match self.http.fetch(req).await {
            Ok(body) => body,
            Err(e) => {
                info!("iss pass lookup failed: {e}");
                return NO_PASS.to_string();
            }
        };

        match body.get("message").and_then(Value::as_str) {
            Some("success") => {}
            Some("failure") => {
                return body
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or(NO_PASS)
                    .to_string();
            }
            _ => {
                info!("iss pass api did not report success");
                return NO_PASS.to_string();
            }
        }

        let pass = body.pointer("/response/0");
        let rise = pass.and_then(|p| p.get("risetime")).and_then(Value::as_i64);
        let duration = pass.and_then(|p| p.get("duration")).and_then(Value::as_i64);
        let (Some(rise), Some(duration)) = (rise, duration) else {
            return NO_PASS.to_string();
        };

        let end = rise.saturating_add(duration);
        match (pacific(rise), pacific(end)) {
            (Some(from), Some(until)) => format!("Next pass from {from} until {until}"),
            _ => NO_PASS.to_string(),
        }
    }

    async fn current_location(&self) -> String {
        let body = match self.http.fetch(HttpQuery::get(NOW_URL)).await {
            Ok(body) => body,
            Err(e) => {
                warn!("iss position lookup failed: {e}");
                return NO_POSITION.to_string();
            }
        };
        if body.get("message").and_then(Value::as_str) != Some("success") {
            return NO_POSITION.to_string();
        }

        let lon = body.pointer("/iss_position/longitude").and_then(coord);
        let lat = body.pointer("/iss_position/latitude").and_then(coord);
        match (lon, lat) {
            (Some(lon), Some(lat)) => format!(
                "The ISS is at {}, {}",
                hemisphere(lon, "E", "W"),
                hemisphere(lat, "N", "S")
            ),
            _ => NO_POSITION.to_string(),
        }
    }
}

#[async_trait]
impl Plugin for IssPlugin {
    fn name(&self) -> &'static str {
        "iss"
    }

    fn rules(&self) -> Vec<RuleSpec> {
        vec![
            RuleSpec::mention("where", r"(^|\s)iss\?$")
                .help("where is the ISS right now? Examples: iss?, where is the iss?"),
            RuleSpec::mention(
                "pass",
                r"^iss(\s+(?P<lon>-?\d+\.\d+),?\s(?P<lat>-?\d+\.\d+))?\s*$",
            )
            .help("when will the ISS pass over? Examples: iss, iss -122.5, 45.4"),
        ]
    }

    async fn handle(
        &self,
        action: &str,
        _msg: &IncomingMessage,
        caps: &Captures,
    ) -> Result<Vec<Reply>> {
        let text = match action {
            "where" => self.current_location().await,
            "pass" => {
                let lon = caps.get("lon").and_then(|v| v.parse::<f64>().ok());
                let lat = caps.get("lat").and_then(|v| v.parse::<f64>().ok());
                self.next_pass(
                    lon.unwrap_or(self.longitude),
                    lat.unwrap_or(self.latitude),
                )
                .await
            }
            _ => return Ok(Vec::new()),
        };
        Ok(vec![Reply::Reply(text)])
    }
}
