use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::{
    dispatch::{Captures, Plugin, RuleSpec},
    domain::IncomingMessage,
    messaging::types::Reply,
    plugins::random_weighted_index,
    ports::{HttpQuery, JsonSource},
    Result,
};

const SEARCH_URL: &str = "https://api.imgur.com/3/gallery/search";
const UNAVAILABLE: &str = "herp derp problems connecting to imgur API";
const NO_RESULTS: &str = "durrr no results found durrr";

pub struct ImgurPlugin {
    http: Arc<dyn JsonSource>,
    client_id: String,
}

/// `image` searches stills, `animate` searches gifs.
fn q_type(kind: &str) -> &'static str {
    if kind.eq_ignore_ascii_case("animate") {
        "anigif"
    } else {
        "png"
    }
}

impl ImgurPlugin {
    pub fn new(http: Arc<dyn JsonSource>, client_id: String) -> Self {
        Self { http, client_id }
    }

    async fn search(&self, kind: &str, query: &str, pick: impl FnOnce(usize) -> usize) -> String {
        let req = HttpQuery::get(SEARCH_URL)
            .param("q", query)
            .param("q_type", q_type(kind))
            .header("Authorization", format!("Client-ID {}", self.client_id));

        let body = match self.http.fetch(req).await {
            Ok(body) => body,
            Err(e) => {
                warn!("imgur search failed: {e}");
                return UNAVAILABLE.to_string();
            }
        };

        let Some(data) = body.get("data").and_then(Value::as_array) else {
            return UNAVAILABLE.to_string();
        };
        if data.is_empty() {
            return NO_RESULTS.to_string();
        }

        data.get(pick(data.len()))
            .and_then(|img| img.get("link"))
            .and_then(Value::as_str)
            .unwrap_or(NO_RESULTS)
            .to_string()
    }
}

#[async_trait]
impl Plugin for ImgurPlugin {
    fn name(&self) -> &'static str {
        "imgur"
    }

    fn rules(&self) -> Vec<RuleSpec> {
        vec![
            RuleSpec::listen("search", r"^(?P<kind>image|animate) (?P<query>.*)$")
                .requires(&["kind", "query"])
                .help("search imgur for a still or an animation. Example: animate otters"),
        ]
    }

    async fn handle(
        &self,
        _action: &str,
        _msg: &IncomingMessage,
        caps: &Captures,
    ) -> Result<Vec<Reply>> {
        let link = self
            .search(
                caps.get("kind").unwrap_or("image"),
                caps.get("query").unwrap_or_default(),
                random_weighted_index,
            )
            .await;
        Ok(vec![Reply::Reply(link)])
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::plugins::testing::FakeSource;

    #[tokio::test]
    async fn sends_type_and_client_id() {
        let src = Arc::new(FakeSource::new().route(
            "imgur.com",
            json!({"data": [{"link": "https://i.imgur.com/a.gif"}]}),
        ));
        let p = ImgurPlugin::new(src.clone(), "cid".into());
        assert_eq!(
            p.search("Animate", "otters", |_| 0).await,
            "https://i.imgur.com/a.gif"
        );

        let q = &src.queries()[0];
        assert_eq!(q.param_value("q_type"), Some("anigif"));
        assert_eq!(q.param_value("q"), Some("otters"));
        assert!(q
            .headers
            .contains(&("Authorization".to_string(), "Client-ID cid".to_string())));
    }

    #[tokio::test]
    async fn fallbacks() {
        let empty = Arc::new(FakeSource::new().route("imgur.com", json!({"data": []})));
        let p = ImgurPlugin::new(empty, "cid".into());
        assert_eq!(p.search("image", "nothing", |_| 0).await, NO_RESULTS);

        let down = ImgurPlugin::new(Arc::new(FakeSource::new()), "cid".into());
        assert_eq!(down.search("image", "cats", |_| 0).await, UNAVAILABLE);
    }
}
