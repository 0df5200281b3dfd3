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

const SEARCH_URL: &str = "http://api.giphy.com/v1/gifs/search";
const UNAVAILABLE: &str = "herp derp problems connecting to giphy API";
const NO_RESULTS: &str = "http://media2.giphy.com/media/rGcopDCOTAW8o/200.gif";

pub struct GiphyPlugin {
    http: Arc<dyn JsonSource>,
    api_key: String,
}

impl GiphyPlugin {
    pub fn new(http: Arc<dyn JsonSource>, api_key: String) -> Self {
        Self { http, api_key }
    }

    async fn search(&self, query: &str, pick: impl FnOnce(usize) -> usize) -> String {
        let req = HttpQuery::get(SEARCH_URL)
            .param("q", query)
            .param("api_key", &self.api_key);

        let body = match self.http.fetch(req).await {
            Ok(body) => body,
            Err(e) => {
                warn!("giphy search failed: {e}");
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
            .and_then(|gif| gif.pointer("/images/fixed_height/url"))
            .and_then(Value::as_str)
            .unwrap_or(UNAVAILABLE)
            .to_string()
    }
}

#[async_trait]
impl Plugin for GiphyPlugin {
    fn name(&self) -> &'static str {
        "giphy"
    }

    fn rules(&self) -> Vec<RuleSpec> {
        vec![RuleSpec::listen("search", r"^giphy (?P<query>.*)$")
            .requires(&["query"])
            .help("request a giphy search, results weighted for relevance. Example: giphy your mom")]
    }

    async fn handle(
        &self,
        _action: &str,
        _msg: &IncomingMessage,
        caps: &Captures,
    ) -> Result<Vec<Reply>> {
        let query = caps.get("query").unwrap_or_default();
        Ok(vec![Reply::Reply(
            self.search(query, random_weighted_index).await,
        )])
    }
}
