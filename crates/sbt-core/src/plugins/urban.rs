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

const DEFINE_URL: &str = "http://api.urbandictionary.com/v0/define";
const STUPID: &str = "That's a stupid search!";
const NO_SUCH: &str = "No such definition number!";
const UNAVAILABLE: &str = "urban dictionary is not talking to me right now";

/// Urban Dictionary lookups: `urban <term> [#n]`.
pub struct UrbanPlugin {
    http: Arc<dyn JsonSource>,
}

impl UrbanPlugin {
    pub fn new(http: Arc<dyn JsonSource>) -> Self {
        Self { http }
    }

    /// `which` is 1-based.
    async fn define(&self, term: &str, which: usize) -> String {
        let req = HttpQuery::get(DEFINE_URL).param("term", term.trim());
        let body = match self.http.fetch(req).await {
            Ok(body) => body,
            Err(e) => {
                warn!("urban dictionary lookup failed: {e}");
                return UNAVAILABLE.to_string();
            }
        };

        let list = match body.get("list").and_then(Value::as_array) {
            Some(list) if list.is_empty() => return STUPID.to_string(),
            Some(list) => list,
            None => {
                warn!("urban dictionary answered without a definition list");
                return UNAVAILABLE.to_string();
            }
        };

        which
            .checked_sub(1)
            .and_then(|i| list.get(i))
            .and_then(|entry| entry.get("definition"))
            .and_then(Value::as_str)
            .unwrap_or(NO_SUCH)
            .to_string()
    }
}

#[async_trait]
impl Plugin for UrbanPlugin {
    fn name(&self) -> &'static str {
        "urban"
    }

    fn rules(&self) -> Vec<RuleSpec> {
        vec![
            RuleSpec::mention("define", r"^urban\s(?P<term>[\w\s-]+?)(\s#(?P<which>\d+))?$")
                .requires(&["term"])
                .help("look something up on urban dictionary. Example: urban yeet #2"),
        ]
    }

    async fn handle(
        &self,
        _action: &str,
        _msg: &IncomingMessage,
        caps: &Captures,
    ) -> Result<Vec<Reply>> {
        let which = caps
            .get("which")
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(1);
        let text = self
            .define(caps.get("term").unwrap_or_default(), which)
            .await;
        Ok(vec![Reply::Reply(text)])
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::plugins::testing::{caps, message, FakeSource};

    fn plugin() -> (UrbanPlugin, Arc<FakeSource>) {
        let src = Arc::new(FakeSource::new().route(
            "urbandictionary",
            json!({"list": [{"definition": "first"}, {"definition": "second"}]}),
        ));
        (UrbanPlugin::new(src.clone()), src)
    }

    #[tokio::test]
    async fn numbered_definitions() {
        let (p, src) = plugin();
        assert_eq!(p.define("big mood", 1).await, "first");
        assert_eq!(p.define("big mood", 2).await, "second");
        assert_eq!(p.define("big mood", 3).await, NO_SUCH);
        assert_eq!(p.define("big mood", 0).await, NO_SUCH);
        assert_eq!(src.queries()[0].param_value("term"), Some("big mood"));
    }

    #[tokio::test]
    async fn handle_parses_the_number() {
        let (p, _) = plugin();
        let out = p
            .handle(
                "define",
                &message("urban big mood #2"),
                &caps(&[("term", "big mood"), ("which", "2")]),
            )
            .await
            .unwrap();
        assert_eq!(out, vec![Reply::Reply("second".into())]);
    }

    #[tokio::test]
    async fn nothing_found_is_a_stupid_search() {
        let empty = UrbanPlugin::new(Arc::new(
            FakeSource::new().route("urbandictionary", json!({"list": []})),
        ));
        assert_eq!(empty.define("asdfgh", 1).await, STUPID);
    }

    #[tokio::test]
    async fn outages_do_not_blame_the_search() {
        let down = UrbanPlugin::new(Arc::new(FakeSource::new()));
        assert_eq!(down.define("big mood", 1).await, UNAVAILABLE);

        let garbled = UrbanPlugin::new(Arc::new(
            FakeSource::new().route("urbandictionary", json!({"error": "nope"})),
        ));
        assert_eq!(garbled.define("big mood", 1).await, UNAVAILABLE);
    }
}
