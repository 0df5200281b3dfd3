use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::{
    config::GithubConfig,
    dispatch::{Captures, Plugin, RuleSpec},
    domain::IncomingMessage,
    messaging::types::Reply,
    ports::{HttpQuery, JsonSource},
    Result,
};

const UNAVAILABLE: &str = "github is not talking to me right now";

/// Lists and files issues on one configured repository.
pub struct GithubPlugin {
    http: Arc<dyn JsonSource>,
    cfg: GithubConfig,
}

#[derive(Debug, Deserialize)]
struct Issue {
    html_url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

impl Issue {
    fn render(&self, expanded: bool) -> String {
        if !expanded {
            return self.html_url.clone();
        }
        format!(
            "Issue: {}\nTitle: {}\nDescription: {}",
            self.html_url,
            self.title.as_deref().unwrap_or_default(),
            self.body.as_deref().unwrap_or_default()
        )
    }
}

impl GithubPlugin {
    pub fn new(http: Arc<dyn JsonSource>, cfg: GithubConfig) -> Self {
        Self { http, cfg }
    }

    fn issues_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/issues",
            self.cfg.url.trim_end_matches('/'),
            self.cfg.owner,
            self.cfg.repo
        )
    }

    fn authorize(&self, q: HttpQuery) -> HttpQuery {
        let q = q.header("Accept", "application/vnd.github+json");
        match &self.cfg.token {
            Some(token) => q.header("Authorization", format!("token {token}")),
            None => q,
        }
    }

    async fn list(&self, state: Option<&str>, expanded: bool) -> Vec<Reply> {
        let mut req = HttpQuery::get(self.issues_url());
        if let Some(state) = state {
            req = req.param("state", state.to_lowercase());
        }

        let issues: Vec<Issue> = match self.http.fetch(self.authorize(req)).await {
            Ok(body) => match serde_json::from_value(body) {
                Ok(issues) => issues,
                Err(e) => {
                    warn!("unexpected github issue listing: {e}");
                    return vec![Reply::Reply(UNAVAILABLE.to_string())];
                }
            },
            Err(e) => {
                warn!("github issue listing failed: {e}");
                return vec![Reply::Reply(UNAVAILABLE.to_string())];
            }
        };

        if issues.is_empty() {
            return vec![Reply::Reply("0 issues found.".to_string())];
        }

        issues
            .iter()
            .map(|issue| Reply::Reply(issue.render(expanded)))
            .collect()
    }

    async fn create(&self, title: &str, body: &str) -> String {
        let req = HttpQuery::post(
            self.issues_url(),
            json!({ "title": title, "body": body }),
        );
        match self.http.fetch(self.authorize(req)).await {
            Ok(created) => match created.get("html_url").and_then(Value::as_str) {
                Some(url) => url.to_string(),
                None => UNAVAILABLE.to_string(),
            },
            Err(e) => {
                warn!("github issue creation failed: {e}");
                UNAVAILABLE.to_string()
            }
        }
    }
}

#[async_trait]
impl Plugin for GithubPlugin {
    fn name(&self) -> &'static str {
        "github"
    }

    fn rules(&self) -> Vec<RuleSpec> {
        vec![
            RuleSpec::mention(
                "list",
                r"^github\slist\sissues?(\s(?P<state>open|closed))?(?P<expanded>\sexpanded)?$",
            )
            .help("list issues on the bot's repo. Example: github list issues closed expanded"),
            RuleSpec::mention(
                "create",
                r#"^github\screate\sissue\s(title\s)?"(?P<title>[^"]*)"\s(body\s)?"(?P<body>.*)"$"#,
            )
            .requires(&["title", "body"])
            .help(r#"file an issue. Example: github create issue title "it broke" body "how?""#),
        ]
    }

    async fn handle(
        &self,
        action: &str,
        _msg: &IncomingMessage,
        caps: &Captures,
    ) -> Result<Vec<Reply>> {
        Ok(match action {
            "list" => {
                self.list(caps.get("state"), caps.has("expanded"))
                    .await
            }
            "create" => vec![Reply::Reply(
                self.create(
                    caps.get("title").unwrap_or_default(),
                    caps.get("body").unwrap_or_default(),
                )
                .await,
            )],
            _ => Vec::new(),
        })
    }
}
