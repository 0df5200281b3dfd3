//! Built-in plugins.
//!
//! Store-backed plugins (counters, snorts, endorsements) surface business-rule failures
//! as [`Error`](crate::Error) values for the dispatcher to phrase. Collaborator-backed
//! plugins never do: any [`JsonSource`] failure becomes a fixed fallback line.

pub mod bridges;
pub mod counters;
pub mod covid;
pub mod endorsements;
pub mod giphy;
pub mod github;
pub mod imgur;
pub mod iss;
pub mod simple;
pub mod snorts;
pub mod urban;
pub mod weather;

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::info;

use crate::{
    config::Config,
    dispatch::{Plugin, Registry},
    ports::JsonSource,
    roster::Roster,
    store::{CounterStore, Db, EndorsementStore, SnortStore},
    Result,
};

/// Source of "today" for date-keyed plugins.
pub type Today = fn() -> NaiveDate;

pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Exponential draw with rate √2/2, truncated; anything past the end falls back to 0.
///
/// `sample` is uniform in `[0, 1)`. Keeps early search results the most likely pick.
pub fn weighted_index(sample: f64, len: usize) -> usize {
    let lambda = std::f64::consts::SQRT_2 / 2.0;
    let draw = -(1.0 - sample).ln() / lambda;
    let idx = if draw.is_finite() { draw as usize } else { 0 };
    if idx >= len {
        0
    } else {
        idx
    }
}

pub(crate) fn random_weighted_index(len: usize) -> usize {
    weighted_index(rand::random::<f64>(), len)
}

/// Every plugin the bot ships, in registration order.
///
/// Collaborators without credentials (weather, github, bridges) are left out.
pub fn standard_plugins(
    cfg: &Config,
    db: &Db,
    roster: Arc<Roster>,
    http: Arc<dyn JsonSource>,
) -> Vec<Arc<dyn Plugin>> {
    let mut plugins: Vec<Arc<dyn Plugin>> = vec![
        Arc::new(counters::CountersPlugin::new(CounterStore::new(db.clone()))),
        Arc::new(snorts::SnortsPlugin::new(
            SnortStore::new(db.clone()),
            roster.clone(),
        )),
        Arc::new(endorsements::EndorsementsPlugin::new(EndorsementStore::new(
            db.clone(),
        ))),
        Arc::new(simple::SimplePlugin::new(roster)),
        Arc::new(giphy::GiphyPlugin::new(
            http.clone(),
            cfg.giphy_api_key.clone(),
        )),
        Arc::new(imgur::ImgurPlugin::new(
            http.clone(),
            cfg.imgur_client_id.clone(),
        )),
        Arc::new(urban::UrbanPlugin::new(http.clone())),
        Arc::new(iss::IssPlugin::new(
            http.clone(),
            cfg.iss_longitude,
            cfg.iss_latitude,
        )),
        Arc::new(covid::CovidPlugin::new()),
    ];

    match &cfg.owm_api_key {
        Some(key) => plugins.push(Arc::new(weather::WeatherPlugin::new(
            http.clone(),
            key.clone(),
        ))),
        None => info!("OWM_API_KEY not set, weather plugin disabled"),
    }
    match &cfg.github {
        Some(gh) => plugins.push(Arc::new(github::GithubPlugin::new(
            http.clone(),
            gh.clone(),
        ))),
        None => info!("GITHUB_OWNER/GITHUB_REPO not set, github plugin disabled"),
    }
    match &cfg.multco_token {
        Some(token) => plugins.push(Arc::new(bridges::BridgesPlugin::new(
            http,
            token.clone(),
        ))),
        None => info!("MULTCO_TOKEN not set, bridges plugin disabled"),
    }

    plugins
}

/// Compile every plugin's rules into one registry.
pub fn build_registry(plugins: Vec<Arc<dyn Plugin>>) -> Result<Registry> {
    let mut registry = Registry::new();
    for plugin in plugins {
        registry.register(plugin)?;
    }
    info!("Registered {} rules", registry.len());
    Ok(registry)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::{
        dispatch::Captures,
        domain::{ChatId, IncomingMessage, MessageId, MessageRef, Sender, UserId},
        errors::Error,
        ports::{HttpQuery, JsonSource},
        Result,
    };

    /// Canned responses keyed by URL substring; unmatched URLs fail like a 503.
    #[derive(Default)]
    pub struct FakeSource {
        routes: Vec<(String, Value)>,
        pub seen: Mutex<Vec<HttpQuery>>,
    }

    impl FakeSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn route(mut self, url_part: &str, body: Value) -> Self {
            self.routes.push((url_part.to_string(), body));
            self
        }

        pub fn queries(&self) -> Vec<HttpQuery> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JsonSource for FakeSource {
        async fn fetch(&self, query: HttpQuery) -> Result<Value> {
            self.seen.lock().unwrap().push(query.clone());
            self.routes
                .iter()
                .find(|(part, _)| query.url.contains(part.as_str()))
                .map(|(_, body)| body.clone())
                .ok_or_else(|| Error::CollaboratorUnavailable(format!("503 for {}", query.url)))
        }
    }

    pub fn message(text: &str) -> IncomingMessage {
        IncomingMessage {
            message: MessageRef {
                chat_id: ChatId(-42),
                message_id: MessageId(3),
            },
            sender: Sender {
                user_id: UserId(7),
                username: Some("Amy".into()),
            },
            text: text.to_string(),
            addressed: Some(text.to_string()),
        }
    }

    pub fn caps(pairs: &[(&str, &str)]) -> Captures {
        Captures::from_pairs(pairs.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_index_stays_in_bounds() {
        assert_eq!(weighted_index(0.0, 10), 0);
        assert_eq!(weighted_index(0.5, 10), 0);
        assert_eq!(weighted_index(0.9, 10), 3);
        // 3 is past the end of a 3-element list.
        assert_eq!(weighted_index(0.9, 3), 0);
        assert_eq!(weighted_index(0.9, 4), 3);
        assert_eq!(weighted_index(0.999_999, 1), 0);
    }

    #[test]
    fn standard_plugins_skip_unconfigured_collaborators() {
        let cfg = Config::from_token("t");
        let db = Db::open_in_memory().unwrap();
        let http: Arc<dyn JsonSource> = Arc::new(testing::FakeSource::new());
        let names: Vec<&str> = standard_plugins(&cfg, &db, Arc::new(Roster::new()), http)
            .iter()
            .map(|p| p.name())
            .collect();
        assert!(names.contains(&"counters"));
        assert!(names.contains(&"giphy"));
        assert!(!names.contains(&"weather"));
        assert!(!names.contains(&"github"));
        assert!(!names.contains(&"bridges"));
    }
}
