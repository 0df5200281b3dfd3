//! HTTP adapter for third-party JSON APIs.
//!
//! Every plugin collaborator (Giphy, Imgur, Urban Dictionary, OpenWeatherMap, GitHub,
//! Open Notify, Multnomah County bridges) goes through [`HttpJsonSource`].

use std::time::Duration;

use async_trait::async_trait;
use sbt_core::{
    errors::Error,
    ports::{HttpMethod, HttpQuery, JsonSource},
    Result,
};
use tracing::debug;

const USER_AGENT: &str = concat!("sbt/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug)]
pub struct HttpJsonSource {
    http: reqwest::Client,
}

impl HttpJsonSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::External(format!("http client build error: {e}")))?;
        Ok(Self { http })
    }

    fn request(&self, query: &HttpQuery) -> reqwest::RequestBuilder {
        let mut req = match query.method {
            HttpMethod::Get => self.http.get(&query.url),
            HttpMethod::Post => self.http.post(&query.url),
        };
        if !query.params.is_empty() {
            req = req.query(&query.params);
        }
        for (k, v) in &query.headers {
            req = req.header(k.as_str(), v.as_str());
        }
        if let Some(body) = &query.body {
            req = req.json(body);
        }
        req
    }
}

#[async_trait]
impl JsonSource for HttpJsonSource {
    async fn fetch(&self, query: HttpQuery) -> Result<serde_json::Value> {
        debug!(method = ?query.method, url = %query.url, "collaborator request");

        let resp = self.request(&query).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(format!("{}: {e}", query.url))
            } else {
                Error::CollaboratorUnavailable(format!("{} request error: {e}", query.url))
            }
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::CollaboratorUnavailable(format!(
                "{} returned {status} {}",
                query.url,
                body.chars().take(200).collect::<String>()
            )));
        }

        resp.json()
            .await
            .map_err(|e| Error::CollaboratorUnavailable(format!("{} json error: {e}", query.url)))
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn builds_get_with_params_and_headers() {
        let src = HttpJsonSource::new(Duration::from_secs(5)).unwrap();
        let q = HttpQuery::get("http://example.invalid/search")
            .param("q", "cats & dogs")
            .param("api_key", "k")
            .header("Authorization", "Client-ID abc");
        let req = src.request(&q).build().unwrap();

        assert_eq!(req.method(), reqwest::Method::GET);
        assert_eq!(
            req.url().as_str(),
            "http://example.invalid/search?q=cats+%26+dogs&api_key=k"
        );
        assert_eq!(req.headers()["Authorization"], "Client-ID abc");
        assert!(req.body().is_none());
    }

    #[test]
    fn builds_post_with_json_body() {
        let src = HttpJsonSource::new(Duration::from_secs(5)).unwrap();
        let q = HttpQuery::post(
            "http://example.invalid/issues",
            serde_json::json!({"title": "t"}),
        );
        let req = src.request(&q).build().unwrap();

        assert_eq!(req.method(), reqwest::Method::POST);
        assert_eq!(req.headers()["content-type"], "application/json");
        assert_eq!(
            req.body().and_then(|b| b.as_bytes()),
            Some(br#"{"title":"t"}"#.as_slice())
        );
    }

    #[tokio::test]
    async fn unreachable_host_is_unavailable() {
        let src = HttpJsonSource::new(Duration::from_secs(2)).unwrap();
        let err = src
            .fetch(HttpQuery::get("http://127.0.0.1:9/nothing"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::CollaboratorUnavailable(_) | Error::Timeout(_)
        ));
    }

    async fn serve(status: u16, body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(
                ResponseTemplate::new(status).set_body_raw(body.to_string(), "application/json"),
            )
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn parses_a_json_body() {
        let server = serve(200, r#"{"list": [1, 2]}"#).await;
        let src = HttpJsonSource::new(Duration::from_secs(5)).unwrap();
        let body = src
            .fetch(HttpQuery::get(format!("{}/api", server.uri())))
            .await
            .unwrap();
        assert_eq!(body, serde_json::json!({"list": [1, 2]}));
    }

    #[tokio::test]
    async fn error_status_is_unavailable() {
        let server = serve(503, r#"{"message": "down for maintenance"}"#).await;
        let src = HttpJsonSource::new(Duration::from_secs(5)).unwrap();
        let err = src
            .fetch(HttpQuery::get(format!("{}/api", server.uri())))
            .await
            .unwrap_err();
        match err {
            Error::CollaboratorUnavailable(detail) => {
                assert!(detail.contains("503"), "{detail}");
                assert!(detail.contains("down for maintenance"), "{detail}");
            }
            other => panic!("expected CollaboratorUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_json_is_unavailable() {
        let server = serve(200, "<html>not json</html>").await;
        let src = HttpJsonSource::new(Duration::from_secs(5)).unwrap();
        let err = src
            .fetch(HttpQuery::get(format!("{}/api", server.uri())))
            .await
            .unwrap_err();
        match err {
            Error::CollaboratorUnavailable(detail) => {
                assert!(detail.contains("json error"), "{detail}")
            }
            other => panic!("expected CollaboratorUnavailable, got {other:?}"),
        }
    }
}
