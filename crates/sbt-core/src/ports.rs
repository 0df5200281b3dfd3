//! Ports for external collaborators (HTTP APIs).
//!
//! Every third-party API the plugins talk to is reached through [`JsonSource`]: one
//! request in, one JSON document (or an error) out. Implementations must apply a bounded
//! timeout and map non-2xx statuses and undecodable bodies to
//! [`Error::CollaboratorUnavailable`](crate::Error::CollaboratorUnavailable).

use async_trait::async_trait;

use crate::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A single outbound HTTP request.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpQuery {
    pub method: HttpMethod,
    pub url: String,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl HttpQuery {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            params: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            params: Vec::new(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Value of a query parameter, if set.
    pub fn param_value(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Hexagonal port for "query → JSON or error" collaborators.
#[async_trait]
pub trait JsonSource: Send + Sync {
    async fn fetch(&self, query: HttpQuery) -> Result<serde_json::Value>;
}
