#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Retrieval helpers for pull sources.
//!
//! [`HttpClient`] wraps a [`reqwest::Client`] with the handful of request
//! shapes parking upstreams need (JSON GET with query and headers, JSON
//! POST, plain text GET). [`html`] holds the CSS selection helpers used by
//! scraping sources. This crate knows nothing about parking records; it
//! hands back [`serde_json::Value`]s, strings and parsed documents.

pub mod html;

use std::time::Duration;

use serde_json::Value;

const USER_AGENT: &str = concat!("parkapi-sources-rs/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while retrieving upstream data.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// An HTTP request failed or returned an error status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Parsing the response failed.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A shared HTTP client for upstream retrieval.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Builds a client with the crate's user agent and request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the TLS backend cannot be
    /// initialised.
    pub fn new() -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    /// GETs `url` and decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] on transport failures, error statuses, bad
    /// header values and undecodable bodies.
    pub async fn get_json(
        &self,
        url: &str,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<Value, ScrapeError> {
        log::debug!("GET {url}");
        let request = self
            .client
            .get(url)
            .query(query)
            .headers(header_map(headers)?);
        let body = request.send().await?.error_for_status()?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// POSTs `body` as JSON and decodes the response as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] on transport failures, error statuses and
    /// undecodable bodies.
    pub async fn post_json(&self, url: &str, body: &Value) -> Result<Value, ScrapeError> {
        log::debug!("POST {url}");
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(body)?)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// GETs `url` and returns the body as text.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] on transport failures and error
    /// statuses.
    pub async fn get_text(&self, url: &str) -> Result<String, ScrapeError> {
        log::debug!("GET {url}");
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

fn header_map(headers: &[(&str, &str)]) -> Result<reqwest::header::HeaderMap, ScrapeError> {
    let mut map = reqwest::header::HeaderMap::new();
    for (key, value) in headers {
        let name = reqwest::header::HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| ScrapeError::Parse(format!("invalid header name '{key}': {e}")))?;
        let val = reqwest::header::HeaderValue::from_str(value)
            .map_err(|e| ScrapeError::Parse(format!("invalid header value for '{key}': {e}")))?;
        map.insert(name, val);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn get_json_sends_query_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sites"))
            .and(query_param("limit", "10"))
            .and(header("DB-Api-Key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let body = client
            .get_json(
                &format!("{}/sites", server.uri()),
                &[("limit", "10")],
                &[("DB-Api-Key", "secret")],
            )
            .await
            .unwrap();
        assert_eq!(body, json!({"ok": true}));
    }

    #[tokio::test]
    async fn post_json_round_trips_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api"))
            .and(body_json(json!({"action": "capacity"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2])))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let body = client
            .post_json(
                &format!("{}/api", server.uri()),
                &json!({"action": "capacity"}),
            )
            .await
            .unwrap();
        assert_eq!(body, json!([1, 2]));
    }

    #[tokio::test]
    async fn error_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let result = client.get_text(&server.uri()).await;
        assert!(matches!(result, Err(ScrapeError::Http(_))));
    }

    #[test]
    fn rejects_invalid_header_names() {
        assert!(matches!(
            header_map(&[("bad header", "x")]),
            Err(ScrapeError::Parse(_))
        ));
    }
}
