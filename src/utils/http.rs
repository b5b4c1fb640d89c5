//! HTTP request abstraction for endpoint snapshots
//!
//! [`HttpClient::execute`] returns `Err` only when no response was received.
//! Any status code, including 4xx and 5xx, is a successful exchange here.

use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Extra request parameters.
///
/// `params`, `data` and `timeout` are accepted as aliases of `query`, `body`
/// and `timeout_seconds`. Any other key is rejected.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RequestOptions {
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, alias = "params")]
    pub query: BTreeMap<String, String>,
    /// JSON request body
    #[serde(default)]
    pub json: Option<Value>,
    /// Raw text request body, ignored when `json` is set
    #[serde(default, alias = "data")]
    pub body: Option<String>,
    #[serde(default, alias = "timeout")]
    pub timeout_seconds: Option<u64>,
}

/// One request to issue
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub options: RequestOptions,
}

/// Received response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `application/json` or any `+json` media type, parameters ignored
    pub fn is_json(&self) -> bool {
        let Some(content_type) = &self.content_type else {
            return false;
        };
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        media_type == "application/json" || media_type.ends_with("+json")
    }
}

/// Abstraction for HTTP requests, enabling mocking in tests
pub trait HttpClient: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Blocking `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let method = Method::from_bytes(request.method.to_uppercase().as_bytes())
            .with_context(|| format!("Invalid HTTP method: {}", request.method))?;
        let options = &request.options;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(json) = &options.json {
            builder = builder.json(json);
        } else if let Some(body) = &options.body {
            builder = builder.body(body.clone());
        }
        if let Some(seconds) = options.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }

        debug!("{} {}", request.method, request.url);

        let response = builder
            .send()
            .with_context(|| format!("Request to {} failed", request.url))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .with_context(|| format!("Failed to read response body from {}", request.url))?;

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

/// A mock HTTP client for testing that records requests and returns configured responses
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Debug)]
    pub enum MockHttpResponse {
        Respond(HttpResponse),
        TransportError(String),
    }

    impl MockHttpResponse {
        /// A response with a JSON content type
        pub fn json(status: u16, body: &str) -> Self {
            MockHttpResponse::Respond(HttpResponse {
                status,
                content_type: Some("application/json".to_string()),
                body: body.to_string(),
            })
        }

        pub fn text(status: u16, body: &str) -> Self {
            MockHttpResponse::Respond(HttpResponse {
                status,
                content_type: Some("text/plain".to_string()),
                body: body.to_string(),
            })
        }
    }

    impl Default for MockHttpResponse {
        fn default() -> Self {
            MockHttpResponse::text(200, "")
        }
    }

    #[derive(Clone, Default)]
    pub struct MockHttpClient {
        pub requests: Arc<Mutex<Vec<HttpRequest>>>,
        /// url -> response
        responses: Arc<Mutex<HashMap<String, MockHttpResponse>>>,
        default_response: Arc<Mutex<MockHttpResponse>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn expect(self, url: &str, response: MockHttpResponse) -> Self {
            self.responses
                .lock()
                .unwrap()
                .insert(url.to_string(), response);
            self
        }

        pub fn with_default_response(self, response: MockHttpResponse) -> Self {
            *self.default_response.lock().unwrap() = response;
            self
        }

        pub fn get_requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl HttpClient for MockHttpClient {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let response = self
                .responses
                .lock()
                .unwrap()
                .get(&request.url)
                .cloned()
                .unwrap_or_else(|| self.default_response.lock().unwrap().clone());

            match response {
                MockHttpResponse::Respond(response) => Ok(response),
                MockHttpResponse::TransportError(message) => anyhow::bail!(message),
            }
        }
    }
}
