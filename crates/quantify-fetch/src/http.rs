//! HTTP transport seam: requests, responses and the reqwest-backed sender.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::FetchError;

pub const USER_AGENT: &str = concat!(
    "quantify/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/quantify-commons/quantify)"
);

/// Query parameters whose values never appear in logs or errors.
const SECRET_PARAMS: &[&str] = &["key", "token", "access_token", "api_key"];

/// A GET request: URL, query pairs and extra headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn query(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// URL with its query string, secrets masked.
    pub fn display_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let pairs: Vec<String> = self
            .query
            .iter()
            .map(|(k, v)| {
                if SECRET_PARAMS.contains(&k.as_str()) {
                    format!("{k}=***")
                } else {
                    format!("{k}={v}")
                }
            })
            .collect();
        format!("{}?{}", self.url, pairs.join("&"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request and returns whatever the server answered. Status codes
/// are not interpreted here; only failures to get a response are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, FetchError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, FetchError> {
        let network = |e: reqwest::Error| FetchError::Network {
            url: request.display_url(),
            message: e.without_url().to_string(),
        };

        let mut builder = self.client.get(&request.url).query(&request.query);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        debug!(url = %request.display_url(), "GET");
        let resp = builder.send().await.map_err(network)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(network)?;
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_url_masks_secrets() {
        let req = ApiRequest::get("https://www.googleapis.com/customsearch/v1")
            .query("key", "s3cret")
            .query("cx", "engine")
            .query("q", "\"creativecommons.org/licenses/by/4.0\"");
        let shown = req.display_url();
        assert!(!shown.contains("s3cret"));
        assert!(shown.contains("key=***"));
        assert!(shown.contains("cx=engine"));
        assert_eq!(req.query_value("cx"), Some("engine"));
    }

    #[test]
    fn display_url_without_query() {
        let req = ApiRequest::get("https://en.wikipedia.org/w/api.php");
        assert_eq!(req.display_url(), "https://en.wikipedia.org/w/api.php");
    }

    #[test]
    fn user_agent_names_the_tool() {
        assert!(USER_AGENT.starts_with("quantify/"));
    }

    #[test]
    fn transport_builds() {
        assert!(HttpTransport::new(USER_AGENT, Duration::from_secs(5)).is_ok());
    }
}
