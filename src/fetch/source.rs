//! Candidate sources an artifact can be retrieved from.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;

use super::car::extract_json;
use super::FetchError;

/// Accept header sent to every candidate
pub const ACCEPT_ANY_PAYLOAD: &str = "application/json, application/octet-stream, */*";

/// One retrieval strategy in the fallback chain
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Human-readable identifier reported as `source_used`
    fn label(&self) -> &str;

    /// Retrieve and decode the payload for `cid`
    async fn retrieve(&self, cid: &str) -> Result<Value, FetchError>;
}

/// Where an HTTP source points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// A full URL supplied by the caller, used as-is
    Direct(String),
    /// A gateway prefix the CID is appended to
    Gateway(String),
}

/// An HTTP candidate bounded by its own timeout
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    endpoint: Endpoint,
    timeout: Duration,
}

impl HttpSource {
    pub fn direct(client: Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: Endpoint::Direct(url.into()),
            timeout,
        }
    }

    pub fn gateway(client: Client, prefix: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: Endpoint::Gateway(prefix.into()),
            timeout,
        }
    }

    /// Request URL for `cid`
    pub fn url_for(&self, cid: &str) -> String {
        match &self.endpoint {
            Endpoint::Direct(url) => url.clone(),
            Endpoint::Gateway(prefix) => format!("{}{}", prefix, cid),
        }
    }

    async fn download(&self, url: &str) -> Result<(Option<String>, Vec<u8>), FetchError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, ACCEPT_ANY_PAYLOAD)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;
        Ok((content_type, body.to_vec()))
    }
}

#[async_trait]
impl ArtifactSource for HttpSource {
    fn label(&self) -> &str {
        match &self.endpoint {
            Endpoint::Direct(url) | Endpoint::Gateway(url) => url,
        }
    }

    async fn retrieve(&self, cid: &str) -> Result<Value, FetchError> {
        let url = self.url_for(cid);
        let (content_type, body) = tokio::time::timeout(self.timeout, self.download(&url))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;

        decode_payload(content_type.as_deref(), &body)
    }
}

/// Decode a successful response body.
///
/// HTML error pages are rejected; a declared JSON content type is parsed
/// directly; anything else is tried as JSON and then as a binary container.
pub fn decode_payload(content_type: Option<&str>, body: &[u8]) -> Result<Value, FetchError> {
    if looks_like_html(body) {
        return Err(FetchError::HtmlErrorPage);
    }

    let declared_json = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false);
    if declared_json {
        return serde_json::from_slice(body).map_err(FetchError::Json);
    }

    if let Ok(value) = serde_json::from_slice(body) {
        return Ok(value);
    }
    extract_json(body).ok_or(FetchError::NoEmbeddedJson)
}

fn looks_like_html(body: &[u8]) -> bool {
    let head = &body[..body.len().min(64)];
    let text = String::from_utf8_lossy(head);
    text.trim_start().to_ascii_lowercase().starts_with("<!doctype")
}
