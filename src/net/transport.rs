//! Wire-level request execution.
//!
//! ARCHITECTURE
//! ============
//! `ApiClient` owns request policy (CSRF header, retry, status
//! classification); a `Transport` only moves bytes. The production transport
//! is a `reqwest::Client` sharing one cookie jar with the CSRF manager, so
//! the session cookie and CSRF cookie flow on every request.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::cookie::Jar;
use reqwest::header::{CONTENT_TYPE, HeaderValue, ORIGIN, REFERER};
use url::Url;

use crate::config::ClientConfig;
use crate::error::ApiError;

pub const CSRF_HEADER: &str = "X-CSRFToken";

/// A request ready to go on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub csrf_token: Option<String>,
    pub body: Option<serde_json::Value>,
}

/// Status and body of a completed exchange, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes one HTTP exchange. Enables scripting the server in tests.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the response, even for non-2xx statuses.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] when no response was received.
    async fn execute(&self, request: &OutboundRequest) -> Result<RawResponse, ApiError>;
}

// =============================================================================
// REQWEST TRANSPORT
// =============================================================================

pub struct ReqwestTransport {
    http: reqwest::Client,
    origin: Option<HeaderValue>,
}

impl ReqwestTransport {
    /// Build a transport whose cookies live in `jar`.
    ///
    /// # Errors
    ///
    /// Returns an error if the origin is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &ClientConfig, jar: Arc<Jar>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .cookie_provider(jar)
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let origin = config
            .origin
            .as_deref()
            .map(HeaderValue::from_str)
            .transpose()
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        Ok(Self { http, origin })
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &OutboundRequest) -> Result<RawResponse, ApiError> {
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = &request.csrf_token {
            builder = builder.header(CSRF_HEADER, token);
        }
        if let Some(origin) = &self.origin {
            builder = builder.header(ORIGIN, origin.clone()).header(REFERER, origin.clone());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(RawResponse { status, body })
    }
}
