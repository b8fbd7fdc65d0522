//! HTTP client for the task-management REST API.
//!
//! REQUEST POLICY
//! ==============
//! - Mutating verbs carry `X-CSRFToken`; a missing token is refreshed before
//!   sending and its absence after refresh fails locally.
//! - A 403 carrying a CSRF marker is retried exactly once with a refreshed
//!   token. Whatever the retry returns is classified and handed back.
//! - 401 is never retried.
//!
//! Every non-2xx status is turned into an [`ApiError`] here, once.

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;

use std::sync::Arc;

use reqwest::Method;
use reqwest::cookie::Jar;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::csrf::{CSRF_TOKEN_PATH, CsrfTokenManager, TransportTokenIssuer};
use super::transport::{OutboundRequest, RawResponse, ReqwestTransport, Transport};
use crate::config::ClientConfig;
use crate::error::{ApiError, FieldErrors};

/// Query parameters as ordered key/value pairs.
pub type Query = Vec<(&'static str, String)>;

pub struct ApiClient {
    base: Url,
    transport: Arc<dyn Transport>,
    csrf: CsrfTokenManager,
}

impl ApiClient {
    /// Build the production client: one cookie jar shared by the `reqwest`
    /// transport and the CSRF manager.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let jar = Arc::new(Jar::default());
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(config, Arc::clone(&jar))?);
        let token_url = join_path(&config.api_url, CSRF_TOKEN_PATH)?;
        let issuer = Arc::new(TransportTokenIssuer::new(Arc::clone(&transport), token_url));
        let csrf = CsrfTokenManager::new(
            jar,
            config.api_url.clone(),
            config.csrf_cookie.clone(),
            issuer,
            config.csrf_settle,
        );
        Ok(Self::from_parts(config.api_url.clone(), transport, csrf))
    }

    #[must_use]
    pub fn from_parts(base: Url, transport: Arc<dyn Transport>, csrf: CsrfTokenManager) -> Self {
        Self { base, transport, csrf }
    }

    #[must_use]
    pub fn csrf(&self) -> &CsrfTokenManager {
        &self.csrf
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Send a request and return the 2xx response.
    ///
    /// # Errors
    ///
    /// Returns the classified error for any non-2xx status, transport
    /// failure, or missing CSRF token on a mutating request.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<RawResponse, ApiError> {
        let mut url = join_path(&self.base, path)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        let csrf_token = if is_mutating(&method) { Some(self.ensure_token().await?) } else { None };
        let mut request = OutboundRequest { method, url, csrf_token, body };

        tracing::debug!(method = %request.method, path = request.url.path(), "api request");
        let response = self.transport.execute(&request).await?;
        if !is_csrf_rejection(&response) {
            return classify(response);
        }

        tracing::warn!(method = %request.method, path = request.url.path(), "CSRF rejected, refreshing token and retrying once");
        request.csrf_token = Some(self.csrf.refresh_token().await.ok_or(ApiError::CsrfUnavailable)?);
        let retried = self.transport.execute(&request).await?;
        classify(retried)
    }

    async fn ensure_token(&self) -> Result<String, ApiError> {
        if let Some(token) = self.csrf.get_token() {
            return Ok(token);
        }
        self.csrf.refresh_token().await.ok_or(ApiError::CsrfUnavailable)
    }

    /// # Errors
    ///
    /// See [`ApiClient::request`]; also fails if the body does not decode.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        let response = self.request(Method::GET, path, query, None).await?;
        decode(&response)
    }

    /// # Errors
    ///
    /// See [`ApiClient::request`]; also fails if the body does not decode.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::POST, path, &[], Some(serde_json::to_value(body)?))
            .await?;
        decode(&response)
    }

    /// # Errors
    ///
    /// See [`ApiClient::request`]; also fails if the body does not decode.
    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::PATCH, path, &[], Some(serde_json::to_value(body)?))
            .await?;
        decode(&response)
    }

    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.request(Method::DELETE, path, &[], None).await?;
        Ok(())
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Append `path` to the base URL, keeping the base's own path prefix.
pub(crate) fn join_path(base: &Url, path: &str) -> Result<Url, ApiError> {
    let path = path.trim_start_matches('/');
    let joined = format!("{}/{path}", base.as_str().trim_end_matches('/'));
    Url::parse(&joined).map_err(|e| ApiError::InvalidUrl(format!("{joined}: {e}")))
}

pub(crate) fn is_mutating(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

/// 403 whose body names CSRF as the reason.
pub(crate) fn is_csrf_rejection(response: &RawResponse) -> bool {
    response.status == 403 && response.body.to_ascii_lowercase().contains("csrf")
}

fn detail_of(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_owned))
        .unwrap_or_else(|| body.trim().to_owned())
}

pub(crate) fn classify(response: RawResponse) -> Result<RawResponse, ApiError> {
    match response.status {
        200..=299 => Ok(response),
        400 => Err(ApiError::Validation(FieldErrors::from_body(&response.body))),
        401 => Err(ApiError::Unauthenticated),
        403 => Err(ApiError::Forbidden { csrf: is_csrf_rejection(&response), detail: detail_of(&response.body) }),
        status => Err(ApiError::Status { status, body: response.body }),
    }
}

fn decode<T: DeserializeOwned>(response: &RawResponse) -> Result<T, ApiError> {
    serde_json::from_str(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
}
