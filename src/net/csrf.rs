//! CSRF token discovery, caching, and coalesced refresh.
//!
//! DESIGN
//! ======
//! The token is dual-sourced: the `csrftoken` cookie in the shared jar wins,
//! and an in-memory copy of the last issued token covers servers whose
//! cookie never lands in the jar (cross-origin deployments).
//!
//! Refreshes are coalesced: the first caller installs a shared future in
//! `in_flight`, later callers clone it, and the future clears the slot
//! itself once the token is settled. N concurrent refreshes therefore cost
//! one issuing request and all resolve to the same value.

#[cfg(test)]
#[path = "csrf_test.rs"]
mod tests;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use reqwest::Method;
use reqwest::cookie::CookieStore;
use url::Url;

use super::transport::{OutboundRequest, Transport};
use super::types::CsrfTokenResponse;
use crate::error::ApiError;

pub const CSRF_TOKEN_PATH: &str = "/auth/csrf-token/";

/// Performs the token-issuing request.
#[async_trait::async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Ask the server for a fresh token.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or a body
    /// without a usable token.
    async fn issue_token(&self) -> Result<String, ApiError>;
}

/// Issues tokens through a [`Transport`] via `GET /auth/csrf-token/`.
pub struct TransportTokenIssuer {
    transport: Arc<dyn Transport>,
    url: Url,
}

impl TransportTokenIssuer {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, url: Url) -> Self {
        Self { transport, url }
    }
}

#[async_trait::async_trait]
impl TokenIssuer for TransportTokenIssuer {
    async fn issue_token(&self) -> Result<String, ApiError> {
        let request = OutboundRequest { method: Method::GET, url: self.url.clone(), csrf_token: None, body: None };
        let response = self.transport.execute(&request).await?;
        if !response.is_success() {
            return Err(ApiError::Status { status: response.status, body: response.body });
        }
        let body: CsrfTokenResponse = serde_json::from_str(&response.body)?;
        if body.csrf_token.trim().is_empty() {
            return Err(ApiError::Decode("empty csrfToken".to_owned()));
        }
        Ok(body.csrf_token)
    }
}

// =============================================================================
// TOKEN MANAGER
// =============================================================================

type PendingToken = Shared<BoxFuture<'static, Option<String>>>;

/// Hands out the CSRF token for mutating requests. Cheap to clone.
#[derive(Clone)]
pub struct CsrfTokenManager {
    inner: Arc<CsrfInner>,
}

struct CsrfInner {
    cookies: Arc<dyn CookieStore>,
    cookie_url: Url,
    cookie_name: String,
    issuer: Arc<dyn TokenIssuer>,
    settle: Duration,
    cache: Mutex<Option<String>>,
    in_flight: Mutex<Option<PendingToken>>,
}

impl CsrfTokenManager {
    /// `cookie_url` is the URL whose cookies are consulted (the API base).
    #[must_use]
    pub fn new(
        cookies: Arc<dyn CookieStore>,
        cookie_url: Url,
        cookie_name: impl Into<String>,
        issuer: Arc<dyn TokenIssuer>,
        settle: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(CsrfInner {
                cookies,
                cookie_url,
                cookie_name: cookie_name.into(),
                issuer,
                settle,
                cache: Mutex::new(None),
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Current token: cookie first, then the cached copy.
    #[must_use]
    pub fn get_token(&self) -> Option<String> {
        self.cookie_token().or_else(|| self.cached())
    }

    /// Replace the cached token. `None` forgets it.
    pub fn set_cache(&self, token: Option<String>) {
        *lock(&self.inner.cache) = token;
    }

    /// Fetch a new token, sharing any refresh already in flight.
    ///
    /// Returns `None` when the issuing request fails.
    pub async fn refresh_token(&self) -> Option<String> {
        let pending = {
            let mut slot = lock(&self.inner.in_flight);
            if let Some(pending) = slot.as_ref() {
                pending.clone()
            } else {
                let pending = issue(Arc::clone(&self.inner)).boxed().shared();
                *slot = Some(pending.clone());
                pending
            }
        };
        pending.await
    }

    fn cached(&self) -> Option<String> {
        lock(&self.inner.cache).clone()
    }

    fn cookie_token(&self) -> Option<String> {
        let header = self.inner.cookies.cookies(&self.inner.cookie_url)?;
        let header = header.to_str().ok()?;
        cookie_value(header, &self.inner.cookie_name).map(str::to_owned)
    }
}

async fn issue(inner: Arc<CsrfInner>) -> Option<String> {
    let token = match inner.issuer.issue_token().await {
        Ok(token) => {
            *lock(&inner.cache) = Some(token.clone());
            // Let the cookie write settle before anyone relies on it.
            tokio::time::sleep(inner.settle).await;
            Some(token)
        }
        Err(error) => {
            tracing::warn!(error = %error, code = error.error_code(), "CSRF token refresh failed");
            None
        }
    };
    lock(&inner.in_flight).take();
    token
}

/// Pick `name`'s value out of a `Cookie` header (`a=1; b=2`).
pub(crate) fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
