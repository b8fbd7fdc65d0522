//! Scripted transports, issuers, and fixtures shared by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::cookie::Jar;
use url::Url;

use crate::error::ApiError;
use crate::net::client::ApiClient;
use crate::net::csrf::{CsrfTokenManager, TokenIssuer};
use crate::net::transport::{OutboundRequest, RawResponse, Transport};
use crate::net::types::{Role, User};

pub fn api_url() -> Url {
    Url::parse("http://api.test/api").unwrap()
}

pub fn user(id: i64, role: Role) -> User {
    User {
        id,
        username: format!("{}{id}", role.as_str().to_lowercase()),
        email: None,
        role,
        is_active: true,
    }
}

pub fn json_response(status: u16, body: &serde_json::Value) -> Result<RawResponse, ApiError> {
    Ok(RawResponse { status, body: body.to_string() })
}

pub fn csrf_rejection() -> Result<RawResponse, ApiError> {
    json_response(403, &serde_json::json!({ "detail": "CSRF Failed: CSRF token missing or incorrect." }))
}

// =============================================================================
// ScriptedIssuer
// =============================================================================

/// Returns scripted tokens in order; `None` entries (and an empty script)
/// fail the issue.
pub struct ScriptedIssuer {
    script: Mutex<VecDeque<Option<String>>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedIssuer {
    pub fn new(script: &[Option<&str>]) -> Arc<Self> {
        Self::with_delay(script, Duration::ZERO)
    }

    pub fn with_delay(script: &[Option<&str>], delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.iter().map(|t| t.map(str::to_owned)).collect()),
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TokenIssuer for ScriptedIssuer {
    async fn issue_token(&self) -> Result<String, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front().flatten();
        next.ok_or_else(|| ApiError::Transport("issuer unavailable".to_owned()))
    }
}

// =============================================================================
// ScriptedTransport
// =============================================================================

/// Replays scripted responses in order and records every request sent.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<RawResponse, ApiError>>>,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<RawResponse, ApiError>>) -> Arc<Self> {
        Arc::new(Self { responses: Mutex::new(responses.into()), requests: Mutex::new(Vec::new()) })
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| r.url.path().to_owned())
            .collect()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: &OutboundRequest) -> Result<RawResponse, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport("no scripted response".to_owned())))
    }
}

// =============================================================================
// Wiring
// =============================================================================

pub fn csrf_manager(jar: &Arc<Jar>, issuer: Arc<ScriptedIssuer>) -> CsrfTokenManager {
    CsrfTokenManager::new(jar.clone(), api_url(), "csrftoken", issuer, Duration::ZERO)
}

/// Client over `transport` whose tokens come from `issuer`.
pub fn api_client(transport: Arc<ScriptedTransport>, issuer: Arc<ScriptedIssuer>) -> (ApiClient, Arc<Jar>) {
    let jar = Arc::new(Jar::default());
    let csrf = csrf_manager(&jar, issuer);
    (ApiClient::from_parts(api_url(), transport, csrf), jar)
}
