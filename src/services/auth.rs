//! Auth gateway: login, logout, and "who am I" on top of the API client.
//!
//! ARCHITECTURE
//! ============
//! The gateway is the only writer of the [`SessionStore`]. Explicit outcomes
//! (login, logout) take their write ticket when the server answers;
//! `/auth/me/` checks take theirs when the request goes out. A late "who am
//! I" answer therefore loses to any login/logout that completed meanwhile.
//!
//! TRADE-OFFS
//! ==========
//! Bootstrap treats a transport failure as "nothing learned" and keeps an
//! already-authenticated session instead of signing the user out over a
//! flaky connection. Any other failure resolves to anonymous.

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;

use std::sync::Arc;

use crate::error::ApiError;
use crate::net::client::ApiClient;
use crate::net::types::{AuthMe, LoginRequest, LoginResponse, MessageResponse};
use crate::state::session::{SessionState, SessionStore};

const LOGIN_PATH: &str = "/auth/login/";
const LOGOUT_PATH: &str = "/auth/logout/";
const ME_PATH: &str = "/auth/me/";

/// Refresh attempts before login gives up on obtaining a CSRF token.
const LOGIN_TOKEN_ATTEMPTS: usize = 2;

#[derive(Clone)]
pub struct AuthGateway {
    client: Arc<ApiClient>,
    session: SessionStore,
}

impl AuthGateway {
    #[must_use]
    pub fn new(client: Arc<ApiClient>, session: SessionStore) -> Self {
        Self { client, session }
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Authenticate and record the user in the session store.
    ///
    /// Fails locally with [`ApiError::CsrfUnavailable`], without contacting
    /// the login endpoint, when no CSRF token can be obtained.
    ///
    /// # Errors
    ///
    /// `Validation` for rejected credentials, or any other API error.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        self.ensure_login_token().await?;

        let body = LoginRequest { username, password };
        let response: LoginResponse = self.client.post_json(LOGIN_PATH, &body).await?;

        // The server rotates the CSRF token on login; the jar has the new one.
        self.client.csrf().set_cache(None);
        let ticket = self.session.ticket();
        self.session
            .commit(ticket, SessionState::Authenticated(response.user.clone()));
        tracing::info!(user_id = response.user.id, role = %response.user.role, "logged in");
        Ok(response)
    }

    async fn ensure_login_token(&self) -> Result<String, ApiError> {
        if let Some(token) = self.client.csrf().get_token() {
            return Ok(token);
        }
        for attempt in 1..=LOGIN_TOKEN_ATTEMPTS {
            if let Some(token) = self.client.csrf().refresh_token().await {
                return Ok(token);
            }
            tracing::warn!(attempt, "no CSRF token for login");
        }
        Err(ApiError::CsrfUnavailable)
    }

    /// End the server session and mark this client anonymous.
    ///
    /// # Errors
    ///
    /// `CsrfUnavailable` if no token can be obtained, or any API error.
    pub async fn logout(&self) -> Result<MessageResponse, ApiError> {
        let csrf = self.client.csrf();
        if csrf.refresh_token().await.or_else(|| csrf.get_token()).is_none() {
            return Err(ApiError::CsrfUnavailable);
        }

        let body = match self
            .client
            .request(reqwest::Method::POST, LOGOUT_PATH, &[], None)
            .await
        {
            // Any 2xx ended the session; the body is informational.
            Ok(response) => serde_json::from_str(&response.body).unwrap_or_else(|error| {
                tracing::debug!(%error, "logout body is not a message object");
                MessageResponse::default()
            }),
            // Session already gone server-side; the outcome is the same.
            Err(ApiError::Unauthenticated) => MessageResponse::default(),
            Err(other) => return Err(other),
        };

        csrf.set_cache(None);
        let ticket = self.session.ticket();
        self.session.commit(ticket, SessionState::Anonymous);
        tracing::info!("logged out");
        Ok(body)
    }

    /// Ask the server who this client is. 401 means nobody.
    ///
    /// Does not touch the session store.
    ///
    /// # Errors
    ///
    /// Any API error other than `Unauthenticated`.
    pub async fn current_user(&self) -> Result<AuthMe, ApiError> {
        match self.client.get_json::<AuthMe>(ME_PATH, &[]).await {
            Ok(me) => Ok(me),
            Err(ApiError::Unauthenticated) => Ok(AuthMe { user: None }),
            Err(other) => Err(other),
        }
    }

    /// Re-check the session with the server and record the answer, unless
    /// a newer login/logout has been recorded in the meantime.
    ///
    /// # Errors
    ///
    /// Any API error other than `Unauthenticated`; the store is unchanged.
    pub async fn revalidate(&self) -> Result<SessionState, ApiError> {
        let ticket = self.session.ticket();
        let me = self.current_user().await?;
        self.session.commit(ticket, SessionState::from_user(me.user));
        Ok(self.session.snapshot())
    }

    /// Resolve the session before any route guard runs. Never fails.
    pub async fn bootstrap(&self) -> SessionState {
        let ticket = self.session.ticket();
        let resolved = match self.current_user().await {
            Ok(me) => SessionState::from_user(me.user),
            Err(ApiError::Transport(reason)) => {
                let cached = self.session.snapshot();
                if cached.is_authenticated() {
                    tracing::warn!(%reason, "session check unreachable, keeping cached session");
                    return cached;
                }
                tracing::warn!(%reason, "session check unreachable, treating as anonymous");
                SessionState::Anonymous
            }
            Err(error) => {
                tracing::warn!(error = %error, code = error.error_code(), "session check failed");
                SessionState::Anonymous
            }
        };
        self.session.commit(ticket, resolved);
        self.session.snapshot()
    }
}
