//! Error taxonomy for API calls.
//!
//! DESIGN
//! ======
//! Every non-2xx response is classified once, in the HTTP client, into one
//! of the variants below. Callers match on the variant instead of status
//! codes: the auth gateway turns `Unauthenticated` into an anonymous
//! session, forms render `Validation` verbatim, and only `Transport` is
//! treated as "server state unknown".

use serde_json::{Map, Value};

/// Errors produced by API client operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server has no authenticated session for this client (401).
    #[error("not authenticated")]
    Unauthenticated,

    /// The server refused the request (403).
    #[error("forbidden: {detail}")]
    Forbidden { detail: String, csrf: bool },

    /// The server rejected the payload with field-level errors (400).
    #[error("validation failed: {}", .0.first_message().unwrap_or("invalid request"))]
    Validation(FieldErrors),

    /// Any other non-success status.
    #[error("unexpected status {status}")]
    Status { status: u16, body: String },

    /// The request never produced an HTTP response.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body did not have the expected shape.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// No CSRF token could be read or issued.
    #[error("CSRF token unavailable")]
    CsrfUnavailable,

    /// A request path could not be joined onto the API base URL.
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Stable machine-readable code for logs and CLI output.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "E_UNAUTHENTICATED",
            Self::Forbidden { csrf: true, .. } => "E_CSRF_REJECTED",
            Self::Forbidden { csrf: false, .. } => "E_FORBIDDEN",
            Self::Validation(_) => "E_VALIDATION",
            Self::Status { .. } => "E_STATUS",
            Self::Transport(_) => "E_TRANSPORT",
            Self::Decode(_) => "E_DECODE",
            Self::CsrfUnavailable => "E_CSRF_UNAVAILABLE",
            Self::InvalidUrl(_) => "E_INVALID_URL",
        }
    }

    /// Whether repeating the same call later could plausibly succeed.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { status: 429 | 500..=599, .. })
    }

    /// Message suitable for showing to a person, e.g. under a login form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(fields) => fields
                .first_message()
                .unwrap_or("The request was rejected.")
                .to_owned(),
            Self::Forbidden { detail, .. } if !detail.is_empty() => detail.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}

// =============================================================================
// FIELD ERRORS
// =============================================================================

/// Field-level validation errors as returned by the server.
///
/// Shape: `{"field": ["msg", ...], "non_field_errors": [...], "detail": "..."}`.
/// Kept as the raw JSON object so nothing the server said is lost.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldErrors(Map<String, Value>);

impl FieldErrors {
    /// Parse a 400 body. Non-object bodies are wrapped under `detail`.
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => Self(map),
            Ok(Value::String(text)) => Self::detail_only(text),
            _ if body.trim().is_empty() => Self::default(),
            _ => Self::detail_only(body.trim().to_owned()),
        }
    }

    fn detail_only(text: String) -> Self {
        let mut map = Map::new();
        map.insert("detail".to_owned(), Value::String(text));
        Self(map)
    }

    /// Messages attached to one field.
    #[must_use]
    pub fn field(&self, name: &str) -> Vec<&str> {
        match self.0.get(name) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            Some(Value::String(text)) => vec![text.as_str()],
            _ => Vec::new(),
        }
    }

    /// Messages not tied to a specific field.
    #[must_use]
    pub fn non_field(&self) -> Vec<&str> {
        self.field("non_field_errors")
    }

    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.0.get("detail").and_then(Value::as_str)
    }

    /// First displayable message: `non_field_errors`, then `detail`, then
    /// the first message of any field.
    #[must_use]
    pub fn first_message(&self) -> Option<&str> {
        if let Some(first) = self.non_field().into_iter().next() {
            return Some(first);
        }
        if let Some(detail) = self.detail() {
            return Some(detail);
        }
        self.0
            .keys()
            .find_map(|name| self.field(name).into_iter().next())
    }

    #[must_use]
    pub fn as_json(&self) -> &Map<String, Value> {
        &self.0
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
