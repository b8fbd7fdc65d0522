//! Client core for the taskdesk task-management API.
//!
//! SYSTEM CONTEXT
//! ==============
//! The server is a session-authenticated REST API. This crate owns the
//! client half of that contract: the cookie jar holding the session, the
//! CSRF token that must accompany every mutating request, the cached
//! session state, and the route guards that read it.
//!
//! Data flows leaf to root: [`net::client::ApiClient`] attaches CSRF tokens
//! from [`net::csrf::CsrfTokenManager`], [`services::auth::AuthGateway`]
//! records outcomes in [`state::session::SessionStore`], and
//! [`routes::RouteTable`] evaluates guards over store snapshots.

pub mod config;
pub mod error;
pub mod net;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(test)]
mod test_helpers;

pub use config::{ClientConfig, ConfigError, Environment};
pub use error::{ApiError, FieldErrors};
pub use net::client::ApiClient;
pub use routes::RouteTable;
pub use routes::guards::GuardDecision;
pub use services::auth::AuthGateway;
pub use state::session::{SessionState, SessionStore};
