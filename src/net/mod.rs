//! Networking modules for the task-management REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `client` applies request policy (CSRF, retry, status mapping) on top of a
//! `transport`, `csrf` owns token discovery and refresh, `tasks`/`users` wrap
//! the resource endpoints, and `types` defines the shared wire schema.

pub mod client;
pub mod csrf;
pub mod tasks;
pub mod transport;
pub mod types;
pub mod users;
