//! Session store: the last-known authentication state of this client.
//!
//! SYSTEM CONTEXT
//! ==============
//! Written only by the auth gateway, read by route guards and anything that
//! renders identity. Durability lives in the server-side session cookie;
//! this store is in-memory only.
//!
//! WRITE ORDERING
//! ==============
//! Each write carries a [`WriteTicket`]. Tickets increase monotonically and a
//! commit is applied only if its ticket is newer than the last applied one.
//! Callers take a ticket when a `/auth/me/` request is *issued* and when a
//! login or logout *completes*, so a slow "who am I" response can never
//! overwrite a login or logout that finished after it was sent.

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use crate::net::types::{Role, User};

/// Authentication state as seen by this client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Not yet checked with the server.
    #[default]
    Unknown,
    /// Server confirmed there is no authenticated user.
    Anonymous,
    Authenticated(User),
}

impl SessionState {
    #[must_use]
    pub fn from_user(user: Option<User>) -> Self {
        user.map_or(Self::Anonymous, Self::Authenticated)
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.user().map(|u| u.role)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Ordering token for a store write. See the module docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WriteTicket(u64);

#[derive(Debug, Clone, Default)]
struct Snapshot {
    state: SessionState,
    applied: u64,
}

/// Shared session cell. Clones share the same state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    tx: watch::Sender<Snapshot>,
    next_ticket: AtomicU64,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// A store in the `Unknown` state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Snapshot::default());
        Self { inner: Arc::new(SessionInner { tx, next_ticket: AtomicU64::new(0) }) }
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.inner.tx.borrow().state.clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.tx.borrow().state.user().cloned()
    }

    /// Reserve a position in the write order.
    #[must_use]
    pub fn ticket(&self) -> WriteTicket {
        WriteTicket(self.inner.next_ticket.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Apply `state` unless a newer ticket has already been committed.
    ///
    /// Returns whether the write was applied.
    pub fn commit(&self, ticket: WriteTicket, state: SessionState) -> bool {
        let applied = self.inner.tx.send_if_modified(|snapshot| {
            if ticket.0 <= snapshot.applied {
                return false;
            }
            snapshot.applied = ticket.0;
            snapshot.state = state;
            true
        });
        if !applied {
            tracing::debug!(ticket = ticket.0, "dropped stale session write");
        }
        applied
    }

    /// Write `state` now, ahead of any outstanding tickets.
    pub fn set(&self, state: SessionState) {
        let ticket = self.ticket();
        self.commit(ticket, state);
    }

    /// Observe future changes.
    #[must_use]
    pub fn subscribe(&self) -> SessionWatcher {
        SessionWatcher { rx: self.inner.tx.subscribe() }
    }
}

/// Receives session changes.
pub struct SessionWatcher {
    rx: watch::Receiver<Snapshot>,
}

impl SessionWatcher {
    #[must_use]
    pub fn current(&self) -> SessionState {
        self.rx.borrow().state.clone()
    }

    /// Wait for the next applied write. `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<SessionState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().state.clone())
    }
}
