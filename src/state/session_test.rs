use super::*;
use crate::test_helpers::user;

// =============================================================================
// SessionState
// =============================================================================

#[test]
fn new_store_is_unknown() {
    let store = SessionStore::new();
    assert_eq!(store.snapshot(), SessionState::Unknown);
    assert!(!store.snapshot().is_resolved());
    assert_eq!(store.user(), None);
}

#[test]
fn from_user_distinguishes_anonymous() {
    assert_eq!(SessionState::from_user(None), SessionState::Anonymous);
    let state = SessionState::from_user(Some(user(1, Role::Manager)));
    assert!(state.is_authenticated());
    assert_eq!(state.role(), Some(Role::Manager));
}

// =============================================================================
// Ticketed writes
// =============================================================================

#[test]
fn tickets_increase() {
    let store = SessionStore::new();
    let a = store.ticket();
    let b = store.ticket();
    assert!(b > a);
}

#[test]
fn commit_applies_newer_ticket() {
    let store = SessionStore::new();
    let ticket = store.ticket();
    assert!(store.commit(ticket, SessionState::Anonymous));
    assert_eq!(store.snapshot(), SessionState::Anonymous);
}

#[test]
fn late_response_does_not_clobber_newer_login() {
    let store = SessionStore::new();
    let me_request = store.ticket();
    let login_done = store.ticket();

    assert!(store.commit(login_done, SessionState::Authenticated(user(1, Role::Admin))));
    assert!(!store.commit(me_request, SessionState::Anonymous));

    assert_eq!(store.user().map(|u| u.id), Some(1));
}

#[test]
fn same_ticket_cannot_commit_twice() {
    let store = SessionStore::new();
    let ticket = store.ticket();
    assert!(store.commit(ticket, SessionState::Anonymous));
    assert!(!store.commit(ticket, SessionState::Authenticated(user(2, Role::Member))));
}

#[test]
fn set_overrides_outstanding_tickets() {
    let store = SessionStore::new();
    let outstanding = store.ticket();
    store.set(SessionState::Anonymous);
    assert!(!store.commit(outstanding, SessionState::Authenticated(user(3, Role::Member))));
    assert_eq!(store.snapshot(), SessionState::Anonymous);
}

#[test]
fn clones_share_state() {
    let store = SessionStore::new();
    let other = store.clone();
    other.set(SessionState::Authenticated(user(4, Role::Member)));
    assert!(store.snapshot().is_authenticated());
}

// =============================================================================
// SessionWatcher
// =============================================================================

#[tokio::test]
async fn watcher_sees_applied_writes_only() {
    let store = SessionStore::new();
    let mut watcher = store.subscribe();
    assert_eq!(watcher.current(), SessionState::Unknown);

    let stale = store.ticket();
    store.set(SessionState::Authenticated(user(5, Role::Admin)));
    store.commit(stale, SessionState::Anonymous);

    let seen = watcher.changed().await.unwrap();
    assert_eq!(seen.role(), Some(Role::Admin));
}

#[tokio::test]
async fn watcher_ends_when_store_dropped() {
    let store = SessionStore::new();
    let mut watcher = store.subscribe();
    drop(store);
    assert_eq!(watcher.changed().await, None);
}
