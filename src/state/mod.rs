//! Shared client-side state.
//!
//! DESIGN
//! ======
//! Only one state cell exists: the session. It is an injectable store
//! rather than a global so tests can build as many as they need.

pub mod session;
