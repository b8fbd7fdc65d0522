//! Application route table and guard dispatch.
//!
//! DESIGN
//! ======
//! Each route declares an [`Access`] rule; [`RouteTable::check`] maps the
//! rule onto the matching guard. Patterns use `:name` for a single dynamic
//! segment. Paths with no matching route are public.

pub mod guards;

use guards::{GuardDecision, path_of, redirect_if_authenticated, require_admin, require_authentication};

use crate::state::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Only for visitors without a session (the login page).
    GuestOnly,
    Authenticated,
    AdminOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub pattern: &'static str,
    pub access: Access,
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl Default for RouteTable {
    /// The application's pages.
    fn default() -> Self {
        Self::new(vec![
            Route { pattern: "/", access: Access::Authenticated },
            Route { pattern: guards::LOGIN_PATH, access: Access::GuestOnly },
            Route { pattern: guards::LANDING_PATH, access: Access::Authenticated },
            Route { pattern: "/tasks", access: Access::Authenticated },
            Route { pattern: "/tasks/:id", access: Access::Authenticated },
            Route { pattern: "/profile", access: Access::Authenticated },
            Route { pattern: "/users", access: Access::AdminOnly },
        ])
    }
}

impl RouteTable {
    #[must_use]
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Access rule for `href`, ignoring query string and fragment.
    #[must_use]
    pub fn access_for(&self, href: &str) -> Access {
        let path = path_of(href);
        self.routes
            .iter()
            .find(|route| pattern_matches(route.pattern, path))
            .map_or(Access::Public, |route| route.access)
    }

    /// Decide whether `session` may enter `href`.
    #[must_use]
    pub fn check(&self, session: &SessionState, href: &str) -> GuardDecision {
        let decision = match self.access_for(href) {
            Access::Public => GuardDecision::Allow,
            Access::GuestOnly => redirect_if_authenticated(session, href),
            Access::Authenticated => require_authentication(session, href),
            Access::AdminOnly => require_admin(session, href),
        };
        if let GuardDecision::Redirect(redirect) = &decision {
            tracing::debug!(%href, to = %redirect.href(), "route guard redirect");
        }
        decision
    }
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    let mut pattern_segments = pattern.split('/').filter(|s| !s.is_empty());
    let mut path_segments = path.split('/').filter(|s| !s.is_empty());
    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return true,
            (Some(expected), Some(actual)) => {
                if !expected.starts_with(':') && expected != actual {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
