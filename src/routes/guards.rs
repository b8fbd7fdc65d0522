//! Route guards: pure pre-navigation checks over a session snapshot.
//!
//! Guards never perform I/O. They return a [`GuardDecision`] and leave the
//! actual navigation to whoever drives the router.

use url::form_urlencoded;

use crate::state::session::SessionState;

pub const LOGIN_PATH: &str = "/login";
pub const LANDING_PATH: &str = "/dashboard";
/// Query parameter on the login route carrying the originally requested location.
pub const RETURN_PARAM: &str = "redirect";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(Redirect),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: String,
    /// Location to come back to after login.
    pub return_to: Option<String>,
}

impl Redirect {
    fn to(path: &str) -> Self {
        Self { to: path.to_owned(), return_to: None }
    }

    /// Full target, e.g. `/login?redirect=%2Ftasks%3Fstatus%3DDone`.
    #[must_use]
    pub fn href(&self) -> String {
        match &self.return_to {
            Some(location) => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair(RETURN_PARAM, location)
                    .finish();
                format!("{}?{query}", self.to)
            }
            None => self.to.clone(),
        }
    }
}

/// Keep signed-in users off the login page. The query string of `href`
/// is carried over to the landing page.
#[must_use]
pub fn redirect_if_authenticated(session: &SessionState, href: &str) -> GuardDecision {
    if session.is_authenticated() {
        GuardDecision::Redirect(Redirect::to(&format!("{LANDING_PATH}{}", query_of(href))))
    } else {
        GuardDecision::Allow
    }
}

/// Send anyone without a confirmed session to login, remembering `href`.
///
/// `Unknown` is treated as anonymous; bootstrap should have resolved it.
#[must_use]
pub fn require_authentication(session: &SessionState, href: &str) -> GuardDecision {
    if session.is_authenticated() {
        GuardDecision::Allow
    } else {
        GuardDecision::Redirect(Redirect { to: LOGIN_PATH.to_owned(), return_to: Some(href.to_owned()) })
    }
}

/// Authenticated admins only; other roles land on the dashboard silently.
#[must_use]
pub fn require_admin(session: &SessionState, href: &str) -> GuardDecision {
    if let redirect @ GuardDecision::Redirect(_) = require_authentication(session, href) {
        return redirect;
    }
    match session.role() {
        Some(role) if role.is_admin() => GuardDecision::Allow,
        _ => GuardDecision::Redirect(Redirect::to(LANDING_PATH)),
    }
}

/// Where to go after a successful login.
///
/// Only local paths are honored: `return_to` must start with a single `/`
/// and must not point back at the login page.
#[must_use]
pub fn post_login_target(return_to: Option<&str>) -> String {
    return_to
        .filter(|location| is_local_path(location))
        .filter(|location| path_of(location) != LOGIN_PATH)
        .map_or_else(|| LANDING_PATH.to_owned(), str::to_owned)
}

/// Read the recorded location back out of a login href.
#[must_use]
pub fn return_to_from_href(href: &str) -> Option<String> {
    let (_, query) = href.split_once('?')?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == RETURN_PARAM)
        .map(|(_, value)| value.into_owned())
}

fn is_local_path(location: &str) -> bool {
    location.starts_with('/') && !location.starts_with("//") && !location.contains('\\')
}

/// `?...` part of `href` (fragment excluded), or `""`.
fn query_of(href: &str) -> &str {
    let end = href.find('#').unwrap_or(href.len());
    href[..end].find('?').map_or("", |start| &href[start..end])
}

/// `href` without query string or fragment, trailing slash trimmed.
pub(crate) fn path_of(href: &str) -> &str {
    let end = href.find(['?', '#']).unwrap_or(href.len());
    let path = &href[..end];
    if path.len() > 1 { path.trim_end_matches('/') } else { path }
}

#[cfg(test)]
#[path = "guards_test.rs"]
mod tests;
