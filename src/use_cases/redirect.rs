// Route decisions taken when the session changes.

use serde::Deserialize;

use crate::domain::entities::{NavigationAction, Session};

/// Which routes need a session, which are only for signed-out visitors, and
/// where to send the user when the session flips.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RoutePolicy {
    pub public_only: Vec<String>,
    pub protected: Vec<String>,
    pub protected_landing: String,
    pub public_landing: String,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            public_only: vec!["/login".to_string(), "/register".to_string()],
            protected: vec!["/profile".to_string(), "/booking".to_string()],
            protected_landing: "/booking".to_string(),
            public_landing: "/".to_string(),
        }
    }
}

impl RoutePolicy {
    pub fn is_public_only(&self, route: &str) -> bool {
        self.public_only.iter().any(|prefix| route_matches(prefix, route))
    }

    pub fn requires_auth(&self, route: &str) -> bool {
        self.protected.iter().any(|prefix| route_matches(prefix, route))
    }
}

/// Decides where to navigate after a session change.
///
/// `previous` is `None` before the first session has been observed.
pub fn evaluate(
    previous: Option<&Session>,
    next: &Session,
    current_route: &str,
    policy: &RoutePolicy,
) -> NavigationAction {
    let was_authenticated = previous.is_some_and(Session::is_authenticated);

    match next {
        Session::Authenticated(_) if !was_authenticated && policy.is_public_only(current_route) => {
            NavigationAction::NavigateTo(policy.protected_landing.clone())
        }
        Session::Unauthenticated
            if previous != Some(next) && policy.requires_auth(current_route) =>
        {
            NavigationAction::NavigateTo(policy.public_landing.clone())
        }
        _ => NavigationAction::NoOp,
    }
}

// Matches `/profile` against `/profile`, `/profile/`, `/profile/edit` and
// `/profile?tab=history`, but not `/profiles`.
fn route_matches(prefix: &str, route: &str) -> bool {
    let path = route.split(['?', '#']).next().unwrap_or_default();
    let path = path.trim_end_matches('/');
    let prefix = prefix.trim_end_matches('/');

    if prefix.is_empty() {
        return path.is_empty();
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
