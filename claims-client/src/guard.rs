//! Authorization Guard: a pure decision over a session snapshot.

use crate::models::Role;
use crate::routes::{DASHBOARD_PATH, LOGIN_PATH, Route};
use crate::session::SessionSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Session restoration has not finished; show a loading state.
    Pending,
    Allow,
    RedirectTo(&'static str),
}

impl Access {
    pub fn is_allowed(self) -> bool {
        matches!(self, Access::Allow)
    }
}

/// Decides access to a protected view.
///
/// An empty `required_roles` slice admits nobody.
pub fn decide(snapshot: &SessionSnapshot, required_roles: Option<&[Role]>) -> Access {
    if snapshot.restoring {
        return Access::Pending;
    }
    let Some(session) = snapshot.session.as_ref() else {
        return Access::RedirectTo(LOGIN_PATH);
    };
    match required_roles {
        Some(roles) if !roles.contains(&session.role) => Access::RedirectTo(DASHBOARD_PATH),
        _ => Access::Allow,
    }
}

/// `decide` for a route from the route table. Public routes are always allowed.
pub fn decide_route(snapshot: &SessionSnapshot, route: Route) -> Access {
    if route.is_public() {
        return Access::Allow;
    }
    decide(snapshot, route.required_roles())
}
