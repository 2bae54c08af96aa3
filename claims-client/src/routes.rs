use std::fmt;

use crate::models::Role;

const CUSTOMER_ONLY: &[Role] = &[Role::Customer];
const ADMIN_ONLY: &[Role] = &[Role::Admin];

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Login,
    Register,
    Dashboard,
    Claims,
    NewClaim,
    Reports,
}

impl Route {
    pub const ALL: [Route; 7] = [
        Route::Home,
        Route::Login,
        Route::Register,
        Route::Dashboard,
        Route::Claims,
        Route::NewClaim,
        Route::Reports,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => LOGIN_PATH,
            Route::Register => "/register",
            Route::Dashboard => DASHBOARD_PATH,
            Route::Claims => "/claims",
            Route::NewClaim => "/new-claim",
            Route::Reports => "/reports",
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        let path = path.trim();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        Route::ALL.into_iter().find(|route| route.path() == path)
    }

    pub fn is_public(self) -> bool {
        matches!(self, Route::Home | Route::Login | Route::Register)
    }

    /// Roles allowed on a protected route; `None` means any signed-in user.
    pub fn required_roles(self) -> Option<&'static [Role]> {
        match self {
            Route::NewClaim => Some(CUSTOMER_ONLY),
            Route::Reports => Some(ADMIN_ONLY),
            _ => None,
        }
    }

    /// Where the client lands after a successful login.
    pub fn after_login() -> Route {
        Route::Dashboard
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_resolve_back_to_routes() {
        for route in Route::ALL {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
        assert_eq!(Route::from_path("/claims/"), Some(Route::Claims));
        assert_eq!(Route::from_path(""), Some(Route::Home));
        assert_eq!(Route::from_path("/admin"), None);
    }

    #[test]
    fn role_restricted_routes() {
        assert_eq!(Route::NewClaim.required_roles(), Some(&[Role::Customer][..]));
        assert_eq!(Route::Reports.required_roles(), Some(&[Role::Admin][..]));
        assert_eq!(Route::Claims.required_roles(), None);
        assert!(Route::Login.is_public());
        assert!(!Route::Dashboard.is_public());
    }
}
