//! The Session Store: the single owner of "who is logged in".
//!
//! Lifecycle: `Restoring` (token may exist, identity unknown) → restored with
//! or without a session → populated by `login` → cleared by `logout`. The
//! store is the only writer of the persisted token; the gateway only reads it.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::{AuthResponse, Role};
use crate::storage::TokenStore;
use crate::validation::Registration;

/// Key under which the bearer token is persisted.
pub const TOKEN_KEY: &str = "token";

const LOGIN_FAILED: &str = "Login failed. Please check your credentials.";
const REGISTRATION_FAILED: &str = "Registration failed. Please try again.";

/// Backend authentication operations the Session Store depends on.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse>;
    async fn register(&self, registration: &Registration) -> Result<String>;
    /// "Who am I" for the token currently persisted.
    async fn current_user(&self) -> Result<AuthResponse>;
}

/// The authenticated identity and its token.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub role: Role,
    pub email: String,
    pub name: String,
    pub policy_number: Option<String>,
    token: String,
}

impl Session {
    pub fn new(
        role: Role,
        email: impl Into<String>,
        name: impl Into<String>,
        policy_number: Option<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            role,
            email: email.into(),
            name: name.into(),
            policy_number: policy_number.filter(|p| !p.trim().is_empty()),
            token: token.into(),
        }
    }

    fn from_auth(response: AuthResponse, token: String) -> Self {
        Self::new(
            response.role,
            response.email,
            response.name,
            response.policy_number,
            token,
        )
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user(&self) -> UserIdentity {
        UserIdentity {
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            policy_number: self.policy_number.clone(),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("role", &self.role)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("policy_number", &self.policy_number)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// The identity handed back to views; never carries the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub policy_number: Option<String>,
}

/// Result of an authentication attempt. Failures never escape as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome<T> {
    Success(T),
    Failure { message: String },
}

impl<T> AuthOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Success(_))
    }
}

/// Point-in-time view of the store, consumed by the authorization guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub restoring: bool,
    pub session: Option<Session>,
}

impl SessionSnapshot {
    pub fn restored(session: Option<Session>) -> Self {
        Self {
            restoring: false,
            session,
        }
    }
}

#[derive(Debug)]
struct SessionState {
    restoring: bool,
    session: Option<Session>,
}

pub struct SessionStore {
    auth: Arc<dyn AuthApi>,
    tokens: Arc<dyn TokenStore>,
    state: RwLock<SessionState>,
}

impl SessionStore {
    pub fn new(auth: Arc<dyn AuthApi>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            auth,
            tokens,
            state: RwLock::new(SessionState {
                restoring: true,
                session: None,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.read();
        SessionSnapshot {
            restoring: state.restoring,
            session: state.session.clone(),
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.read().session.clone()
    }

    pub fn is_restoring(&self) -> bool {
        self.read().restoring
    }

    /// Rebuilds the session from a persisted token.
    ///
    /// Never fails: an unusable token is discarded and the store ends up
    /// empty. The restoring flag drops to false on the first call only; later
    /// calls return the current session untouched.
    pub async fn restore(&self) -> Option<Session> {
        if !self.is_restoring() {
            return self.current();
        }

        let token = match self.tokens.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                warn!(error = %e, "Could not read persisted token");
                None
            }
        };

        let restored = match token {
            None => {
                debug!("No persisted token, starting signed out");
                None
            }
            Some(token) => match self.auth.current_user().await {
                Ok(profile) => {
                    info!(email = %profile.email, role = %profile.role, "Session restored");
                    Some(Session::from_auth(profile, token))
                }
                Err(e) => {
                    warn!(error = %e, "Persisted token rejected, clearing it");
                    self.clear_token();
                    None
                }
            },
        };

        let mut state = self.write();
        if state.restoring {
            state.restoring = false;
            // a login that completed while restoring wins
            if state.session.is_none() {
                state.session = restored;
            }
        }
        state.session.clone()
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthOutcome<UserIdentity> {
        let response = match self.auth.login(email.trim(), password).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Login failed");
                return AuthOutcome::Failure {
                    message: e.user_message(LOGIN_FAILED),
                };
            }
        };

        let Some(token) = response
            .access_token
            .clone()
            .filter(|t| !t.trim().is_empty())
        else {
            warn!("Login response carried no access token");
            return AuthOutcome::Failure {
                message: LOGIN_FAILED.to_string(),
            };
        };

        if let Err(e) = self.tokens.set(TOKEN_KEY, &token) {
            warn!(error = %e, "Could not persist token");
            return AuthOutcome::Failure {
                message: e.user_message(LOGIN_FAILED),
            };
        }

        let session = Session::from_auth(response, token);
        let user = session.user();
        info!(email = %user.email, role = %user.role, "Logged in");
        self.write().session = Some(session);
        AuthOutcome::Success(user)
    }

    /// Registers an account. Does not sign in; a login must follow.
    pub async fn register(&self, registration: &Registration) -> AuthOutcome<String> {
        match self.auth.register(registration).await {
            Ok(message) => {
                info!(email = %registration.email, role = %registration.role, "Registered");
                AuthOutcome::Success(message)
            }
            Err(e) => {
                warn!(error = %e, "Registration failed");
                AuthOutcome::Failure {
                    message: e.user_message(REGISTRATION_FAILED),
                }
            }
        }
    }

    /// Clears token and session. Safe to call when already signed out.
    pub fn logout(&self) {
        self.clear_token();
        if self.write().session.take().is_some() {
            info!("Logged out");
        }
    }

    fn clear_token(&self) {
        if let Err(e) = self.tokens.remove(TOKEN_KEY) {
            warn!(error = %e, "Could not remove persisted token");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PortalError;
    use crate::storage::InMemoryTokenStore;
    use crate::validation::RegistrationForm;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct StubAuth {
        me_calls: AtomicUsize,
        me_error: Option<fn() -> PortalError>,
        login_body: Option<&'static str>,
    }

    fn john(token: Option<&str>) -> AuthResponse {
        AuthResponse {
            access_token: token.map(str::to_string),
            token_type: Some("Bearer".into()),
            role: Role::Customer,
            email: "john@example.com".into(),
            name: "John Doe".into(),
            policy_number: Some("POL-00001234".into()),
        }
    }

    #[async_trait]
    impl AuthApi for StubAuth {
        async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
            if email == "john@example.com" && password == "customer123" {
                return Ok(john(Some("jwt-john")));
            }
            Err(PortalError::Backend {
                status: 401,
                message: crate::error::extract_message(self.login_body.unwrap_or(""), ""),
            })
        }

        async fn register(&self, registration: &Registration) -> Result<String> {
            if registration.email == "taken@example.com" {
                return Err(PortalError::Backend {
                    status: 400,
                    message: "Error: Email is already in use!".into(),
                });
            }
            Ok("User registered successfully!".into())
        }

        async fn current_user(&self) -> Result<AuthResponse> {
            self.me_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = self.me_error {
                return Err(error());
            }
            Ok(john(None))
        }
    }

    fn store_with(
        auth: StubAuth,
        token: Option<&str>,
    ) -> (SessionStore, Arc<InMemoryTokenStore>, Arc<StubAuth>) {
        let tokens = Arc::new(InMemoryTokenStore::new());
        if let Some(token) = token {
            tokens.set(TOKEN_KEY, token).unwrap();
        }
        let auth = Arc::new(auth);
        let store = SessionStore::new(auth.clone(), tokens.clone());
        (store, tokens, auth)
    }

    #[tokio::test]
    async fn starts_restoring_and_empty() {
        let (store, _, _) = store_with(StubAuth::default(), None);
        let snapshot = store.snapshot();
        assert!(snapshot.restoring);
        assert!(snapshot.session.is_none());
    }

    #[tokio::test]
    async fn restore_without_token_skips_backend() {
        let (store, _, auth) = store_with(StubAuth::default(), None);
        assert!(store.restore().await.is_none());
        assert!(!store.is_restoring());
        assert_eq!(auth.me_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn restore_with_valid_token_populates_session() {
        let (store, _, _) = store_with(StubAuth::default(), Some("jwt-john"));
        let session = store.restore().await.unwrap();
        assert_eq!(session.role, Role::Customer);
        assert_eq!(session.policy_number.as_deref(), Some("POL-00001234"));
        assert_eq!(session.token(), "jwt-john");
        assert!(!store.snapshot().restoring);
    }

    #[tokio::test]
    async fn failed_restore_clears_token() {
        let failures: [fn() -> PortalError; 3] = [
            || PortalError::Backend {
                status: 401,
                message: "Not authenticated".into(),
            },
            || PortalError::Backend {
                status: 503,
                message: String::new(),
            },
            || PortalError::Decode("missing field `role`".into()),
        ];
        for failure in failures {
            let auth = StubAuth {
                me_error: Some(failure),
                ..StubAuth::default()
            };
            let (store, tokens, auth) = store_with(auth, Some("expired"));
            assert!(store.restore().await.is_none());
            assert_eq!(tokens.get(TOKEN_KEY).unwrap(), None);
            assert!(!store.is_restoring());
            assert!(store.current().is_none());
            assert_eq!(auth.me_calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn restore_runs_once() {
        let (store, _, auth) = store_with(StubAuth::default(), Some("jwt-john"));
        let first = store.restore().await;
        let second = store.restore().await;
        assert_eq!(first, second);
        assert_eq!(auth.me_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn login_persists_token_and_identity() {
        let (store, tokens, _) = store_with(StubAuth::default(), None);
        let outcome = store.login("john@example.com", "customer123").await;
        let AuthOutcome::Success(user) = outcome else {
            panic!("expected success");
        };
        assert_eq!(user.role, Role::Customer);
        assert_eq!(tokens.get(TOKEN_KEY).unwrap().as_deref(), Some("jwt-john"));
        assert_eq!(store.current().unwrap().email, "john@example.com");
    }

    #[tokio::test]
    async fn login_failure_extracts_backend_message() {
        let auth = StubAuth {
            login_body: Some(r#"{"message":"Invalid email or password"}"#),
            ..StubAuth::default()
        };
        let (store, tokens, _) = store_with(auth, None);
        let outcome = store.login("john@example.com", "wrong").await;
        assert_eq!(
            outcome,
            AuthOutcome::Failure {
                message: "Invalid email or password".into()
            }
        );
        assert!(store.current().is_none());
        assert_eq!(tokens.get(TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn login_failure_without_message_uses_fallback() {
        let (store, _, _) = store_with(StubAuth::default(), None);
        let outcome = store.login("nobody@example.com", "x").await;
        assert_eq!(
            outcome,
            AuthOutcome::Failure {
                message: LOGIN_FAILED.into()
            }
        );
    }

    #[tokio::test]
    async fn register_does_not_sign_in() {
        let (store, tokens, _) = store_with(StubAuth::default(), None);
        let registration = RegistrationForm {
            name: "Jane".into(),
            email: "jane@example.com".into(),
            password: "Str0ng!pass".into(),
            role: None,
            country_code: "+91".into(),
            phone_number: "9876543210".into(),
            aadhar_number: "1234 5678 9012".into(),
        }
        .validate()
        .unwrap();
        assert!(store.register(&registration).await.is_success());
        assert!(store.current().is_none());
        assert_eq!(tokens.get(TOKEN_KEY).unwrap(), None);

        let mut taken = registration.clone();
        taken.email = "taken@example.com".into();
        assert_eq!(
            store.register(&taken).await,
            AuthOutcome::Failure {
                message: "Error: Email is already in use!".into()
            }
        );
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let (store, tokens, _) = store_with(StubAuth::default(), None);
        store.login("john@example.com", "customer123").await;
        store.logout();
        store.logout();
        assert!(store.current().is_none());
        assert_eq!(tokens.get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn debug_output_hides_token() {
        let session = Session::new(Role::Admin, "a@example.com", "A", None, "secret-token");
        assert!(!format!("{session:?}").contains("secret-token"));
    }
}
