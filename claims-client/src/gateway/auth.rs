use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;

use super::Gateway;
use crate::error::Result;
use crate::models::{AuthResponse, BackendReply};
use crate::session::AuthApi;
use crate::validation::Registration;

#[async_trait]
impl AuthApi for Gateway {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let body = json!({ "email": email, "password": password });
        let reply = self
            .mutate(Method::POST, "/auth/login", |r| r.json(&body))
            .await?;
        reply.decode()
    }

    async fn register(&self, registration: &Registration) -> Result<String> {
        let body = self
            .call(Method::POST, "/auth/register", |r| r.json(registration))
            .await?;
        let reply = BackendReply::from_body(&body);
        Ok(reply.message().unwrap_or(body.trim()).to_string())
    }

    async fn current_user(&self) -> Result<AuthResponse> {
        self.get("/auth/me").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PortalError;
    use crate::gateway::mock::MockBackend;
    use crate::models::Role;
    use crate::session::{AuthOutcome, SessionStore, TOKEN_KEY};
    use crate::storage::TokenStore;
    use crate::validation::RegistrationForm;
    use std::sync::Arc;

    const LOGIN_BODY: &str = r#"{"accessToken":"jwt-john","tokenType":"Bearer","role":"CUSTOMER","email":"john@example.com","name":"John Doe","policyNumber":"POL-00001234"}"#;

    #[tokio::test]
    async fn login_posts_credentials() {
        let backend = MockBackend::start().await;
        backend.respond("POST", "/auth/login", 200, LOGIN_BODY);
        let (gateway, _) = backend.gateway();

        let response = gateway.login("john@example.com", "customer123").await.unwrap();

        assert_eq!(response.role, Role::Customer);
        assert_eq!(response.access_token.as_deref(), Some("jwt-john"));
        let request = backend.last_request();
        assert_eq!(request.path, "/auth/login");
        assert_eq!(
            request.json(),
            json!({"email": "john@example.com", "password": "customer123"})
        );
    }

    #[tokio::test]
    async fn register_returns_plain_text_message() {
        let backend = MockBackend::start().await;
        backend.respond("POST", "/auth/register", 200, "User registered successfully!");
        let (gateway, _) = backend.gateway();
        let registration = RegistrationForm {
            name: "Jane".into(),
            email: "jane@example.com".into(),
            password: "Str0ng!pass".into(),
            role: Some(Role::Agent),
            country_code: "+1".into(),
            phone_number: "5551234567".into(),
            aadhar_number: "123412341234".into(),
        }
        .validate()
        .unwrap();

        let message = gateway.register(&registration).await.unwrap();

        assert_eq!(message, "User registered successfully!");
        let body = backend.last_request().json();
        assert_eq!(body["role"], "AGENT");
        assert_eq!(body["phoneNumber"], "+15551234567");
    }

    #[tokio::test]
    async fn current_user_rejected_without_token() {
        let backend = MockBackend::start().await;
        backend.respond("GET", "/auth/me", 401, "Not authenticated");
        let (gateway, _) = backend.gateway();

        let err = gateway.current_user().await.unwrap_err();
        assert!(matches!(err, PortalError::Backend { status: 401, .. }));
    }

    #[tokio::test]
    async fn session_store_over_http() {
        let backend = MockBackend::start().await;
        backend.respond("POST", "/auth/login", 200, LOGIN_BODY);
        backend.respond(
            "GET",
            "/auth/me",
            200,
            r#"{"role":"CUSTOMER","email":"john@example.com","name":"John Doe","policyNumber":"POL-00001234"}"#,
        );
        let (gateway, tokens) = backend.gateway();
        let gateway = Arc::new(gateway);

        let store = SessionStore::new(gateway.clone(), tokens.clone());
        assert!(store.restore().await.is_none());
        assert!(matches!(
            store.login("john@example.com", "customer123").await,
            AuthOutcome::Success(_)
        ));
        assert_eq!(tokens.get(TOKEN_KEY).unwrap().as_deref(), Some("jwt-john"));

        // a fresh process restores from the persisted token
        let reloaded = SessionStore::new(gateway, tokens);
        let session = reloaded.restore().await.unwrap();
        assert_eq!(session.email, "john@example.com");
        assert_eq!(
            backend.last_request().authorization.as_deref(),
            Some("Bearer jwt-john")
        );
    }

    #[tokio::test]
    async fn restore_clears_token_when_backend_is_unreachable() {
        let tokens = Arc::new(crate::storage::InMemoryTokenStore::new());
        tokens.set(TOKEN_KEY, "jwt-john").unwrap();
        let gateway = Gateway::with_client(
            reqwest::Client::new(),
            "http://127.0.0.1:9/api",
            tokens.clone(),
        );
        let store = SessionStore::new(Arc::new(gateway), tokens.clone());

        assert!(store.restore().await.is_none());
        assert_eq!(tokens.get(TOKEN_KEY).unwrap(), None);
        assert!(!store.is_restoring());
    }

    #[tokio::test]
    async fn restore_clears_token_on_malformed_profile() {
        let backend = MockBackend::start().await;
        backend.respond("GET", "/auth/me", 200, r#"{"email": "john@example.com"}"#);
        let (gateway, tokens) = backend.gateway();
        tokens.set(TOKEN_KEY, "jwt-john").unwrap();
        let store = SessionStore::new(Arc::new(gateway), tokens.clone());

        assert!(store.restore().await.is_none());
        assert_eq!(tokens.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(
            backend.last_request().authorization.as_deref(),
            Some("Bearer jwt-john")
        );
    }
}
