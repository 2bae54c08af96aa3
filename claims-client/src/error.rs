use serde_json::Value;
use thiserror::Error;

use crate::lifecycle::TransitionError;
use crate::validation::ValidationError;

/// Errors surfaced by the portal client.
///
/// Validation and lifecycle failures are raised before any network call is
/// attempted; the remaining variants come from talking to the backend or the
/// local token store.
#[derive(Error, Debug)]
pub enum PortalError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Lifecycle(#[from] TransitionError),

    #[error("A {0} request is already in progress")]
    InFlight(&'static str),

    #[error("Backend rejected the request ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed backend response: {0}")]
    Decode(String),

    #[error("Token storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, PortalError>;

impl PortalError {
    /// The single human-readable line shown to the user for this failure.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            PortalError::Validation(e) => e.to_string(),
            PortalError::Lifecycle(e) => e.to_string(),
            PortalError::InFlight(_) => self.to_string(),
            PortalError::Backend { message, .. } if !message.trim().is_empty() => {
                message.clone()
            }
            PortalError::Backend { .. } => fallback.to_string(),
            PortalError::Transport(e) => e.to_string(),
            PortalError::Decode(_) | PortalError::Storage(_) => fallback.to_string(),
        }
    }

    /// True for failures caught client-side before any request was issued.
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            PortalError::Validation(_) | PortalError::Lifecycle(_) | PortalError::InFlight(_)
        )
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            PortalError::Backend { status, .. } => Some(*status),
            PortalError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(e: serde_json::Error) -> Self {
        PortalError::Decode(e.to_string())
    }
}

/// Pulls a human-readable message out of an error payload.
///
/// The backend answers failures in three shapes: a bare string body, an
/// object with `message`, or an object with `error`. Anything else yields
/// `fallback`.
pub fn extract_message(body: &str, fallback: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return fallback.to_string();
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::String(s)) if !s.trim().is_empty() => s,
        Ok(Value::Object(map)) => ["message", "error"]
            .iter()
            .filter_map(|key| map.get(*key).and_then(Value::as_str))
            .find(|s| !s.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string()),
        Ok(_) => fallback.to_string(),
        // plain-text body
        Err(_) if !trimmed.starts_with('<') => trimmed.to_string(),
        Err(_) => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FALLBACK: &str = "Login failed. Please check your credentials.";

    #[test]
    fn message_from_plain_text_body() {
        assert_eq!(extract_message("Not authenticated", FALLBACK), "Not authenticated");
        assert_eq!(
            extract_message("\"Email is already taken!\"", FALLBACK),
            "Email is already taken!"
        );
    }

    #[test]
    fn message_field_wins_over_error_field() {
        let body = r#"{"timestamp":"2024-01-01","status":400,"error":"Bad Request","message":"Invalid claim type"}"#;
        assert_eq!(extract_message(body, FALLBACK), "Invalid claim type");
    }

    #[test]
    fn error_field_used_when_message_missing() {
        let body = r#"{"error":"No documents found for this claim","analyzed":false}"#;
        assert_eq!(extract_message(body, FALLBACK), "No documents found for this claim");
    }

    #[test]
    fn unknown_shapes_fall_back() {
        assert_eq!(extract_message("", FALLBACK), FALLBACK);
        assert_eq!(extract_message("{\"code\":17}", FALLBACK), FALLBACK);
        assert_eq!(extract_message("[1,2]", FALLBACK), FALLBACK);
        assert_eq!(extract_message("<html>oops</html>", FALLBACK), FALLBACK);
        assert_eq!(extract_message(r#"{"message":"  "}"#, FALLBACK), FALLBACK);
    }

    #[test]
    fn user_message_prefers_backend_text() {
        let err = PortalError::Backend {
            status: 401,
            message: "Bad credentials".to_string(),
        };
        assert_eq!(err.user_message(FALLBACK), "Bad credentials");
        assert_eq!(err.status(), Some(401));
        assert!(!err.is_client_side());

        let decode = PortalError::Decode("missing field".to_string());
        assert_eq!(decode.user_message(FALLBACK), FALLBACK);
    }
}
