//! In-process stand-in for the REST backend, recording every request.

use axum::Router;
use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{CORRELATION_HEADER, Gateway};
use crate::storage::InMemoryTokenStore;

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: String,
    /// Path below `/api`, still percent-encoded.
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub correlation_id: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Default)]
struct MockState {
    replies: Mutex<HashMap<(String, String), (u16, String)>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

pub(crate) struct MockBackend {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new().fallback(record).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            base_url: format!("http://{addr}/api"),
            state,
        }
    }

    /// Unregistered routes answer 404 with an empty body.
    pub fn respond(&self, method: &str, path: &str, status: u16, body: impl Into<String>) {
        self.state.replies.lock().unwrap().insert(
            (method.to_string(), path.to_string()),
            (status, body.into()),
        );
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().expect("no request recorded")
    }

    pub fn gateway(&self) -> (Gateway, Arc<InMemoryTokenStore>) {
        let tokens = Arc::new(InMemoryTokenStore::new());
        let gateway = Gateway::with_client(Client::new(), &self.base_url, tokens.clone());
        (gateway, tokens)
    }
}

async fn record(State(state): State<Arc<MockState>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, usize::MAX).await.unwrap_or_default();
    let header_value = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let raw_path = parts.uri.path();
    let path = raw_path.strip_prefix("/api").unwrap_or(raw_path).to_string();
    let method = parts.method.to_string();

    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        query: parts.uri.query().map(str::to_string),
        authorization: header_value(header::AUTHORIZATION.as_str()),
        correlation_id: header_value(CORRELATION_HEADER),
        content_type: header_value(header::CONTENT_TYPE.as_str()),
        body: body.to_vec(),
    });

    let (status, reply) = state
        .replies
        .lock()
        .unwrap()
        .get(&(method, path))
        .cloned()
        .unwrap_or((404, String::new()));

    let content_type = match reply.trim_start().chars().next() {
        Some('{' | '[' | '"') => "application/json",
        _ => "text/plain;charset=UTF-8",
    };
    (
        StatusCode::from_u16(status).unwrap(),
        [(header::CONTENT_TYPE, content_type)],
        reply,
    )
        .into_response()
}
