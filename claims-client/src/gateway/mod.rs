//! Backend Gateway: one typed operation per backend capability.
//!
//! Every request goes through [`Gateway::call`], which attaches the persisted
//! bearer token when one exists, tags the request with a correlation id and
//! turns non-2xx responses into [`PortalError::Backend`] carrying the
//! backend's own message. The gateway never checks authorization itself.

mod auth;
mod claims;
mod documents;
mod fraud;
#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

use crate::config::PortalConfig;
use crate::error::{PortalError, Result, extract_message};
use crate::lifecycle::Decision;
use crate::models::{
    AiServiceHealth, BackendReply, Claim, ClaimDetails, ClaimPage, ClaimQuery, ClaimType,
    Document, DocumentUpload, FraudOutcome, FraudResult, FraudStatistics, NewClaim,
};
use crate::session::TOKEN_KEY;
use crate::storage::TokenStore;

pub const CORRELATION_HEADER: &str = "x-correlation-id";

#[async_trait]
pub trait ClaimsApi: Send + Sync {
    async fn claim_types(&self) -> Result<Vec<ClaimType>>;
    /// Claims of the signed-in customer.
    async fn my_claims(&self) -> Result<Vec<Claim>>;
    async fn all_claims(&self, query: &ClaimQuery) -> Result<Vec<Claim>>;
    async fn all_claims_paginated(&self, query: &ClaimQuery) -> Result<ClaimPage>;
    async fn claim(&self, id: i64) -> Result<Claim>;
    async fn claim_details(&self, id: i64) -> Result<ClaimDetails>;
    async fn create_claim(&self, claim: &NewClaim) -> Result<BackendReply>;
    async fn update_claim_status(
        &self,
        id: i64,
        decision: Decision,
        note: &str,
    ) -> Result<BackendReply>;
    async fn assign_agent(&self, claim_id: i64, agent_id: i64) -> Result<BackendReply>;
    async fn delete_claim(&self, id: i64) -> Result<BackendReply>;
    async fn verify_description(&self, id: i64) -> Result<BackendReply>;
}

#[async_trait]
pub trait DocumentsApi: Send + Sync {
    async fn upload_document(&self, claim_id: i64, upload: &DocumentUpload)
    -> Result<BackendReply>;
    async fn list_documents(&self, claim_id: i64) -> Result<Vec<Document>>;
    /// Direct download URL for a stored file; `None` for an empty name.
    fn document_url(&self, file_name: &str) -> Option<String>;
}

#[async_trait]
pub trait FraudApi: Send + Sync {
    /// Runs the remote fraud scorer over the claim's first image document.
    async fn trigger_fraud_analysis(&self, claim_id: i64) -> Result<FraudResult>;
    /// Latest stored verdict. Never fails; absence is `NotAnalyzed`.
    async fn fraud_result(&self, claim_id: i64) -> FraudOutcome;
    /// Never fails; an unreachable backend reads as "unavailable".
    async fn ai_service_health(&self) -> AiServiceHealth;
    async fn fraud_statistics(&self) -> Result<FraudStatistics>;
}

/// Everything the view layer needs from the backend besides authentication.
pub trait PortalApi: ClaimsApi + DocumentsApi + FraudApi {}

impl<T: ClaimsApi + DocumentsApi + FraudApi> PortalApi for T {}

/// HTTP implementation of the backend traits.
#[derive(Clone)]
pub struct Gateway {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl Gateway {
    pub fn new(config: &PortalConfig, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self::with_client(client, &config.api_base_url, tokens))
    }

    pub fn with_client(client: Client, base_url: &str, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer_token(&self) -> Option<String> {
        match self.tokens.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                warn!(error = %e, "Could not read token, sending request unauthenticated");
                None
            }
        }
    }

    /// Issues one request and returns the raw body of a 2xx response.
    async fn call<F>(&self, method: Method, path: &str, customize: F) -> Result<String>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder + Send,
    {
        let correlation_id = Uuid::new_v4().to_string();
        let span = info_span!(
            "backend_request",
            method = %method,
            path = %path,
            correlation_id = %correlation_id
        );

        async move {
            let mut request = self
                .client
                .request(method, self.url(path))
                .header(CORRELATION_HEADER, &correlation_id);
            if let Some(token) = self.bearer_token() {
                request = request.bearer_auth(token);
            }

            let response = customize(request).send().await.map_err(|e| {
                warn!(error = %e, "Backend unreachable");
                PortalError::Transport(e)
            })?;
            let status = response.status();
            let body = response.text().await?;

            if !status.is_success() {
                let message = extract_message(&body, "");
                warn!(status = status.as_u16(), message = %message, "Backend rejected request");
                return Err(PortalError::Backend {
                    status: status.as_u16(),
                    message,
                });
            }

            debug!(status = status.as_u16(), bytes = body.len(), "Backend responded");
            Ok(body)
        }
        .instrument(span)
        .await
    }

    async fn get_value(&self, path: &str) -> Result<Value> {
        let body = self.call(Method::GET, path, |r| r).await?;
        parse_body(&body)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        Ok(serde_json::from_value(self.get_value(path).await?)?)
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str, field: &str) -> Result<Vec<T>> {
        let value = self.get_value(path).await?;
        match ListShape::classify(value, field) {
            ListShape::Bare(items) | ListShape::Envelope { items, .. } => decode_items(items),
            ListShape::Unrecognized => {
                warn!(path = %path, "List response in unrecognized shape, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    async fn mutate<F>(&self, method: Method, path: &str, customize: F) -> Result<BackendReply>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder + Send,
    {
        let body = self.call(method, path, customize).await?;
        Ok(BackendReply::from_body(&body))
    }
}

fn parse_body(body: &str) -> Result<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(body)?)
}

fn decode_items<T: DeserializeOwned>(items: Vec<Value>) -> Result<Vec<T>> {
    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(PortalError::from))
        .collect()
}

/// The shapes a list endpoint answers with.
#[derive(Debug, PartialEq)]
enum ListShape {
    Bare(Vec<Value>),
    /// The array under a known field plus the remaining fields (pagination).
    Envelope {
        items: Vec<Value>,
        meta: Map<String, Value>,
    },
    Unrecognized,
}

impl ListShape {
    fn classify(value: Value, field: &str) -> Self {
        match value {
            Value::Array(items) => ListShape::Bare(items),
            Value::Object(mut map) => match map.remove(field) {
                Some(Value::Array(items)) => ListShape::Envelope { items, meta: map },
                _ => ListShape::Unrecognized,
            },
            _ => ListShape::Unrecognized,
        }
    }

    fn into_page<T: DeserializeOwned>(self) -> Result<(Vec<T>, u64, u32, u32)> {
        match self {
            ListShape::Bare(items) => {
                let items: Vec<T> = decode_items(items)?;
                let total = items.len() as u64;
                Ok((items, total, 1, 0))
            }
            ListShape::Envelope { items, meta } => {
                let items: Vec<T> = decode_items(items)?;
                let number = |key: &str| meta.get(key).and_then(Value::as_u64);
                let total_items = number("totalItems").unwrap_or(items.len() as u64);
                let total_pages = number("totalPages").unwrap_or(1) as u32;
                let current_page = number("currentPage").unwrap_or(0) as u32;
                Ok((items, total_items, total_pages, current_page))
            }
            ListShape::Unrecognized => Ok((Vec::new(), 0, 1, 0)),
        }
    }
}
