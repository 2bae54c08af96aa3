use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::lifecycle::ClaimStatus;

/// Backend fields that may arrive as `null` are read as their default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Scores are percentages; anything outside 0–100 is clamped.
fn percentage<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0);
    Ok(raw.round().clamp(0.0, 100.0) as u8)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Customer,
    Agent,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Customer => "CUSTOMER",
            Role::Agent => "AGENT",
            Role::Admin => "ADMIN",
        }
    }

    pub fn is_staff(self) -> bool {
        matches!(self, Role::Agent | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CUSTOMER" => Ok(Role::Customer),
            "AGENT" => Ok(Role::Agent),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Payload of `POST /auth/login` and `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    pub role: Role,
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub policy_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimType {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ClaimType {
    /// Offered when the backend has no claim types to list.
    pub fn defaults() -> Vec<ClaimType> {
        [
            (1, "Auto Insurance"),
            (2, "Home Insurance"),
            (3, "Health Insurance"),
            (4, "Travel Insurance"),
        ]
        .into_iter()
        .map(|(id, name)| ClaimType {
            id,
            name: name.to_string(),
            description: None,
        })
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "phoneNumber")]
    pub phone: Option<String>,
    #[serde(default, alias = "aadharNumber")]
    pub aadhar: Option<String>,
}

/// A claim as listed by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub id: i64,
    #[serde(default)]
    pub policy_number: Option<String>,
    #[serde(default)]
    pub claim_type_id: Option<i64>,
    #[serde(default)]
    pub claim_type_name: Option<String>,
    /// The claim entity nests its type instead of flattening it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_type: Option<ClaimType>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub amount: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    pub status: ClaimStatus,
    #[serde(default)]
    pub submission_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub agent_response: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description_verified: bool,
    #[serde(default)]
    pub customer: Option<Customer>,
}

impl Claim {
    pub fn type_id(&self) -> Option<i64> {
        self.claim_type_id
            .or_else(|| self.claim_type.as_ref().map(|t| t.id))
    }

    pub fn type_name(&self) -> Option<&str> {
        self.claim_type_name
            .as_deref()
            .or_else(|| self.claim_type.as_ref().map(|t| t.name.as_str()))
    }

    /// `agentResponse` is present exactly when the claim has been decided.
    pub fn has_consistent_response(&self) -> bool {
        let responded = self
            .agent_response
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty());
        responded == self.status.is_terminal()
    }
}

/// `GET /claims/{id}/details`: the claim with flattened customer and agent
/// fields plus its documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimDetails {
    pub id: i64,
    #[serde(default)]
    pub policy_number: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub amount: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    pub status: ClaimStatus,
    #[serde(default)]
    pub submission_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub agent_response: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description_verified: bool,
    #[serde(default)]
    pub claim_type_id: Option<i64>,
    #[serde(default)]
    pub claim_type_name: Option<String>,
    #[serde(default)]
    pub customer_id: Option<i64>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub customer_aadhar: Option<String>,
    #[serde(default)]
    pub customer_policy_number: Option<String>,
    #[serde(default)]
    pub assigned_agent_id: Option<i64>,
    #[serde(default)]
    pub assigned_agent_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub documents: Vec<Document>,
}

impl ClaimDetails {
    pub fn customer(&self) -> Customer {
        Customer {
            name: self.customer_name.clone(),
            email: self.customer_email.clone(),
            phone: self.customer_phone.clone(),
            aadhar: self.customer_aadhar.clone(),
        }
    }

    pub fn to_claim(&self) -> Claim {
        Claim {
            id: self.id,
            policy_number: self.policy_number.clone(),
            claim_type_id: self.claim_type_id,
            claim_type_name: self.claim_type_name.clone(),
            claim_type: None,
            amount: self.amount,
            description: self.description.clone(),
            status: self.status,
            submission_date: self.submission_date,
            agent_response: self.agent_response.clone(),
            description_verified: self.description_verified,
            customer: Some(self.customer()),
        }
    }
}

/// Query parameters accepted by `GET /claims`. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ClaimStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<f64>,
}

/// One page of claims with the backend's pagination metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimPage {
    pub items: Vec<Claim>,
    pub total_items: u64,
    pub total_pages: u32,
    pub current_page: u32,
}

/// Body of `POST /claims`. Built only through [`crate::validation::ClaimForm`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClaim {
    pub policy_number: String,
    pub claim_type_id: i64,
    pub amount: f64,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub claim_id: Option<i64>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub document_name: Option<String>,
}

impl Document {
    /// Name under which the backend serves the file: last segment of
    /// `fileUrl`, else `fileName`.
    pub fn stored_file_name(&self) -> Option<&str> {
        self.file_url
            .as_deref()
            .and_then(|url| url.rsplit('/').next())
            .filter(|name| !name.is_empty())
            .or(self.file_name.as_deref())
            .filter(|name| !name.is_empty())
    }

    pub fn display_name(&self) -> &str {
        self.document_name
            .as_deref()
            .or(self.file_name.as_deref())
            .unwrap_or("Document")
    }

    pub fn is_image(&self) -> bool {
        self.file_type
            .as_deref()
            .is_some_and(|t| t.starts_with("image/"))
    }
}

/// A file to attach to a claim (`multipart/form-data`, field `file`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", from = "String")]
pub enum ImageStatus {
    Genuine,
    Suspicious,
    Fraud,
    Unknown,
}

impl From<String> for ImageStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "GENUINE" => ImageStatus::Genuine,
            "SUSPICIOUS" => ImageStatus::Suspicious,
            "FRAUD" => ImageStatus::Fraud,
            _ => ImageStatus::Unknown,
        }
    }
}

impl ImageStatus {
    pub fn label(self) -> &'static str {
        match self {
            ImageStatus::Genuine => "GENUINE",
            ImageStatus::Suspicious => "SUSPICIOUS",
            ImageStatus::Fraud => "FRAUD DETECTED",
            ImageStatus::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudDetails {
    #[serde(default)]
    pub image_quality: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata_flags: Vec<String>,
    #[serde(default)]
    pub detection_method: Option<String>,
    #[serde(default)]
    pub analysis_timestamp: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub warnings: Vec<String>,
}

/// Verdict of the remote fraud-scoring service for a claim's documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudResult {
    #[serde(default)]
    pub claim_id: Option<i64>,
    pub image_status: ImageStatus,
    #[serde(default, deserialize_with = "percentage")]
    pub fraud_score: u8,
    #[serde(default, deserialize_with = "percentage")]
    pub confidence: u8,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub analysis_date: Option<NaiveDateTime>,
    /// Stored either as an object or as a JSON-encoded string.
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default = "analyzed_default")]
    pub analyzed: bool,
}

fn analyzed_default() -> bool {
    true
}

impl FraudResult {
    pub fn details(&self) -> Option<FraudDetails> {
        match self.details.as_ref()? {
            Value::String(encoded) => serde_json::from_str(encoded).ok(),
            value @ Value::Object(_) => serde_json::from_value(value.clone()).ok(),
            _ => None,
        }
    }
}

/// Outcome of looking up the stored fraud verdict for a claim. Absence is a
/// normal state, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum FraudOutcome {
    Analyzed(FraudResult),
    NotAnalyzed { message: String },
}

impl FraudOutcome {
    pub const NO_ANALYSIS: &'static str = "No fraud analysis performed for this claim yet";

    pub fn not_analyzed() -> Self {
        FraudOutcome::NotAnalyzed {
            message: Self::NO_ANALYSIS.to_string(),
        }
    }

    pub fn is_analyzed(&self) -> bool {
        matches!(self, FraudOutcome::Analyzed(_))
    }

    pub fn result(&self) -> Option<&FraudResult> {
        match self {
            FraudOutcome::Analyzed(result) => Some(result),
            FraudOutcome::NotAnalyzed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiServiceHealth {
    pub ai_service_available: bool,
    pub status: String,
    pub message: String,
}

impl AiServiceHealth {
    pub const CONNECTED: &'static str = "Real AI service connected";
    pub const FALLBACK: &'static str = "Using mock AI service (fallback mode)";

    pub fn unreachable() -> Self {
        AiServiceHealth {
            ai_service_available: false,
            status: "unavailable".to_string(),
            message: Self::FALLBACK.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudStatistics {
    #[serde(default)]
    pub total_analyzed: u64,
    #[serde(default)]
    pub genuine_count: u64,
    #[serde(default)]
    pub suspicious_count: u64,
    #[serde(default)]
    pub fraud_count: u64,
}

/// A mutation's response body, passed through unmodified.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendReply(pub Value);

impl BackendReply {
    pub fn from_body(body: &str) -> Self {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return BackendReply(Value::Null);
        }
        BackendReply(
            serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string())),
        )
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// `id` of the returned entity, when the reply is one.
    pub fn id(&self) -> Option<i64> {
        self.0.get("id").and_then(Value::as_i64)
    }

    /// Plain-text replies such as "Claim deleted successfully".
    pub fn message(&self) -> Option<&str> {
        self.0
            .as_str()
            .or_else(|| self.0.get("message").and_then(Value::as_str))
    }

    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
        Ok(serde_json::from_value(self.0.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn claim_entity_with_nested_type_and_customer() {
        let claim: Claim = serde_json::from_value(json!({
            "id": 12,
            "policyNumber": "POL-00001234",
            "claimType": {"id": 2, "name": "Home Insurance"},
            "amount": 15000.5,
            "description": "Water damage",
            "status": "IN_REVIEW",
            "submissionDate": "2024-03-01T10:15:30.123",
            "agentResponse": null,
            "descriptionVerified": false,
            "customer": {"name": "John", "email": "john@example.com", "phoneNumber": "+919876543210", "aadharNumber": "123412341234"}
        }))
        .unwrap();

        assert_eq!(claim.type_id(), Some(2));
        assert_eq!(claim.type_name(), Some("Home Insurance"));
        assert_eq!(claim.status, ClaimStatus::InReview);
        assert!(claim.submission_date.is_some());
        let customer = claim.customer.as_ref().unwrap();
        assert_eq!(customer.phone.as_deref(), Some("+919876543210"));
        assert_eq!(customer.aadhar.as_deref(), Some("123412341234"));
        assert!(claim.has_consistent_response());
    }

    #[test]
    fn null_fields_read_as_defaults() {
        let claim: Claim = serde_json::from_value(json!({
            "id": 1, "status": "SUBMITTED", "amount": null, "description": null, "descriptionVerified": null
        }))
        .unwrap();
        assert_eq!(claim.amount, 0.0);
        assert_eq!(claim.description, "");
        assert!(!claim.description_verified);
    }

    #[test]
    fn decided_claim_without_response_is_inconsistent() {
        let claim = Claim {
            status: ClaimStatus::Approved,
            ..Claim::default()
        };
        assert!(!claim.has_consistent_response());
    }

    #[test]
    fn stored_file_name_prefers_url_segment() {
        let doc = Document {
            file_url: Some("uploads/claims/abc_photo 1.jpg".into()),
            file_name: Some("ignored.jpg".into()),
            ..Document::default()
        };
        assert_eq!(doc.stored_file_name(), Some("abc_photo 1.jpg"));

        let doc = Document {
            file_name: Some("receipt.pdf".into()),
            ..Document::default()
        };
        assert_eq!(doc.stored_file_name(), Some("receipt.pdf"));
        assert_eq!(doc.display_name(), "receipt.pdf");
        assert_eq!(Document::default().stored_file_name(), None);
    }

    #[test]
    fn fraud_result_scores_are_clamped_and_details_decoded() {
        let result: FraudResult = serde_json::from_value(json!({
            "imageStatus": "suspicious",
            "fraudScore": 140,
            "confidence": 72.4,
            "remarks": "EXIF data stripped",
            "details": "{\"imageQuality\":\"low\",\"metadataFlags\":[\"no_exif\"],\"warnings\":null}"
        }))
        .unwrap();
        assert_eq!(result.image_status, ImageStatus::Suspicious);
        assert_eq!(result.fraud_score, 100);
        assert_eq!(result.confidence, 72);
        assert!(result.analyzed);
        let details = result.details().unwrap();
        assert_eq!(details.image_quality.as_deref(), Some("low"));
        assert_eq!(details.metadata_flags, vec!["no_exif".to_string()]);
        assert!(details.warnings.is_empty());
    }

    #[test]
    fn unknown_image_status_is_tolerated() {
        let result: FraudResult =
            serde_json::from_value(json!({"imageStatus": "BLURRY", "fraudScore": 10, "confidence": 50}))
                .unwrap();
        assert_eq!(result.image_status, ImageStatus::Unknown);
    }

    #[test]
    fn backend_reply_keeps_text_and_json() {
        let text = BackendReply::from_body("Claim deleted successfully");
        assert_eq!(text.message(), Some("Claim deleted successfully"));
        let entity = BackendReply::from_body(r#"{"id": 41, "status": "SUBMITTED"}"#);
        assert_eq!(entity.id(), Some(41));
        assert_eq!(BackendReply::from_body("  ").value(), &Value::Null);
    }

    #[test]
    fn query_skips_unset_parameters() {
        let query = ClaimQuery {
            page: Some(2),
            status: Some(ClaimStatus::InReview),
            ..ClaimQuery::default()
        };
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({"page": 2, "status": "IN_REVIEW"})
        );
    }
}
