//! Text rendering for terminal output.

use chrono::NaiveDateTime;
use serde_json::{Value, json};
use std::fmt::Write;

use claims_client::models::FraudDetails;
use claims_client::{
    AiServiceHealth, Claim, ClaimType, ClaimWorkspace, Dashboard, Document, FraudOutcome,
    FraudResult, FraudStatistics, Refetched, UserIdentity,
};
use serde::Serialize;

/// Where command results go: text or JSON on stdout.
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    pub json: bool,
}

impl Printer {
    pub fn emit(&self, text: String, json: Value) {
        if self.json {
            match serde_json::to_string_pretty(&json) {
                Ok(encoded) => println!("{encoded}"),
                Err(_) => println!("{json}"),
            }
        } else {
            println!("{}", text.trim_end());
        }
    }
}

pub fn date(value: Option<NaiveDateTime>) -> String {
    value
        .map(|d| d.format("%d %b %Y").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn amount(value: f64) -> String {
    format!("{value:.2}")
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

pub fn user(user: &UserIdentity) -> String {
    let mut out = format!("{} <{}>\nRole: {}", user.name, user.email, user.role);
    if let Some(policy) = &user.policy_number {
        let _ = write!(out, "\nPolicy: {policy}");
    }
    out
}

pub fn claims_table(claims: &[Claim]) -> String {
    if claims.is_empty() {
        return "No claims found.".to_string();
    }
    let mut out = format!(
        "{:>6}  {:<14}  {:<18}  {:>12}  {:<10}  {:<12}  {}\n",
        "ID", "POLICY", "TYPE", "AMOUNT", "STATUS", "SUBMITTED", "DESCRIPTION"
    );
    for claim in claims {
        let _ = writeln!(
            out,
            "{:>6}  {:<14}  {:<18}  {:>12}  {:<10}  {:<12}  {}",
            claim.id,
            claim.policy_number.as_deref().unwrap_or("-"),
            truncate(claim.type_name().unwrap_or("-"), 18),
            amount(claim.amount),
            claim.status,
            date(claim.submission_date),
            truncate(&claim.description, 40),
        );
    }
    out
}

pub fn dashboard(user: &UserIdentity, dashboard: &Dashboard) -> String {
    let stats = &dashboard.stats;
    let mut out = format!("Welcome back, {}\n\n", user.name);
    let _ = writeln!(out, "Total claims:   {}", stats.total);
    let _ = writeln!(out, "Total amount:   {}", amount(stats.total_amount));
    let _ = writeln!(out, "Pending:        {}", stats.pending);
    let _ = writeln!(out, "Approved:       {}", stats.approved);
    let _ = writeln!(out, "Rejected:       {}", stats.rejected);
    out.push_str("\nRecent claims\n");
    out.push_str(&claims_table(&dashboard.recent));
    out
}

pub fn dashboard_json(dashboard: &Dashboard) -> Value {
    json!({ "stats": dashboard.stats, "recent": dashboard.recent })
}

/// The write's reply, plus the refetched copy or why it is missing.
pub fn refetched_json<T: Serialize>(outcome: &Refetched<T>) -> Value {
    match &outcome.latest {
        Ok(latest) => json!({ "reply": outcome.reply.value(), "latest": latest }),
        Err(e) => json!({
            "reply": outcome.reply.value(),
            "latest": Value::Null,
            "refetchError": e.user_message("refresh failed"),
        }),
    }
}

pub fn claim_types(types: &[ClaimType]) -> String {
    types
        .iter()
        .map(|t| format!("{:>3}  {}", t.id, t.name))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn documents(documents: &[Document], url: impl Fn(&Document) -> Option<String>) -> String {
    if documents.is_empty() {
        return "No documents uploaded.".to_string();
    }
    documents
        .iter()
        .map(|doc| {
            format!(
                "- {} ({}){}",
                doc.display_name(),
                doc.file_type.as_deref().unwrap_or("unknown type"),
                url(doc).map(|u| format!("\n  {u}")).unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn workspace(
    workspace: &ClaimWorkspace,
    url: impl Fn(&Document) -> Option<String>,
) -> String {
    let details = &workspace.details;
    let customer = details.customer();
    let mut out = format!("Claim #{} [{}]\n", details.id, details.status);
    let _ = writeln!(out, "Policy:       {}", details.policy_number.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "Type:         {}", details.claim_type_name.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "Amount:       {}", amount(details.amount));
    let _ = writeln!(out, "Submitted:    {}", date(details.submission_date));
    let _ = writeln!(
        out,
        "Verified:     {}",
        if details.description_verified { "yes" } else { "no" }
    );
    let _ = writeln!(out, "Description:  {}", details.description);
    if let Some(response) = details.agent_response.as_deref() {
        let _ = writeln!(out, "Response:     {response}");
    }
    if let Some(agent) = details.assigned_agent_name.as_deref() {
        let _ = writeln!(out, "Agent:        {agent}");
    }

    out.push_str("\nCustomer\n");
    let _ = writeln!(out, "  Name:   {}", customer.name.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "  Email:  {}", customer.email.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "  Phone:  {}", customer.phone.as_deref().unwrap_or("-"));
    if let Some(aadhar) = customer.aadhar.as_deref() {
        let _ = writeln!(
            out,
            "  Aadhar: {}",
            claims_client::validation::format_aadhar(aadhar)
        );
    }

    out.push_str("\nDocuments\n");
    out.push_str(&documents(&workspace.documents, url));
    out.push_str("\n\nFraud analysis\n");
    out.push_str(&fraud_outcome(&workspace.fraud));
    out
}

pub fn workspace_json(workspace: &ClaimWorkspace) -> Value {
    json!({
        "details": workspace.details,
        "documents": workspace.documents,
        "fraud": fraud_outcome_json(&workspace.fraud),
    })
}

pub fn fraud_outcome(outcome: &FraudOutcome) -> String {
    match outcome {
        FraudOutcome::Analyzed(result) => fraud_result(result),
        FraudOutcome::NotAnalyzed { message } => message.clone(),
    }
}

pub fn fraud_outcome_json(outcome: &FraudOutcome) -> Value {
    match outcome {
        FraudOutcome::Analyzed(result) => json!(result),
        FraudOutcome::NotAnalyzed { message } => json!({ "analyzed": false, "message": message }),
    }
}

pub fn fraud_result(result: &FraudResult) -> String {
    let mut out = format!(
        "Verdict:     {}\nFraud score: {}/100\nConfidence:  {}%\n",
        result.image_status.label(),
        result.fraud_score,
        result.confidence
    );
    if let Some(remarks) = result.remarks.as_deref() {
        let _ = writeln!(out, "Remarks:     {remarks}");
    }
    if result.analysis_date.is_some() {
        let _ = writeln!(out, "Analyzed:    {}", date(result.analysis_date));
    }
    if let Some(details) = result.details() {
        out.push_str(&fraud_details(&details));
    }
    out
}

fn fraud_details(details: &FraudDetails) -> String {
    let mut out = String::new();
    if let Some(quality) = details.image_quality.as_deref() {
        let _ = writeln!(out, "Quality:     {quality}");
    }
    if let Some(method) = details.detection_method.as_deref() {
        let _ = writeln!(out, "Method:      {method}");
    }
    if !details.metadata_flags.is_empty() {
        let _ = writeln!(out, "Flags:       {}", details.metadata_flags.join(", "));
    }
    for warning in &details.warnings {
        let _ = writeln!(out, "Warning:     {warning}");
    }
    out
}

pub fn health(health: &AiServiceHealth) -> String {
    format!(
        "AI service: {} ({})\n{}",
        if health.ai_service_available { "available" } else { "unavailable" },
        health.status,
        health.message
    )
}

pub fn statistics(stats: &FraudStatistics) -> String {
    format!(
        "Analyzed:   {}\nGenuine:    {}\nSuspicious: {}\nFraud:      {}",
        stats.total_analyzed, stats.genuine_count, stats.suspicious_count, stats.fraud_count
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims_client::{ClaimStatus, ImageStatus, Role};

    #[test]
    fn empty_lists_render_neutral_text() {
        assert_eq!(claims_table(&[]), "No claims found.");
        assert_eq!(documents(&[], |_| None), "No documents uploaded.");
        assert_eq!(
            fraud_outcome(&FraudOutcome::not_analyzed()),
            "No fraud analysis performed for this claim yet"
        );
    }

    #[test]
    fn claim_rows_show_status_and_amount() {
        let claims = vec![Claim {
            id: 12,
            policy_number: Some("POL-00001234".into()),
            claim_type_name: Some("Home Insurance".into()),
            amount: 15000.5,
            description: "Water damage in the kitchen".into(),
            status: ClaimStatus::InReview,
            ..Claim::default()
        }];
        let table = claims_table(&claims);
        assert!(table.contains("IN_REVIEW"));
        assert!(table.contains("15000.50"));
        assert!(table.contains("POL-00001234"));
    }

    #[test]
    fn long_text_is_truncated() {
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("abc", 4), "abc");
    }

    #[test]
    fn fraud_verdict_text() {
        let result: FraudResult = serde_json::from_value(json!({
            "imageStatus": "FRAUD", "fraudScore": 91, "confidence": 77,
            "details": {"warnings": ["Edited in software"]}
        }))
        .unwrap();
        assert_eq!(result.image_status, ImageStatus::Fraud);
        let text = fraud_result(&result);
        assert!(text.contains("FRAUD DETECTED"));
        assert!(text.contains("91/100"));
        assert!(text.contains("Warning:     Edited in software"));
        assert_eq!(
            fraud_outcome_json(&FraudOutcome::not_analyzed())["analyzed"],
            false
        );
    }

    #[test]
    fn refetch_failure_keeps_the_reply() {
        let outcome: Refetched<Claim> = Refetched {
            reply: claims_client::BackendReply(json!({"id": 9, "status": "APPROVED"})),
            latest: Err(claims_client::PortalError::Backend {
                status: 503,
                message: "Service Unavailable".into(),
            }),
        };
        let value = refetched_json(&outcome);
        assert_eq!(value["reply"]["status"], "APPROVED");
        assert_eq!(value["latest"], Value::Null);
        assert_eq!(value["refetchError"], "Service Unavailable");
    }

    #[test]
    fn identity_includes_policy_when_present() {
        let identity = UserIdentity {
            name: "John Doe".into(),
            email: "john@example.com".into(),
            role: Role::Customer,
            policy_number: Some("POL-1".into()),
        };
        assert_eq!(
            user(&identity),
            "John Doe <john@example.com>\nRole: CUSTOMER\nPolicy: POL-1"
        );
    }
}
