use anyhow::Result;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use claims_client::{
    ClaimDesk, ClaimForm, ClaimQuery, Decision, DocumentUpload, Liveness, Refetched,
    StatusFilter,
};

use super::documents::read_upload;
use super::{App, Inline};
use crate::cli::SubmitArgs;
use crate::render;

pub async fn dashboard(app: &App, desk: &ClaimDesk) -> Result<()> {
    let dashboard = desk.dashboard().await.inline("Failed to load dashboard")?;
    app.printer.emit(
        render::dashboard(&desk.session().user(), &dashboard),
        render::dashboard_json(&dashboard),
    );
    Ok(())
}

pub async fn list(
    app: &App,
    desk: &ClaimDesk,
    status: &str,
    page: Option<u32>,
    size: Option<u32>,
    watch: Option<u64>,
) -> Result<()> {
    let filter: StatusFilter = status.parse()?;

    if page.is_some() || size.is_some() {
        let query = ClaimQuery {
            page,
            size,
            status: filter.status(),
            ..ClaimQuery::default()
        };
        let page = desk.claim_page(&query).await.inline("Failed to load claims")?;
        app.printer.emit(
            format!(
                "{}\nPage {} of {} ({} claims)",
                render::claims_table(&page.items),
                page.current_page + 1,
                page.total_pages.max(1),
                page.total_items
            ),
            json!(page),
        );
        return Ok(());
    }

    let Some(secs) = watch else {
        let claims = desk.load_claims(filter).await.inline("Failed to load claims")?;
        app.printer
            .emit(render::claims_table(&claims), json!(claims));
        return Ok(());
    };

    watch_claims(app, desk, filter, Duration::from_secs(secs.max(1))).await
}

/// Re-fetches the list until Ctrl-C. A fetch still in flight when the view
/// closes is discarded rather than printed.
async fn watch_claims(
    app: &App,
    desk: &ClaimDesk,
    filter: StatusFilter,
    interval: Duration,
) -> Result<()> {
    let live = Liveness::new();
    let stopped = Arc::new(Notify::new());
    {
        let live = live.clone();
        let stopped = stopped.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                live.end();
                stopped.notify_one();
            }
        });
    }

    info!(filter = %filter, every_secs = interval.as_secs(), "Watching claims");
    while live.is_live() {
        let Some(result) = live.settle(desk.load_claims(filter)).await else {
            break;
        };
        match result {
            Ok(claims) => {
                let stamp = chrono::Local::now().format("%H:%M:%S");
                app.printer.emit(
                    format!("[{stamp}] {} claims\n{}\n", claims.len(), render::claims_table(&claims)),
                    json!(claims),
                );
            }
            Err(e) => warn!(error = %e, "Refresh failed"),
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = stopped.notified() => break,
        }
    }
    debug!("Claim watch ended");
    Ok(())
}

pub async fn show(app: &App, desk: &ClaimDesk, id: i64) -> Result<()> {
    let workspace = desk
        .open_workspace(id)
        .await
        .inline("Failed to load claim details")?;
    app.printer.emit(
        render::workspace(&workspace, |doc| desk.document_url(doc)),
        render::workspace_json(&workspace),
    );
    Ok(())
}

pub async fn submit(app: &App, desk: &ClaimDesk, args: SubmitArgs) -> Result<()> {
    let mut form = ClaimForm {
        claim_type_id: args.claim_type,
        amount: args.amount,
        description: args.description,
        ..ClaimForm::for_session(desk.session())
    };
    if let Some(policy) = args.policy {
        form.policy_number = policy;
    }

    let mut uploads: Vec<DocumentUpload> = Vec::with_capacity(args.files.len());
    for path in &args.files {
        uploads.push(read_upload(path).await?);
    }

    let submitted = desk
        .submit_claim(&form, &uploads)
        .await
        .inline("Failed to submit claim")?;

    let mut text = match submitted.reply.id() {
        Some(id) => format!("Claim #{id} submitted."),
        None => "Claim submitted.".to_string(),
    };
    for name in &submitted.uploaded {
        text.push_str(&format!("\nUploaded {name}"));
    }
    for (name, message) in &submitted.failed_uploads {
        text.push_str(&format!("\nCould not upload {name}: {message}"));
    }
    app.printer.emit(
        text,
        json!({
            "claim": submitted.reply.value(),
            "uploaded": submitted.uploaded,
            "failedUploads": submitted
                .failed_uploads
                .iter()
                .map(|(file, message)| json!({ "file": file, "message": message }))
                .collect::<Vec<_>>(),
        }),
    );
    Ok(())
}

pub async fn claim_types(app: &App, desk: &ClaimDesk) -> Result<()> {
    let types = desk.claim_types().await;
    app.printer.emit(render::claim_types(&types), json!(types));
    Ok(())
}

pub async fn decide(
    app: &App,
    desk: &ClaimDesk,
    id: i64,
    decision: Decision,
    note: &str,
) -> Result<()> {
    let outcome = desk
        .decide_by_id(id, decision, note)
        .await
        .inline("Failed to update claim status")?;
    let text = match outcome.latest() {
        Some(claim) => format!("Claim #{} is now {}.", claim.id, claim.status),
        None => format!("Claim #{id} is now {}.", decision.target()),
    };
    emit_refetched(app, text, &outcome, "Could not reload the claim");
    Ok(())
}

pub async fn delete(app: &App, desk: &ClaimDesk, id: i64) -> Result<()> {
    let claim = desk.claim(id).await.inline("Failed to load claim")?;
    let outcome = desk
        .delete_claim(&claim)
        .await
        .inline("Failed to delete claim")?;
    let mut text = format!("Claim #{id} deleted.");
    if let Some(remaining) = outcome.latest() {
        text.push_str(&format!("\n\n{}", render::claims_table(remaining)));
    }
    emit_refetched(app, text, &outcome, "Could not reload your claims");
    Ok(())
}

pub async fn verify(app: &App, desk: &ClaimDesk, id: i64) -> Result<()> {
    let claim = desk.claim(id).await.inline("Failed to load claim")?;
    let outcome = desk
        .verify_description(&claim)
        .await
        .inline("Failed to verify description")?;
    emit_refetched(
        app,
        format!("Claim #{id} description verified."),
        &outcome,
        "Could not reload the claim",
    );
    Ok(())
}

pub async fn assign(app: &App, desk: &ClaimDesk, id: i64, agent_id: i64) -> Result<()> {
    let outcome = desk
        .assign_agent(id, agent_id)
        .await
        .inline("Failed to assign agent")?;
    emit_refetched(
        app,
        format!("Claim #{id} assigned to agent {agent_id}."),
        &outcome,
        "Could not reload the claim",
    );
    Ok(())
}

pub async fn reports(app: &App, desk: &ClaimDesk) -> Result<()> {
    let dashboard = desk.dashboard().await.inline("Failed to load claims")?;
    let statistics = desk
        .fraud_statistics()
        .await
        .inline("Failed to load fraud statistics")?;
    let health = desk.ai_service_health().await;

    app.printer.emit(
        format!(
            "{}\n\nFraud analysis\n{}\n\n{}",
            render::dashboard(&desk.session().user(), &dashboard),
            render::statistics(&statistics),
            render::health(&health)
        ),
        json!({
            "claims": render::dashboard_json(&dashboard),
            "fraud": statistics,
            "aiService": health,
        }),
    );
    Ok(())
}

/// Prints a write that went through. A failed refetch is a note, not an error.
pub(super) fn emit_refetched<T: Serialize>(
    app: &App,
    mut text: String,
    outcome: &Refetched<T>,
    stale: &str,
) {
    if let Err(e) = &outcome.latest {
        text.push_str(&format!("\n{stale}: {}", e.user_message("refresh failed")));
    }
    app.printer.emit(text, render::refetched_json(outcome));
}
