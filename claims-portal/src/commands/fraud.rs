use anyhow::Result;
use serde_json::json;

use claims_client::ClaimDesk;

use super::{App, Inline};
use crate::render;

pub async fn analyze(app: &App, desk: &ClaimDesk, claim_id: i64) -> Result<()> {
    let result = desk
        .run_fraud_analysis(claim_id)
        .await
        .inline("Fraud analysis failed")?;
    app.printer.emit(
        format!("Fraud analysis for claim #{claim_id}\n{}", render::fraud_result(&result)),
        json!(result),
    );
    Ok(())
}

pub async fn verdict(app: &App, desk: &ClaimDesk, claim_id: i64) -> Result<()> {
    let outcome = desk.fraud_result(claim_id).await;
    app.printer.emit(
        render::fraud_outcome(&outcome),
        render::fraud_outcome_json(&outcome),
    );
    Ok(())
}

pub async fn health(app: &App, desk: &ClaimDesk) -> Result<()> {
    let health = desk.ai_service_health().await;
    app.printer.emit(render::health(&health), json!(health));
    Ok(())
}

pub async fn statistics(app: &App, desk: &ClaimDesk) -> Result<()> {
    let stats = desk
        .fraud_statistics()
        .await
        .inline("Failed to load fraud statistics")?;
    app.printer.emit(render::statistics(&stats), json!(stats));
    Ok(())
}
