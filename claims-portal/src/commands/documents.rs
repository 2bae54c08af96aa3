use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;

use claims_client::{ClaimDesk, DocumentUpload};

use super::claims::emit_refetched;
use super::{App, Inline};
use crate::render;

pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

pub async fn read_upload(path: &Path) -> Result<DocumentUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("File name is not valid UTF-8")?
        .to_string();
    Ok(DocumentUpload {
        file_name,
        content_type: content_type_for(path).to_string(),
        bytes,
    })
}

pub async fn upload(app: &App, desk: &ClaimDesk, claim_id: i64, path: &Path) -> Result<()> {
    let upload = read_upload(path).await?;
    let outcome = desk
        .upload_document(claim_id, &upload)
        .await
        .inline("Failed to upload document")?;
    let mut text = format!("Uploaded {} to claim #{claim_id}.", upload.file_name);
    if let Some(documents) = outcome.latest() {
        text.push_str("\n\n");
        text.push_str(&render::documents(documents, |doc| desk.document_url(doc)));
    }
    emit_refetched(app, text, &outcome, "Could not reload the document list");
    Ok(())
}

pub async fn list(app: &App, desk: &ClaimDesk, claim_id: i64) -> Result<()> {
    let documents = desk
        .documents(claim_id)
        .await
        .inline("Failed to load documents")?;
    let urls: Vec<_> = documents.iter().map(|d| desk.document_url(d)).collect();
    app.printer.emit(
        render::documents(&documents, |doc| desk.document_url(doc)),
        json!({ "claimId": claim_id, "documents": documents, "urls": urls }),
    );
    Ok(())
}
