use async_trait::async_trait;
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use tracing::info;

use super::{DocumentsApi, Gateway};
use crate::error::Result;
use crate::models::{BackendReply, Document, DocumentUpload};

#[async_trait]
impl DocumentsApi for Gateway {
    async fn upload_document(
        &self,
        claim_id: i64,
        upload: &DocumentUpload,
    ) -> Result<BackendReply> {
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.content_type)?;
        let form = Form::new().part("file", part);
        let path = format!("/claims/{claim_id}/documents");
        let reply = self.mutate(Method::POST, &path, |r| r.multipart(form)).await?;
        info!(
            claim_id,
            file_name = %upload.file_name,
            bytes = upload.bytes.len(),
            "Document uploaded"
        );
        Ok(reply)
    }

    async fn list_documents(&self, claim_id: i64) -> Result<Vec<Document>> {
        let mut documents: Vec<Document> = self
            .get_list(&format!("/claims/{claim_id}/documents"), "documents")
            .await?;
        for document in &mut documents {
            document.claim_id.get_or_insert(claim_id);
        }
        Ok(documents)
    }

    fn document_url(&self, file_name: &str) -> Option<String> {
        if file_name.is_empty() {
            return None;
        }
        Some(format!(
            "{}/documents/{}",
            self.base_url,
            urlencoding::encode(file_name)
        ))
    }
}
