use std::path::Path;

use anyhow::{anyhow, Result};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use super::{ensure_success, ApiClient};

/// A document in the shared knowledge base
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub id: String,
    pub title: Option<String>,
    pub uploaded_by: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestResponse {
    pub doc_id: String,
    pub title: Option<String>,
}

/// Read a PDF from disk into a multipart file part.
pub(crate) async fn pdf_part(path: &Path) -> Result<Part> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("Invalid file path: {}", path.display()))?
        .to_string();
    let contents = tokio::fs::read(path).await?;

    Ok(Part::bytes(contents)
        .file_name(file_name)
        .mime_str("application/pdf")?)
}

impl ApiClient {
    /// Admin only: ingest a PDF into the shared knowledge base.
    pub async fn upload_document(&self, path: &Path, title: Option<&str>) -> Result<IngestResponse> {
        let mut form = Form::new().part("file", pdf_part(path).await?);
        if let Some(title) = title {
            form = form.text("title", title.to_string());
        }

        let response = self.post("/admin/ingest_pdf").multipart(form).send().await?;
        let response = ensure_success(response, "Document upload").await?;
        Ok(response.json().await?)
    }

    pub async fn list_documents(&self) -> Result<Vec<DocumentInfo>> {
        let response = self.get("/admin/documents").send().await?;
        let response = ensure_success(response, "Listing documents").await?;
        Ok(response.json().await?)
    }

    pub async fn delete_document(&self, doc_id: &str) -> Result<()> {
        let response = self
            .delete(&format!("/admin/document/{}", doc_id))
            .send()
            .await?;
        ensure_success(response, "Document delete").await?;
        Ok(())
    }
}
