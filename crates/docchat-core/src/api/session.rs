use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::multipart::Form;
use serde::Deserialize;

use super::documents::pdf_part;
use super::{ensure_success, into_byte_stream, ApiClient};
use crate::backend::{ByteStream, QueryBackend};

pub const DEFAULT_SESSION_TOP_K: u32 = 5;

/// An anonymous, in-memory chat over one uploaded PDF
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionInfo {
    #[serde(rename = "session_id")]
    pub id: String,
    pub filename: String,
}

impl ApiClient {
    /// Upload a PDF for a temporary session. No account required.
    pub async fn upload_pdf_session(&self, path: &Path) -> Result<SessionInfo> {
        let form = Form::new().part("file", pdf_part(path).await?);

        let response = self.post("/chat/upload").multipart(form).send().await?;
        let response = ensure_success(response, "PDF upload").await?;
        Ok(response.json().await?)
    }

    pub async fn query_session(&self, session_id: &str, query: &str, top_k: u32) -> Result<ByteStream> {
        let form = Form::new()
            .text("session_id", session_id.to_string())
            .text("query", query.to_string())
            .text("top_k", top_k.to_string());

        let response = self.post("/chat/query").multipart(form).send().await?;
        let response = ensure_success(response, "Session query").await?;
        Ok(into_byte_stream(response))
    }
}

/// An uploaded PDF session as a chat backend.
#[derive(Clone)]
pub struct PdfSession {
    api: ApiClient,
    info: SessionInfo,
    top_k: u32,
}

impl PdfSession {
    pub fn new(api: ApiClient, info: SessionInfo, top_k: u32) -> Self {
        Self { api, info, top_k }
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }
}

#[async_trait]
impl QueryBackend for PdfSession {
    async fn open_stream(&self, query: &str) -> Result<ByteStream> {
        self.api.query_session(&self.info.id, query, self.top_k).await
    }
}
