//! HTTP client for the RAG backend.
//!
//! Endpoints are grouped by concern: `auth` (accounts and tokens),
//! `documents` (admin ingestion), `query` (knowledge-base questions),
//! `conversations` (chat history) and `session` (anonymous PDF chats).

pub mod auth;
pub mod conversations;
pub mod documents;
pub mod query;
pub mod session;

use anyhow::{anyhow, Result};
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, Response};

use crate::backend::ByteStream;

pub use auth::{TokenResponse, UserInfo, UserRole};
pub use documents::{DocumentInfo, IngestResponse};
pub use query::{KnowledgeBase, QueryResponse};
pub use session::{PdfSession, SessionInfo};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Attach (or with `None`, drop) the bearer credential for later calls.
    pub fn set_auth_token(&mut self, token: Option<&str>) {
        self.token = token.map(str::to_string);
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorized(self.client.get(self.url(path)))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.authorized(self.client.post(self.url(path)))
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        self.authorized(self.client.delete(self.url(path)))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Turn a non-success status into an error carrying the response body.
async fn ensure_success(response: Response, what: &str) -> Result<Response> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(anyhow!("{} failed with status {}: {}", what, status, text));
    }
    Ok(response)
}

fn into_byte_stream(response: Response) -> ByteStream {
    Box::pin(response.bytes_stream().map(|chunk| chunk.map_err(anyhow::Error::from)))
}
