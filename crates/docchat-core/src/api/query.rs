use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ensure_success, into_byte_stream, ApiClient};
use crate::backend::{ByteStream, QueryBackend};
use crate::record::Source;

pub const DEFAULT_TOP_K: u32 = 8;

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    top_k: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<Source>,
}

impl ApiClient {
    /// Ask the knowledge base and wait for the whole answer.
    pub async fn query(&self, query: &str, top_k: u32) -> Result<QueryResponse> {
        let response = self
            .post("/rag/query")
            .json(&QueryRequest { query, top_k })
            .send()
            .await?;

        let response = ensure_success(response, "Query").await?;
        Ok(response.json().await?)
    }

    /// Ask the knowledge base and receive the answer as NDJSON.
    pub async fn query_stream(&self, query: &str, top_k: u32) -> Result<ByteStream> {
        let response = self
            .post("/rag/query_stream")
            .json(&QueryRequest { query, top_k })
            .send()
            .await?;

        let response = ensure_success(response, "Streaming query").await?;
        Ok(into_byte_stream(response))
    }
}

/// The shared, authenticated knowledge base as a chat backend.
#[derive(Clone)]
pub struct KnowledgeBase {
    api: ApiClient,
    top_k: u32,
}

impl KnowledgeBase {
    pub fn new(api: ApiClient, top_k: u32) -> Self {
        Self { api, top_k }
    }
}

#[async_trait]
impl QueryBackend for KnowledgeBase {
    async fn open_stream(&self, query: &str) -> Result<ByteStream> {
        self.api.query_stream(query, self.top_k).await
    }
}
