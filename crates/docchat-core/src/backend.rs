//! Seams between the chat driver and the services it talks to.

use std::pin::Pin;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;

use crate::state::{ChatMessage, ChatRole};

/// Raw response body of a streamed query, in transport-sized buffers.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Something that answers a question with a newline-delimited JSON stream.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Open the stream. Fails on network errors and non-success statuses.
    async fn open_stream(&self, query: &str) -> Result<ByteStream>;
}

/// Persistent conversation history owned by the backend.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<ChatMessage>>;
    async fn append(&self, role: ChatRole, content: &str) -> Result<()>;
    async fn clear_all(&self) -> Result<()>;
}

/// History store for conversations that are never persisted (ad-hoc PDF chat).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHistory;

#[async_trait]
impl HistoryStore for NoHistory {
    async fn fetch_all(&self) -> Result<Vec<ChatMessage>> {
        Ok(Vec::new())
    }

    async fn append(&self, _role: ChatRole, _content: &str) -> Result<()> {
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        Ok(())
    }
}
