use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ensure_success, ApiClient};
use crate::backend::HistoryStore;
use crate::state::{ChatMessage, ChatRole};

#[derive(Serialize)]
struct SaveMessageRequest<'a> {
    role: ChatRole,
    content: &'a str,
}

#[derive(Deserialize)]
struct ConversationHistory {
    messages: Vec<ChatMessage>,
}

impl ApiClient {
    pub async fn save_message(&self, role: ChatRole, content: &str) -> Result<()> {
        let response = self
            .post("/conversations/save")
            .json(&SaveMessageRequest { role, content })
            .send()
            .await?;
        ensure_success(response, "Saving message").await?;
        Ok(())
    }

    /// The caller's stored conversation, oldest first.
    pub async fn conversation_history(&self) -> Result<Vec<ChatMessage>> {
        let response = self.get("/conversations/history").send().await?;
        let response = ensure_success(response, "Loading history").await?;
        let history: ConversationHistory = response.json().await?;
        Ok(history.messages)
    }

    pub async fn clear_conversations(&self) -> Result<()> {
        let response = self.delete("/conversations/clear").send().await?;
        ensure_success(response, "Clearing history").await?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for ApiClient {
    async fn fetch_all(&self) -> Result<Vec<ChatMessage>> {
        self.conversation_history().await
    }

    async fn append(&self, role: ChatRole, content: &str) -> Result<()> {
        self.save_message(role, content).await
    }

    async fn clear_all(&self) -> Result<()> {
        self.clear_conversations().await
    }
}
