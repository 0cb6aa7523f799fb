//! Drives one conversation: user turns, streamed answers, history persistence.
//!
//! A turn moves through `Idle -> Sending -> Streaming -> Settled -> Idle`.
//! The session owns its transcript exclusively for the whole turn, so every
//! buffer read from the transport is decoded, accumulated and published as a
//! unit before any other caller can observe or mutate the conversation.

use std::sync::Arc;

use anyhow::{bail, Result};
use futures_util::StreamExt;
use tracing::{debug, error, info, warn};

use crate::accumulator::ResponseAccumulator;
use crate::backend::{HistoryStore, QueryBackend};
use crate::ndjson::LineDecoder;
use crate::record::{Source, StreamRecord};
use crate::state::{ChatMessage, ChatRole};
use crate::transcript::Transcript;

/// Shown in place of the answer when the query could not be completed.
pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

/// What a UI needs to render the conversation at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptView {
    pub messages: Vec<ChatMessage>,
    pub loading: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TurnReport {
    pub answer: String,
    /// `None` when the stream ended without a completion record
    pub sources: Option<Vec<Source>>,
    /// Lines dropped because they were not valid JSON
    pub skipped_lines: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Empty or whitespace-only input; nothing happened
    Rejected,
    /// Another turn is still streaming
    Busy,
    Completed(TurnReport),
    Failed { error: String },
}

pub struct ChatSession {
    backend: Arc<dyn QueryBackend>,
    history: Arc<dyn HistoryStore>,
    transcript: Transcript,
    loading: bool,
    last_sources: Option<Vec<Source>>,
}

impl ChatSession {
    pub fn new(backend: Arc<dyn QueryBackend>, history: Arc<dyn HistoryStore>) -> Self {
        Self {
            backend,
            history,
            transcript: Transcript::new(),
            loading: false,
            last_sources: None,
        }
    }

    /// Create a session seeded with the stored history.
    ///
    /// A failed fetch is logged and leaves the conversation empty.
    pub async fn restore(backend: Arc<dyn QueryBackend>, history: Arc<dyn HistoryStore>) -> Self {
        let mut session = Self::new(backend, history);
        match session.history.fetch_all().await {
            Ok(messages) => {
                debug!(count = messages.len(), "Loaded conversation history");
                session.transcript = Transcript::from_history(messages);
            }
            Err(e) => error!(error = %e, "Failed to load history"),
        }
        session
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Citations of the most recent completed answer.
    pub fn last_sources(&self) -> Option<&[Source]> {
        self.last_sources.as_deref()
    }

    pub fn view(&self) -> TranscriptView {
        TranscriptView {
            messages: self.transcript.snapshot(),
            loading: self.loading,
        }
    }

    /// Run one user turn to completion.
    ///
    /// `observe` receives a fresh view after every state change and after
    /// every transport buffer.
    pub async fn submit<F>(&mut self, input: &str, mut observe: F) -> TurnOutcome
    where
        F: FnMut(TranscriptView) + Send,
    {
        if self.loading {
            return TurnOutcome::Busy;
        }
        if input.trim().is_empty() {
            return TurnOutcome::Rejected;
        }

        self.loading = true;
        let outcome = self.run_turn(input, &mut observe).await;
        self.transcript.finish();
        self.loading = false;
        observe(self.view());

        outcome
    }

    async fn run_turn<F>(&mut self, input: &str, observe: &mut F) -> TurnOutcome
    where
        F: FnMut(TranscriptView) + Send,
    {
        self.transcript.push(ChatMessage::user(input));
        observe(self.view());

        if let Err(e) = self.history.append(ChatRole::User, input).await {
            warn!(error = %e, "Failed to save user message");
        }

        if let Err(e) = self.transcript.begin_assistant() {
            return TurnOutcome::Failed { error: e.to_string() };
        }
        observe(self.view());

        let mut accumulator = ResponseAccumulator::new();
        let mut decoder = LineDecoder::new();
        let streamed = self
            .stream_answer(input, &mut accumulator, &mut decoder, observe)
            .await;

        if let Err(e) = streamed {
            if !accumulator.is_complete() {
                error!(error = %e, "Query failed");
                self.transcript.replace_last_content(APOLOGY);
                return TurnOutcome::Failed { error: e.to_string() };
            }
            warn!(error = %e, "Transport failed after the answer completed");
        }

        let (answer, sources) = accumulator.into_parts();
        info!(
            chars = answer.len(),
            sources = sources.as_ref().map(Vec::len),
            skipped = decoder.skipped(),
            "Answer received"
        );

        if let Err(e) = self.history.append(ChatRole::Assistant, &answer).await {
            warn!(error = %e, "Failed to save assistant message");
        }
        self.last_sources = sources.clone();

        TurnOutcome::Completed(TurnReport {
            answer,
            sources,
            skipped_lines: decoder.skipped(),
        })
    }

    async fn stream_answer<F>(
        &mut self,
        input: &str,
        accumulator: &mut ResponseAccumulator,
        decoder: &mut LineDecoder,
        observe: &mut F,
    ) -> Result<()>
    where
        F: FnMut(TranscriptView) + Send,
    {
        let backend = Arc::clone(&self.backend);
        let mut stream = backend.open_stream(input).await?;

        while let Some(buf) = stream.next().await {
            let buf = buf?;
            for value in decoder.push(&buf) {
                for record in StreamRecord::from_value(value) {
                    accumulator.apply(record, &mut self.transcript);
                }
            }
            observe(self.view());
        }

        if let Some(value) = decoder.finish() {
            for record in StreamRecord::from_value(value) {
                accumulator.apply(record, &mut self.transcript);
            }
            observe(self.view());
        }

        Ok(())
    }

    /// Start over: clear the stored history, then the local transcript.
    ///
    /// When the backend refuses, the local transcript is left untouched and
    /// the error is returned.
    pub async fn new_conversation(&mut self) -> Result<()> {
        if self.loading {
            bail!("Cannot start a new conversation while a reply is streaming");
        }
        if let Err(e) = self.history.clear_all().await {
            error!(error = %e, "Failed to clear history");
            return Err(e);
        }
        self.transcript.clear();
        self.last_sources = None;
        Ok(())
    }
}
