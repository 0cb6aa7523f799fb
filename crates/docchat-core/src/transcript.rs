//! Ordered conversation transcript with a single in-progress assistant entry.

use anyhow::{anyhow, Result};

use crate::state::{ChatMessage, ChatRole};

/// Chronological list of messages for one conversation view.
///
/// At most one assistant message is in progress, and it is always the last
/// element. The cursor is an index into `messages`, never a reference.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    in_progress: Option<usize>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from previously persisted history.
    pub fn from_history(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            in_progress: None,
        }
    }

    /// Append a finished message at the tail.
    ///
    /// Appending behind an in-progress entry would break the tail invariant,
    /// so the in-progress entry is finalized first.
    pub fn push(&mut self, message: ChatMessage) {
        self.finish();
        self.messages.push(message);
    }

    /// Append an empty assistant placeholder and mark it in progress.
    pub fn begin_assistant(&mut self) -> Result<usize> {
        if self.in_progress.is_some() {
            return Err(anyhow!("An assistant message is already in progress"));
        }
        self.messages.push(ChatMessage::assistant(""));
        let idx = self.messages.len() - 1;
        self.in_progress = Some(idx);
        Ok(idx)
    }

    /// Overwrite the content of the in-progress tail entry.
    ///
    /// Returns `false` without touching anything when there is no tail or the
    /// tail is not in progress.
    pub fn replace_last_content(&mut self, content: &str) -> bool {
        match self.in_progress {
            Some(idx) if idx + 1 == self.messages.len() => {
                let tail = &mut self.messages[idx];
                debug_assert_eq!(tail.role, ChatRole::Assistant);
                tail.content.clear();
                tail.content.push_str(content);
                true
            }
            _ => false,
        }
    }

    /// Freeze the in-progress entry, if any.
    pub fn finish(&mut self) {
        self.in_progress = None;
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress.is_some()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Read-only copy for rendering
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop every message. Only "new conversation" calls this.
    pub(crate) fn clear(&mut self) {
        self.messages.clear();
        self.in_progress = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_requires_in_progress_tail() {
        let mut transcript = Transcript::new();
        assert!(!transcript.replace_last_content("x"));

        transcript.push(ChatMessage::user("hi"));
        assert!(!transcript.replace_last_content("x"));
        assert_eq!(transcript.last().unwrap().content, "hi");

        transcript.begin_assistant().unwrap();
        assert!(transcript.replace_last_content("partial"));
        assert_eq!(transcript.last().unwrap(), &ChatMessage::assistant("partial"));

        transcript.finish();
        assert!(!transcript.replace_last_content("late"));
        assert_eq!(transcript.last().unwrap().content, "partial");
    }

    #[test]
    fn test_only_one_in_progress() {
        let mut transcript = Transcript::new();
        assert_eq!(transcript.begin_assistant().unwrap(), 0);
        assert!(transcript.begin_assistant().is_err());
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn test_push_finalizes_in_progress() {
        let mut transcript = Transcript::new();
        transcript.begin_assistant().unwrap();
        transcript.push(ChatMessage::user("next"));
        assert!(!transcript.is_in_progress());
        assert!(!transcript.replace_last_content("x"));
        assert_eq!(transcript.messages()[0].content, "");
    }

    #[test]
    fn test_duplicates_and_order_preserved() {
        let mut transcript = Transcript::from_history(vec![
            ChatMessage::user("same"),
            ChatMessage::assistant("a"),
        ]);
        transcript.push(ChatMessage::user("same"));
        let snapshot = transcript.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0], snapshot[2]);
    }
}
