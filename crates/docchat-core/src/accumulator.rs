//! Folds stream records into the text of one assistant message.

use tracing::warn;

use crate::record::{Source, StreamRecord};
use crate::transcript::Transcript;

/// Growing answer text plus the citations delivered at completion.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    text: String,
    sources: Option<Vec<Source>>,
}

impl ResponseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one record, mirroring the text into the in-progress entry.
    pub fn apply(&mut self, record: StreamRecord, transcript: &mut Transcript) {
        match record {
            StreamRecord::Chunk(chunk) => {
                if self.is_complete() {
                    warn!(len = chunk.len(), "Ignoring chunk received after completion");
                    return;
                }
                self.text.push_str(&chunk);
                transcript.replace_last_content(&self.text);
            }
            StreamRecord::Complete { sources } => {
                if self.is_complete() {
                    warn!("Ignoring duplicate completion record");
                    return;
                }
                self.sources = Some(sources);
                transcript.finish();
            }
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Citations, available only once a completion record arrived.
    pub fn sources(&self) -> Option<&[Source]> {
        self.sources.as_deref()
    }

    pub fn is_complete(&self) -> bool {
        self.sources.is_some()
    }

    pub fn into_parts(self) -> (String, Option<Vec<Source>>) {
        (self.text, self.sources)
    }
}
