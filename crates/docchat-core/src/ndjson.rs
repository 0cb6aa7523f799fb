//! Newline-delimited JSON decoding for streamed chat responses.
//!
//! The backend answers a streamed query with one JSON object per line:
//! ```text
//! {"chunk": "Hel"}
//! {"chunk": "lo"}
//! {"complete": true, "sources": [{"doc_id": "42", "score": 0.81, "chunk": "..."}]}
//! ```
//! Network reads do not respect line boundaries, so the decoder keeps the
//! trailing bytes of every buffer until the next newline arrives. Splitting
//! happens on raw bytes: `\n` never occurs inside a multi-byte UTF-8
//! sequence, so a character split across two reads is reassembled before the
//! line is decoded.

use futures_util::{Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

/// Incremental decoder that turns byte buffers into parsed JSON lines.
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
    skipped: usize,
}

enum ParsedLine {
    Blank,
    Value(Value),
    Malformed,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport buffer and return every record completed by it.
    pub fn push(&mut self, buf: &[u8]) -> Vec<Value> {
        self.pending.extend_from_slice(buf);

        let mut values = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            match parse_line(&self.pending[start..end]) {
                ParsedLine::Value(value) => values.push(value),
                ParsedLine::Malformed => self.skipped += 1,
                ParsedLine::Blank => {}
            }
            start = end + 1;
        }
        self.pending.drain(..start);

        values
    }

    /// Flush the carry-over at end of stream, attempting it as one last record.
    pub fn finish(&mut self) -> Option<Value> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        match parse_line(&rest) {
            ParsedLine::Value(value) => Some(value),
            ParsedLine::Malformed => {
                self.skipped += 1;
                None
            }
            ParsedLine::Blank => None,
        }
    }

    /// Number of lines dropped because they were not valid JSON.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Bytes held back waiting for a newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn parse_line(line: &[u8]) -> ParsedLine {
    if line.iter().all(|b| b.is_ascii_whitespace()) {
        return ParsedLine::Blank;
    }
    match serde_json::from_slice::<Value>(line) {
        Ok(value) => ParsedLine::Value(value),
        Err(e) => {
            warn!(
                error = %e,
                line = %String::from_utf8_lossy(line),
                "Skipping malformed stream line"
            );
            ParsedLine::Malformed
        }
    }
}

/// Decode a transport byte stream into a lazy stream of JSON records.
///
/// A transport error is yielded once and ends the stream. Malformed lines are
/// skipped with a warning.
pub fn decode_stream<S, B, E>(byte_stream: S) -> impl Stream<Item = anyhow::Result<Value>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<anyhow::Error>,
{
    async_stream::stream! {
        let mut decoder = LineDecoder::new();
        let mut byte_stream = std::pin::pin!(byte_stream);

        while let Some(chunk) = byte_stream.next().await {
            match chunk {
                Ok(buf) => {
                    for value in decoder.push(buf.as_ref()) {
                        yield Ok(value);
                    }
                }
                Err(e) => {
                    let err: anyhow::Error = e.into();
                    yield Err(err);
                    return;
                }
            }
        }

        if let Some(value) = decoder.finish() {
            yield Ok(value);
        }
        if decoder.skipped() > 0 {
            debug!(skipped = decoder.skipped(), "Stream ended with skipped lines");
        }
    }
}
