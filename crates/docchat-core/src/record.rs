//! Typed records carried by a streamed chat response.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// A retrieved passage cited by an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Absent for ad-hoc PDF sessions
    #[serde(default)]
    pub doc_id: Option<String>,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub chunk: String,
}

/// One decoded line of a streamed response
#[derive(Debug, Clone, PartialEq)]
pub enum StreamRecord {
    /// A text fragment to append
    Chunk(String),
    /// End-of-answer marker carrying retrieval citations
    Complete { sources: Vec<Source> },
}

#[derive(Deserialize)]
struct RawRecord {
    chunk: Option<String>,
    answer: Option<String>,
    #[serde(default)]
    complete: bool,
    sources: Option<Vec<Source>>,
}

impl StreamRecord {
    /// Interpret one JSON line. Unknown shapes produce no records.
    ///
    /// Besides the plain `chunk` and `complete` lines, the backend sends
    /// `{"chunk": .., "complete": true}` when generation fails midway and
    /// `{"answer": .., "sources": []}` when retrieval finds nothing. Both are
    /// split into a text record followed by a completion.
    pub fn from_value(value: Value) -> Vec<StreamRecord> {
        if !value.is_object() {
            warn!(%value, "Ignoring non-object stream record");
            return Vec::new();
        }
        let raw: RawRecord = match serde_json::from_value(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Ignoring stream record with unexpected field types");
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        let text = raw.chunk.or(raw.answer.clone());
        if let Some(text) = text {
            if !text.is_empty() {
                records.push(StreamRecord::Chunk(text));
            }
        }
        if raw.complete || raw.answer.is_some() {
            records.push(StreamRecord::Complete {
                sources: raw.sources.unwrap_or_default(),
            });
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chunk_record() {
        assert_eq!(
            StreamRecord::from_value(json!({"chunk": "Hel"})),
            vec![StreamRecord::Chunk("Hel".to_string())]
        );
    }

    #[test]
    fn test_complete_record_keeps_source_order() {
        let records = StreamRecord::from_value(json!({
            "complete": true,
            "sources": [
                {"doc_id": "a", "score": 0.9, "chunk": "first"},
                {"doc_id": "b", "score": 0.5, "chunk": "second"},
                {"score": 1.5, "chunk": "session"}
            ]
        }));
        match &records[..] {
            [StreamRecord::Complete { sources }] => {
                let ids: Vec<Option<&str>> = sources.iter().map(|s| s.doc_id.as_deref()).collect();
                assert_eq!(ids, vec![Some("a"), Some("b"), None]);
                assert_eq!(sources[1].chunk, "second");
            }
            other => panic!("unexpected records: {:?}", other),
        }
    }

    #[test]
    fn test_error_chunk_with_complete() {
        let records = StreamRecord::from_value(json!({"chunk": "Sorry", "complete": true}));
        assert_eq!(
            records,
            vec![
                StreamRecord::Chunk("Sorry".to_string()),
                StreamRecord::Complete { sources: vec![] }
            ]
        );
    }

    #[test]
    fn test_answer_record() {
        let records = StreamRecord::from_value(json!({"answer": "I don't know.", "sources": []}));
        assert_eq!(
            records,
            vec![
                StreamRecord::Chunk("I don't know.".to_string()),
                StreamRecord::Complete { sources: vec![] }
            ]
        );
    }

    #[test]
    fn test_unknown_shapes_are_ignored() {
        assert!(StreamRecord::from_value(json!({"status": "ok"})).is_empty());
        assert!(StreamRecord::from_value(json!([1, 2])).is_empty());
        assert!(StreamRecord::from_value(json!({"chunk": 5})).is_empty());
        assert!(StreamRecord::from_value(json!({"chunk": ""})).is_empty());
    }
}
