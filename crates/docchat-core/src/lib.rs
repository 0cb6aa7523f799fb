pub mod accumulator;
pub mod api;
pub mod backend;
pub mod chat;
pub mod config;
pub mod ndjson;
pub mod record;
pub mod state;
pub mod transcript;

// Re-export main types for convenience
pub use accumulator::ResponseAccumulator;
pub use api::{ApiClient, KnowledgeBase, PdfSession, SessionInfo, UserInfo, UserRole};
pub use backend::{ByteStream, HistoryStore, NoHistory, QueryBackend};
pub use chat::{ChatSession, TranscriptView, TurnOutcome, TurnReport, APOLOGY};
pub use config::Config;
pub use ndjson::{decode_stream, LineDecoder};
pub use record::{Source, StreamRecord};
pub use state::{ChatMessage, ChatRole};
pub use transcript::Transcript;
