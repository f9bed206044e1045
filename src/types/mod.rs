//! Core types for the QA assistant

pub mod document;
pub mod state;

pub use document::{chunk_id, ChunkMetadata, DocumentChunk, FileType};
pub use state::{ConversationState, TurnRequest, TurnResult};
