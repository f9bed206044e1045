//! intra-rag: internal-documents question answering with a self-correcting RAG loop
//!
//! This crate has two halves. The ingestion pipeline loads heterogeneous
//! documents (PDF, DOCX, HTML, PPTX, CSV, plain text), splits them into titled
//! sections and bounded chunks, embeds them, and upserts them into a vector
//! index without redoing work on re-ingestion. The conversation agent answers
//! user questions against that index with a bounded
//! decide → search → answer → judge → rewrite loop.
//!
//! All external capabilities (embeddings, generation, the vector index) sit
//! behind provider traits so they can be swapped for local services or test
//! doubles.

pub mod agent;
pub mod config;
pub mod error;
pub mod history;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use types::{
    document::{chunk_id, ChunkMetadata, DocumentChunk},
    state::{ConversationState, TurnRequest, TurnResult},
};
