//! Provider abstractions for embeddings, generation, and vector storage
//!
//! These trait boundaries are what the agent and the ingestion pipeline are
//! written against; the HTTP-backed implementations can be swapped for the
//! in-memory store or scripted test doubles without touching either.

pub mod embedding;
pub mod llm;
pub mod memory;
pub mod openai;
pub mod qdrant;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use memory::MemoryVectorStore;
pub use openai::OpenAiClient;
pub use qdrant::QdrantStore;
pub use vector_store::{
    Condition, PayloadFilter, PointPayload, ScoredPoint, VectorPoint, VectorStoreProvider,
};
