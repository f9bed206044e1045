//! Configuration for the QA assistant
//!
//! One `RagConfig` is built at process start and injected into the agent,
//! the retrieval gateway, and the ingestion pipeline. Nothing reads global
//! state after construction.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main configuration tree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Conversation agent configuration
    #[serde(default)]
    pub agent: AgentConfig,
    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Section segmentation configuration
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// LLM and embedding endpoint configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Vector database configuration
    #[serde(default)]
    pub vector_db: VectorDbConfig,
    /// Chat history store configuration
    #[serde(default)]
    pub history: HistoryConfig,
    /// Ingestion batch configuration
    #[serde(default)]
    pub ingestion: IngestionConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load from a file when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

/// Conversation agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum question reformulations per turn before the loop is forced
    /// to terminate
    pub max_rewrites: u32,
    /// How many trailing chat history entries prompts may see
    pub window_size: usize,
    /// Markers in the judge's reflection that count as a sufficient verdict
    pub sufficient_markers: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rewrites: 2,
            window_size: 3,
            sufficient_markers: vec![
                "충분".to_string(),
                "문제없음".to_string(),
                "적절".to_string(),
            ],
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Trailing context carried from one chunk into the next, in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 50,
        }
    }
}

/// Section segmentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationConfig {
    /// How many matches a structural pattern needs before it is trusted
    pub min_pattern_matches: usize,
    /// Paragraphs at or below this length are dropped by the paragraph
    /// fallback
    pub min_paragraph_len: usize,
    /// Window size of the terminal fixed-length fallback, in characters
    pub fallback_chunk_size: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            min_pattern_matches: 3,
            min_paragraph_len: 50,
            fallback_chunk_size: 700,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Maximum passages handed to the generator
    pub top_k: usize,
    /// Candidates fetched from the index before threshold filtering
    pub fetch_k: usize,
    /// Minimum similarity a candidate needs to be kept. When nothing
    /// clears it, the single best hit is used instead.
    pub score_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            fetch_k: 10,
            score_threshold: 0.75,
        }
    }
}

/// LLM and embedding endpoint configuration (OpenAI-compatible API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API base URL
    pub base_url: String,
    /// API key; falls back to the `OPENAI_API_KEY` environment variable
    #[serde(default)]
    pub api_key: Option<String>,
    /// Embedding model name
    pub embed_model: String,
    /// Chat completion model name
    pub chat_model: String,
    /// Sampling temperature for generation
    pub temperature: f32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            embed_model: "text-embedding-3-small".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

/// Vector database configuration (Qdrant REST)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbConfig {
    /// Qdrant base URL
    pub url: String,
    /// Collection name
    pub collection: String,
    /// Embedding dimensions (1536 for text-embedding-3-small)
    pub vector_size: usize,
    /// Page size used when scanning existing chunk ids
    pub scroll_page_size: usize,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            collection: "rag_multiformat".to_string(),
            vector_size: 1536,
            scroll_page_size: 10_000,
            timeout_secs: 30,
        }
    }
}

/// Chat history store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// SQLite database path
    pub db_path: PathBuf,
    /// How many rendered Q/A turns to load when a session resumes
    pub load_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        let db_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("intra-rag")
            .join("chat.db");
        Self {
            db_path,
            load_limit: 10,
        }
    }
}

/// Ingestion batch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// File extensions picked up by directory ingestion
    pub extensions: Vec<String>,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            extensions: ["pdf", "docx", "csv", "txt", "md", "html", "pptx"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = RagConfig::default();
        assert_eq!(config.agent.max_rewrites, 2);
        assert_eq!(config.agent.window_size, 3);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.chunking.chunk_size, 512);
        assert_eq!(config.segmentation.fallback_chunk_size, 700);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: RagConfig = toml::from_str(
            r#"
            [agent]
            max_rewrites = 1
            window_size = 5
            sufficient_markers = ["충분"]
            "#,
        )
        .unwrap();
        assert_eq!(config.agent.max_rewrites, 1);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.vector_db.collection, "rag_multiformat");
    }
}
