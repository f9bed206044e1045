//! Error types for the QA assistant

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by ingestion, retrieval, and the conversation agent
#[derive(Debug, Error)]
pub enum Error {
    /// Embedding capability call failed (network, timeout, rate limit)
    #[error("embedding request failed: {0}")]
    Embedding(String),

    /// Generation capability call failed
    #[error("generation request failed: {0}")]
    Generation(String),

    /// Vector index call failed
    #[error("vector store error: {0}")]
    VectorDb(String),

    /// File extension the document loader cannot handle
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// A single document could not be parsed
    #[error("failed to parse {filename}: {message}")]
    FileParse {
        /// Name of the file that failed
        filename: String,
        /// What went wrong
        message: String,
    },

    /// Chat history store failure
    #[error("chat history error: {0}")]
    History(String),

    /// Invalid or missing configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// True for failures of an external capability (embedding, generation,
    /// vector index). These are turn-scoped during conversation and
    /// file-scoped during ingestion; they are never retried implicitly.
    pub fn is_capability(&self) -> bool {
        matches!(
            self,
            Self::Embedding(_) | Self::Generation(_) | Self::VectorDb(_)
        )
    }
}
