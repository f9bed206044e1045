//! Vector store provider trait and point/filter types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::ChunkMetadata;

/// Payload stored with every point: the chunk text plus scoping metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointPayload {
    /// Chunk text, already prefixed with its section title
    pub text: String,
    /// Scoping and provenance metadata
    pub metadata: ChunkMetadata,
}

/// A point to upsert into the index
#[derive(Debug, Clone)]
pub struct VectorPoint {
    /// Stable chunk id
    pub id: String,
    /// Embedding vector
    pub vector: Vec<f32>,
    /// Stored payload
    pub payload: PointPayload,
}

impl From<crate::types::DocumentChunk> for VectorPoint {
    fn from(chunk: crate::types::DocumentChunk) -> Self {
        Self {
            id: chunk.id,
            vector: chunk.vector,
            payload: PointPayload {
                text: chunk.text,
                metadata: chunk.metadata,
            },
        }
    }
}

/// A search hit
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    /// Stable chunk id
    pub id: String,
    /// Similarity score, higher is more similar
    pub score: f32,
    /// Stored payload
    pub payload: PointPayload,
}

/// A single metadata predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `metadata.department_id` equals the given id
    DepartmentId(i64),
    /// `metadata.common_doc` equals the given flag
    CommonDoc(bool),
    /// `metadata.source_path` equals the given path
    SourcePath(String),
}

impl Condition {
    /// Evaluate this condition against chunk metadata
    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        match self {
            Self::DepartmentId(id) => metadata.department_id == Some(*id),
            Self::CommonDoc(flag) => metadata.common_doc == *flag,
            Self::SourcePath(path) => metadata.source_path == *path,
        }
    }

    /// The payload key this condition filters on
    pub fn key(&self) -> &'static str {
        match self {
            Self::DepartmentId(_) => "metadata.department_id",
            Self::CommonDoc(_) => "metadata.common_doc",
            Self::SourcePath(_) => "metadata.source_path",
        }
    }
}

/// Conjunction/disjunction filter over payload metadata, in the shape the
/// index's own filter language uses: every `must` condition is required,
/// and at least one `should` condition when any are present.
#[derive(Debug, Clone, Default)]
pub struct PayloadFilter {
    /// All of these must hold
    pub must: Vec<Condition>,
    /// At least one of these must hold, when non-empty
    pub should: Vec<Condition>,
}

impl PayloadFilter {
    /// Department-scoped retrieval: a department sees its own documents and
    /// the common pool; no department sees only the common pool.
    pub fn department_scope(department_id: Option<i64>) -> Self {
        match department_id {
            Some(id) => Self {
                should: vec![Condition::DepartmentId(id), Condition::CommonDoc(true)],
                ..Self::default()
            },
            None => Self {
                must: vec![Condition::CommonDoc(true)],
                ..Self::default()
            },
        }
    }

    /// All chunks of one source document within a department's scope
    pub fn source_in_department(source_path: &str, department_id: i64) -> Self {
        Self {
            must: vec![
                Condition::SourcePath(source_path.to_string()),
                Condition::DepartmentId(department_id),
            ],
            ..Self::default()
        }
    }

    /// All chunks of one source document in the common pool
    pub fn source_in_common(source_path: &str) -> Self {
        Self {
            must: vec![
                Condition::SourcePath(source_path.to_string()),
                Condition::CommonDoc(true),
            ],
            ..Self::default()
        }
    }

    /// Evaluate the filter against chunk metadata
    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        if !self.must.iter().all(|c| c.matches(metadata)) {
            return false;
        }
        if !self.should.is_empty() && !self.should.iter().any(|c| c.matches(metadata)) {
            return false;
        }
        true
    }
}

/// Trait for vector storage, nearest-neighbor search, payload scans, and
/// filtered deletion
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Create the backing collection if it does not exist yet
    async fn ensure_ready(&self) -> Result<()>;

    /// Insert or overwrite points in one batch
    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<()>;

    /// Nearest-neighbor search, best match first
    async fn search(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<ScoredPoint>>;

    /// Scan every stored payload matching the filter, paging internally.
    /// This walks the whole collection; callers should treat it as
    /// expensive and invoke it once per ingestion batch.
    async fn scroll(
        &self,
        filter: Option<&PayloadFilter>,
        page_size: usize,
    ) -> Result<Vec<PointPayload>>;

    /// Delete every point matching the filter, returning how many went away
    async fn delete(&self, filter: &PayloadFilter) -> Result<usize>;

    /// Number of stored points
    async fn count(&self) -> Result<usize>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(department_id: Option<i64>, common_doc: bool) -> ChunkMetadata {
        ChunkMetadata {
            source_path: "/data/doc.pdf".to_string(),
            chunk_index: 0,
            title: "제1조 목적".to_string(),
            department_id,
            common_doc,
            file_name: "doc.pdf".to_string(),
        }
    }

    #[test]
    fn test_department_scope_includes_common_pool() {
        let filter = PayloadFilter::department_scope(Some(7));
        assert!(filter.matches(&meta(Some(7), false)));
        assert!(filter.matches(&meta(None, true)));
        assert!(!filter.matches(&meta(Some(8), false)));
    }

    #[test]
    fn test_no_department_sees_only_common() {
        let filter = PayloadFilter::department_scope(None);
        assert!(filter.matches(&meta(None, true)));
        assert!(!filter.matches(&meta(Some(7), false)));
    }

    #[test]
    fn test_source_filters_require_scope() {
        let filter = PayloadFilter::source_in_department("/data/doc.pdf", 7);
        assert!(filter.matches(&meta(Some(7), false)));
        assert!(!filter.matches(&meta(Some(9), false)));

        let filter = PayloadFilter::source_in_common("/data/doc.pdf");
        assert!(filter.matches(&meta(None, true)));
        assert!(!filter.matches(&meta(Some(7), false)));
    }
}
