//! Deduplicated, file-isolated ingestion into the vector index
//!
//! Identity is `(source_path, chunk_index)`: re-ingesting an unchanged file
//! at the same path reproduces the same ids and writes nothing. The id
//! space already in the index is reconstructed once per batch from a full
//! payload scan; overlapping batches against the same index can race that
//! snapshot and double-write, so batches are expected to run serialized.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use walkdir::WalkDir;

use crate::config::RagConfig;
use crate::error::Result;
use crate::providers::{EmbeddingProvider, PayloadFilter, VectorPoint, VectorStoreProvider};
use crate::types::DocumentChunk;

use super::chunker::TextChunker;
use super::loader::DocumentLoader;
use super::segmenter::SectionSegmenter;

/// Scope of a document deletion; mirrors the metadata scoping used at
/// ingestion time so a department cannot delete another department's copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteScope {
    /// Chunks ingested for one department
    Department(i64),
    /// Chunks in the common pool
    Common,
}

/// Outcome of a directory ingestion batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Files successfully processed (including already-ingested ones)
    pub files_processed: usize,
    /// Files that failed to load, embed, or upsert
    pub files_failed: usize,
    /// Chunks newly written to the index
    pub new_chunks: usize,
}

impl IngestReport {
    /// True when any file failed outright. Zero new chunks alone is not a
    /// failure; it is what a fully deduplicated re-run looks like.
    pub fn has_failures(&self) -> bool {
        self.files_failed > 0
    }
}

/// Segmentation → chunking → dedup → embedding → batched upsert
pub struct Ingestor {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    segmenter: SectionSegmenter,
    chunker: TextChunker,
    scroll_page_size: usize,
}

impl Ingestor {
    /// Create a new ingestor
    pub fn new(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
    ) -> Self {
        Self {
            embedder,
            store,
            segmenter: SectionSegmenter::new(config.segmentation.clone()),
            chunker: TextChunker::new(&config.chunking),
            scroll_page_size: config.vector_db.scroll_page_size,
        }
    }

    /// Reconstruct the set of chunk ids already stored in the index by
    /// scanning payload metadata. This pages through the whole collection:
    /// call it once per ingestion batch, not per file.
    pub async fn existing_ids(&self) -> Result<HashSet<String>> {
        let payloads = self.store.scroll(None, self.scroll_page_size).await?;
        Ok(payloads
            .iter()
            .map(|p| p.metadata.chunk_id())
            .collect())
    }

    /// Ingest one file: load, segment, chunk, skip chunks whose ids are in
    /// the `existing` snapshot, embed and upsert the rest in one batch.
    /// Returns the number of chunks newly written.
    pub async fn upsert_file(
        &self,
        path: &Path,
        department_id: Option<i64>,
        common_doc: bool,
        existing: &HashSet<String>,
    ) -> Result<usize> {
        let source_path = std::fs::canonicalize(path)
            .unwrap_or_else(|_| path.to_path_buf())
            .to_string_lossy()
            .to_string();

        let doc = DocumentLoader::load(path)?;
        let segmentation = self.segmenter.segment(&doc.text);
        if segmentation.is_degraded() {
            tracing::warn!(
                file = %doc.file_name,
                strategy = ?segmentation.strategy,
                "structural segmentation failed, ingesting with fallback sections"
            );
        }

        let mut chunks: Vec<DocumentChunk> = Vec::new();
        let mut chunk_index = 0u32;
        for section in &segmentation.sections {
            for body in self.chunker.split(&section.body) {
                chunks.push(DocumentChunk::new(
                    &source_path,
                    chunk_index,
                    &section.title,
                    &body,
                    department_id,
                    common_doc,
                    &doc.file_name,
                ));
                chunk_index += 1;
            }
        }

        tracing::info!(
            file = %doc.file_name,
            sections = segmentation.sections.len(),
            chunks = chunks.len(),
            content_hash = %doc.content_hash,
            "document prepared"
        );

        let new_chunks: Vec<DocumentChunk> = chunks
            .into_iter()
            .filter(|c| !existing.contains(&c.id))
            .collect();

        if new_chunks.is_empty() {
            tracing::info!(file = %doc.file_name, "all chunks already ingested, skipping");
            return Ok(0);
        }

        let texts: Vec<String> = new_chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        let points: Vec<VectorPoint> = new_chunks
            .into_iter()
            .zip(vectors)
            .map(|(mut chunk, vector)| {
                chunk.vector = vector;
                VectorPoint::from(chunk)
            })
            .collect();

        let written = points.len();
        self.store.upsert(points).await?;
        tracing::info!(file = %doc.file_name, written, "new chunks uploaded");
        Ok(written)
    }

    /// Ingest every matching file under `dir`. The existing-id snapshot is
    /// taken once up front; each file is then isolated: a failure is
    /// logged, counted, and the batch moves on.
    pub async fn ingest_dir(
        &self,
        dir: &Path,
        extensions: &[String],
        department_id: Option<i64>,
        common_doc: bool,
    ) -> Result<IngestReport> {
        self.store.ensure_ready().await?;
        let existing = self.existing_ids().await?;
        tracing::info!(existing = existing.len(), "existing chunk ids loaded");

        let mut files: Vec<_> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .map(|e| e.to_string_lossy().to_lowercase())
                    .map_or(false, |ext| extensions.iter().any(|want| *want == ext))
            })
            .map(|entry| entry.into_path())
            .collect();
        files.sort();

        if files.is_empty() {
            tracing::warn!(dir = %dir.display(), "no matching documents found");
        }

        let mut report = IngestReport::default();
        for path in files {
            match self
                .upsert_file(&path, department_id, common_doc, &existing)
                .await
            {
                Ok(written) => {
                    report.files_processed += 1;
                    report.new_chunks += written;
                }
                Err(e) => {
                    tracing::error!(file = %path.display(), error = %e, "file failed, continuing batch");
                    report.files_failed += 1;
                }
            }
        }

        tracing::info!(
            processed = report.files_processed,
            failed = report.files_failed,
            new_chunks = report.new_chunks,
            "ingestion batch finished"
        );
        Ok(report)
    }

    /// Remove every chunk of one source document from the index. This is
    /// the other half of the identity scheme: content edits at an existing
    /// path are invisible to the dedup scan, so changed documents must be
    /// deleted here and re-ingested.
    pub async fn delete_by_source(&self, source_path: &str, scope: DeleteScope) -> Result<usize> {
        let filter = match scope {
            DeleteScope::Department(id) => PayloadFilter::source_in_department(source_path, id),
            DeleteScope::Common => PayloadFilter::source_in_common(source_path),
        };
        let deleted = self.store.delete(&filter).await?;
        tracing::info!(source = source_path, deleted, "document chunks deleted");
        Ok(deleted)
    }
}
