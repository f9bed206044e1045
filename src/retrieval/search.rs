//! Retrieval gateway: query embedding, scoped search, passage formatting
//!
//! Turns a natural-language query into the few passages most likely to help
//! answer it. Candidates come back from the index in relevance order; a
//! similarity floor weeds out weak matches, and when nothing clears the
//! floor the single best hit is kept rather than starving the generator.

use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::providers::{EmbeddingProvider, PayloadFilter, VectorStoreProvider};

/// Embeds queries and fetches formatted passages from the vector index
pub struct RetrievalGateway {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    config: RetrievalConfig,
}

impl RetrievalGateway {
    /// Create a new gateway
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            config,
        }
    }

    /// Retrieve up to `top_k` passages for `query`, scoped to the given
    /// department. Each passage renders as `"[section title]\n<chunk text>"`
    /// in the index's relevance order. An index with no matches yields an
    /// empty vector, a valid outcome the agent answers around, not an
    /// error.
    pub async fn retrieve(&self, query: &str, department_id: Option<i64>) -> Result<Vec<String>> {
        let query_vector = self.embedder.embed(query).await?;
        let filter = PayloadFilter::department_scope(department_id);

        let hits = self
            .store
            .search(&query_vector, self.config.fetch_k, Some(&filter))
            .await?;
        tracing::info!(candidates = hits.len(), "vector search returned");

        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let mut kept: Vec<_> = hits
            .iter()
            .filter(|h| h.score >= self.config.score_threshold)
            .take(self.config.top_k)
            .collect();

        if kept.is_empty() {
            tracing::warn!(
                best_score = hits[0].score,
                threshold = self.config.score_threshold,
                "no candidate cleared the similarity floor, keeping best hit"
            );
            kept = vec![&hits[0]];
        }

        Ok(kept
            .into_iter()
            .map(|hit| {
                tracing::debug!(title = %hit.payload.metadata.title, score = hit.score, "context kept");
                // Stored text already carries the "[title]\n" prefix.
                hit.payload.text.clone()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{MemoryVectorStore, PointPayload, VectorPoint};
    use crate::types::ChunkMetadata;
    use async_trait::async_trait;

    /// Embeds everything onto a fixed axis so scores are controlled by the
    /// stored vectors alone.
    struct AxisEmbedder;

    #[async_trait]
    impl EmbeddingProvider for AxisEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "axis"
        }
    }

    fn point(id: &str, title: &str, vector: Vec<f32>, common: bool) -> VectorPoint {
        VectorPoint {
            id: id.to_string(),
            vector,
            payload: PointPayload {
                text: format!("[{title}]\n{id} 본문"),
                metadata: ChunkMetadata {
                    source_path: format!("/data/{id}.txt"),
                    chunk_index: 0,
                    title: title.to_string(),
                    department_id: if common { None } else { Some(7) },
                    common_doc: common,
                    file_name: format!("{id}.txt"),
                },
            },
        }
    }

    fn gateway(store: Arc<MemoryVectorStore>) -> RetrievalGateway {
        RetrievalGateway::new(Arc::new(AxisEmbedder), store, RetrievalConfig::default())
    }

    #[tokio::test]
    async fn test_passages_formatted_with_titles_in_rank_order() {
        let store = Arc::new(MemoryVectorStore::new());
        store
            .upsert(vec![
                point("a", "제1조 목적", vec![1.0, 0.0], true),
                point("b", "제2조 범위", vec![0.95, 0.3], true),
                point("c", "제3조 지각", vec![0.0, 1.0], true),
            ])
            .await
            .unwrap();

        let contexts = gateway(store).retrieve("질문", None).await.unwrap();
        assert_eq!(contexts.len(), 2); // "c" scores 0.0, below the floor
        assert!(contexts[0].starts_with("[제1조 목적]\n"));
        assert!(contexts[1].starts_with("[제2조 범위]\n"));
    }

    #[tokio::test]
    async fn test_empty_index_yields_empty_contexts() {
        let store = Arc::new(MemoryVectorStore::new());
        let contexts = gateway(store).retrieve("질문", None).await.unwrap();
        assert!(contexts.is_empty());
    }

    #[tokio::test]
    async fn test_below_floor_falls_back_to_best_hit() {
        let store = Arc::new(MemoryVectorStore::new());
        store
            .upsert(vec![
                point("weak1", "제1조", vec![0.3, 1.0], true),
                point("weak2", "제2조", vec![0.1, 1.0], true),
            ])
            .await
            .unwrap();

        let contexts = gateway(store).retrieve("질문", None).await.unwrap();
        assert_eq!(contexts.len(), 1);
        assert!(contexts[0].starts_with("[제1조]\n"));
    }

    #[tokio::test]
    async fn test_department_scope_excludes_other_departments() {
        let store = Arc::new(MemoryVectorStore::new());
        store
            .upsert(vec![
                point("dept", "부서문서", vec![1.0, 0.0], false),
                point("common", "공통문서", vec![1.0, 0.0], true),
            ])
            .await
            .unwrap();

        // No department: only the common pool is visible.
        let contexts = gateway(store).retrieve("질문", None).await.unwrap();
        assert_eq!(contexts.len(), 1);
        assert!(contexts[0].contains("공통문서"));
    }
}
