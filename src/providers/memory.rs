//! In-memory vector store
//!
//! Brute-force cosine search over a `parking_lot`-guarded vector. Backs
//! tests and small local runs; the provider contract is identical to the
//! Qdrant store, filters included.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{Error, Result};

use super::vector_store::{
    PayloadFilter, PointPayload, ScoredPoint, VectorPoint, VectorStoreProvider,
};

/// Brute-force in-process vector store
#[derive(Default)]
pub struct MemoryVectorStore {
    points: RwLock<Vec<VectorPoint>>,
}

impl MemoryVectorStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStoreProvider for MemoryVectorStore {
    async fn ensure_ready(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, new_points: Vec<VectorPoint>) -> Result<()> {
        let mut points = self.points.write();
        for point in new_points {
            if point.vector.is_empty() {
                return Err(Error::VectorDb(format!("point {} has no vector", point.id)));
            }
            match points.iter_mut().find(|p| p.id == point.id) {
                Some(existing) => *existing = point,
                None => points.push(point),
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<ScoredPoint>> {
        let points = self.points.read();
        let mut hits: Vec<ScoredPoint> = points
            .iter()
            .filter(|p| filter.map_or(true, |f| f.matches(&p.payload.metadata)))
            .map(|p| ScoredPoint {
                id: p.id.clone(),
                score: Self::cosine_similarity(vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }

    async fn scroll(
        &self,
        filter: Option<&PayloadFilter>,
        _page_size: usize,
    ) -> Result<Vec<PointPayload>> {
        let points = self.points.read();
        Ok(points
            .iter()
            .filter(|p| filter.map_or(true, |f| f.matches(&p.payload.metadata)))
            .map(|p| p.payload.clone())
            .collect())
    }

    async fn delete(&self, filter: &PayloadFilter) -> Result<usize> {
        let mut points = self.points.write();
        let before = points.len();
        points.retain(|p| !filter.matches(&p.payload.metadata));
        Ok(before - points.len())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.points.read().len())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
