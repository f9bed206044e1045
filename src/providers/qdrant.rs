//! Qdrant REST vector store provider
//!
//! Speaks the points API over plain HTTP: collection bootstrap, batched
//! upserts, filtered nearest-neighbor search, payload scrolling for the
//! dedup scan, and filtered deletes.
//!
//! Qdrant only accepts UUID or integer point ids on the wire, so the stable
//! `(source_path, chunk_index)` id is digested into a deterministic UUID for
//! transport. The stable id itself lives in the payload metadata, which is
//! the only thing the dedup scan reads.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

use crate::config::VectorDbConfig;
use crate::error::{Error, Result};

use super::vector_store::{
    Condition, PayloadFilter, PointPayload, ScoredPoint, VectorPoint, VectorStoreProvider,
};

/// Qdrant-backed vector store
pub struct QdrantStore {
    http: reqwest::Client,
    base_url: String,
    collection: String,
    vector_size: usize,
}

#[derive(Deserialize)]
struct SearchEnvelope {
    result: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    score: f32,
    payload: Option<Value>,
}

#[derive(Deserialize)]
struct ScrollEnvelope {
    result: ScrollResult,
}

#[derive(Deserialize)]
struct ScrollResult {
    points: Vec<ScrollHit>,
    next_page_offset: Option<Value>,
}

#[derive(Deserialize)]
struct ScrollHit {
    payload: Option<Value>,
}

#[derive(Deserialize)]
struct CountEnvelope {
    result: CountResult,
}

#[derive(Deserialize)]
struct CountResult {
    count: usize,
}

impl QdrantStore {
    /// Create a new store client
    pub fn new(config: &VectorDbConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
            vector_size: config.vector_size,
        })
    }

    /// Deterministic wire id for a stable chunk id
    fn wire_id(stable_id: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_URL, stable_id.as_bytes()).to_string()
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!("{}/collections/{}{}", self.base_url, self.collection, suffix)
    }

    fn condition_json(condition: &Condition) -> Value {
        let value = match condition {
            Condition::DepartmentId(id) => json!(id),
            Condition::CommonDoc(flag) => json!(flag),
            Condition::SourcePath(path) => json!(path),
        };
        json!({ "key": condition.key(), "match": { "value": value } })
    }

    fn filter_json(filter: &PayloadFilter) -> Value {
        let mut body = serde_json::Map::new();
        if !filter.must.is_empty() {
            body.insert(
                "must".to_string(),
                Value::Array(filter.must.iter().map(Self::condition_json).collect()),
            );
        }
        if !filter.should.is_empty() {
            body.insert(
                "should".to_string(),
                Value::Array(filter.should.iter().map(Self::condition_json).collect()),
            );
        }
        Value::Object(body)
    }

    fn parse_payload(payload: Option<Value>) -> Option<PointPayload> {
        let value = payload?;
        match serde_json::from_value::<PointPayload>(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("skipping point with malformed payload: {}", e);
                None
            }
        }
    }

    async fn post_json(&self, url: String, body: Value) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::VectorDb(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::VectorDb(format!("{}: {}", status, text)));
        }
        Ok(response)
    }

    async fn count_with_filter(&self, filter: Option<&PayloadFilter>) -> Result<usize> {
        let mut body = json!({ "exact": true });
        if let Some(f) = filter {
            body["filter"] = Self::filter_json(f);
        }
        let response = self
            .post_json(self.collection_url("/points/count"), body)
            .await?;
        let envelope = response
            .json::<CountEnvelope>()
            .await
            .map_err(|e| Error::VectorDb(e.to_string()))?;
        Ok(envelope.result.count)
    }
}

#[async_trait]
impl VectorStoreProvider for QdrantStore {
    async fn ensure_ready(&self) -> Result<()> {
        let response = self
            .http
            .get(self.collection_url(""))
            .send()
            .await
            .map_err(|e| Error::VectorDb(e.to_string()))?;

        if response.status().is_success() {
            return Ok(());
        }

        tracing::info!("creating collection {}", self.collection);
        let response = self
            .http
            .put(self.collection_url(""))
            .json(&json!({
                "vectors": { "size": self.vector_size, "distance": "Cosine" }
            }))
            .send()
            .await
            .map_err(|e| Error::VectorDb(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::VectorDb(format!(
                "creating collection failed: {}: {}",
                status, text
            )));
        }
        Ok(())
    }

    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let body: Vec<Value> = points
            .iter()
            .map(|p| {
                json!({
                    "id": Self::wire_id(&p.id),
                    "vector": p.vector,
                    "payload": {
                        "text": p.payload.text,
                        "metadata": p.payload.metadata,
                    },
                })
            })
            .collect();

        let response = self
            .http
            .put(self.collection_url("/points?wait=true"))
            .json(&json!({ "points": body }))
            .send()
            .await
            .map_err(|e| Error::VectorDb(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::VectorDb(format!("upsert failed: {}: {}", status, text)));
        }
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<ScoredPoint>> {
        let mut body = json!({
            "vector": vector,
            "limit": k,
            "with_payload": true,
        });
        if let Some(f) = filter {
            body["filter"] = Self::filter_json(f);
        }

        let response = self
            .post_json(self.collection_url("/points/search"), body)
            .await?;
        let envelope = response
            .json::<SearchEnvelope>()
            .await
            .map_err(|e| Error::VectorDb(e.to_string()))?;

        Ok(envelope
            .result
            .into_iter()
            .filter_map(|hit| {
                Self::parse_payload(hit.payload).map(|payload| ScoredPoint {
                    id: payload.metadata.chunk_id(),
                    score: hit.score,
                    payload,
                })
            })
            .collect())
    }

    async fn scroll(
        &self,
        filter: Option<&PayloadFilter>,
        page_size: usize,
    ) -> Result<Vec<PointPayload>> {
        let mut payloads = Vec::new();
        let mut offset: Option<Value> = None;

        loop {
            let mut body = json!({
                "limit": page_size,
                "with_payload": true,
                "with_vector": false,
            });
            if let Some(f) = filter {
                body["filter"] = Self::filter_json(f);
            }
            if let Some(ref o) = offset {
                body["offset"] = o.clone();
            }

            let response = self
                .post_json(self.collection_url("/points/scroll"), body)
                .await?;
            let envelope = response
                .json::<ScrollEnvelope>()
                .await
                .map_err(|e| Error::VectorDb(e.to_string()))?;

            payloads.extend(
                envelope
                    .result
                    .points
                    .into_iter()
                    .filter_map(|hit| Self::parse_payload(hit.payload)),
            );

            match envelope.result.next_page_offset {
                Some(next) if !next.is_null() => offset = Some(next),
                _ => break,
            }
        }

        Ok(payloads)
    }

    async fn delete(&self, filter: &PayloadFilter) -> Result<usize> {
        // The delete endpoint does not report how many points it removed,
        // so count the matches first.
        let matched = self.count_with_filter(Some(filter)).await?;
        if matched == 0 {
            return Ok(0);
        }

        self.post_json(
            self.collection_url("/points/delete?wait=true"),
            json!({ "filter": Self::filter_json(filter) }),
        )
        .await?;

        Ok(matched)
    }

    async fn count(&self) -> Result<usize> {
        self.count_with_filter(None).await
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}
