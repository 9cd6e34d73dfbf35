//! Vector index collaborator client.
//!
//! Queries a Qdrant-compatible HTTP API for the top-K stored records most
//! similar to a query vector and extracts their `chunk_text` payloads. The
//! index is an external collaborator: a fault here fails the whole turn.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::IndexConfig;
use crate::models::RetrievedChunk;

/// Environment variable holding the optional index API key.
pub const INDEX_API_KEY_ENV: &str = "QDRANT_API_KEY";

/// Payload field carrying the stored chunk text. A record missing this
/// field is treated as an empty chunk.
const CHUNK_TEXT_FIELD: &str = "chunk_text";

/// Given a query vector, returns the top-K most similar stored chunks in
/// the index's rank order.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>>;
}

/// HTTP client for a Qdrant-compatible points-query endpoint.
pub struct QdrantIndex {
    client: reqwest::Client,
    url: String,
    collection: String,
    api_key: Option<String>,
}

impl QdrantIndex {
    pub fn new(config: &IndexConfig, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
            api_key,
        })
    }

    /// Construct from config, reading the optional API key from the
    /// environment (`QDRANT_API_KEY`).
    pub fn from_env(config: &IndexConfig) -> Result<Self> {
        let api_key = std::env::var(INDEX_API_KEY_ENV).ok();
        Self::new(config, api_key)
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>> {
        let body = serde_json::json!({
            "query": vector,
            "limit": top_k,
            "with_payload": true,
        });

        let mut request = self
            .client
            .post(format!(
                "{}/collections/{}/points/query",
                self.url, self.collection
            ))
            .header("Content-Type", "application/json")
            .json(&body);

        if let Some(ref key) = self.api_key {
            request = request.header("api-key", key);
        }

        let response = request.send().await.map_err(|e| {
            anyhow::anyhow!(
                "Vector index connection error (is the index reachable at {}?): {}",
                self.url,
                e
            )
        })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Vector index error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_query_response(&json)
    }
}

/// Extract chunks from a points-query response, preserving result order.
fn parse_query_response(json: &serde_json::Value) -> Result<Vec<RetrievedChunk>> {
    let points = json
        .get("result")
        .and_then(|r| r.get("points"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid index response: missing result.points"))?;

    let chunks = points
        .iter()
        .enumerate()
        .map(|(rank, point)| {
            let text = point
                .get("payload")
                .and_then(|p| p.get(CHUNK_TEXT_FIELD))
                .and_then(|t| t.as_str())
                .unwrap_or_default()
                .to_string();
            RetrievedChunk { text, rank }
        })
        .collect();

    Ok(chunks)
}
