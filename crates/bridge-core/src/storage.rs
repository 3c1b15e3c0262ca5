//! Vector store client
//!
//! Similarity queries against the corpus of prior project text. The live
//! pipeline only reads; ingestion writes to the same `documents` table from
//! an unattended batch job outside this crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::StoreError;
use crate::types::ContextPassage;

/// Similarity query interface over a corpus of embedded passages.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return up to `limit` passages with similarity to `embedding` at or
    /// above `threshold`, ordered by descending similarity.
    async fn similar(
        &self,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<ContextPassage>, StoreError>;
}

/// Vector store backed by a Supabase pgvector table, queried through the
/// `match_documents` RPC.
pub struct SupabaseStore {
    client: reqwest::Client,
    url: String,
    service_key: String,
}

impl SupabaseStore {
    /// Build a store client from configuration. Returns `None` when the
    /// connection parameters are absent.
    pub fn from_config(config: &Config) -> Option<Self> {
        let url = config.supabase_url.clone()?;
        let service_key = config.supabase_service_key.clone()?;
        Some(Self {
            client: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_string(),
            service_key,
        })
    }
}

#[async_trait]
impl VectorStore for SupabaseStore {
    async fn similar(
        &self,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<ContextPassage>, StoreError> {
        let url = format!("{}/rest/v1/rpc/match_documents", self.url);
        let request = MatchRequest {
            query_embedding: embedding,
            match_threshold: threshold,
            match_count: limit,
        };

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| StoreError(format!("transport: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError(format!("HTTP {status}: {body}")));
        }

        let rows: Vec<MatchRow> = response
            .json()
            .await
            .map_err(|e| StoreError(format!("malformed response: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|row| ContextPassage {
                content: row.content,
                similarity: row.similarity,
            })
            .collect())
    }
}

#[derive(Debug, Serialize)]
struct MatchRequest<'a> {
    query_embedding: &'a [f32],
    match_threshold: f32,
    match_count: usize,
}

#[derive(Debug, Deserialize)]
struct MatchRow {
    content: String,
    similarity: f32,
}
