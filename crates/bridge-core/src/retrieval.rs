//! Context retrieval
//!
//! Retrieval is an optional enhancement, never a hard dependency: missing
//! configuration, an unreachable embedding endpoint, or a failed store query
//! all degrade to "no context" so summaries are still produced ungrounded.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::Config;
use crate::embedding::{EmbeddingProvider, GeminiEmbedder};
use crate::storage::{SupabaseStore, VectorStore};
use crate::types::ContextPassage;

/// Minimum similarity for a passage to be used as grounding context.
pub const SIMILARITY_THRESHOLD: f32 = 0.5;

/// Maximum number of passages included in a prompt.
pub const TOP_K: usize = 3;

/// Retrieves grounding passages for an input text.
///
/// The signature is infallible by contract: every failure path yields an
/// empty passage list.
pub struct ContextRetriever {
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    store: Option<Arc<dyn VectorStore>>,
}

impl ContextRetriever {
    /// Wire up retrieval from configuration. Either half being unconfigured
    /// disables retrieval entirely.
    pub fn from_config(config: &Config) -> Self {
        let embedder = GeminiEmbedder::from_config(config)
            .map(|e| Arc::new(e) as Arc<dyn EmbeddingProvider>);
        let store =
            SupabaseStore::from_config(config).map(|s| Arc::new(s) as Arc<dyn VectorStore>);
        if embedder.is_none() || store.is_none() {
            debug!("retrieval not configured; summaries will be ungrounded");
        }
        Self { embedder, store }
    }

    /// Build a retriever from explicit parts. The seam used by tests.
    pub fn new(
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        store: Option<Arc<dyn VectorStore>>,
    ) -> Self {
        Self { embedder, store }
    }

    /// A retriever that always returns no context.
    pub fn disabled() -> Self {
        Self {
            embedder: None,
            store: None,
        }
    }

    /// Retrieve up to [`TOP_K`] passages with similarity at or above
    /// [`SIMILARITY_THRESHOLD`], ordered by descending similarity. Returns
    /// an empty list on any failure.
    pub async fn retrieve(&self, text: &str) -> Vec<ContextPassage> {
        let (Some(embedder), Some(store)) = (&self.embedder, &self.store) else {
            return Vec::new();
        };
        if text.trim().is_empty() {
            return Vec::new();
        }

        let embedding = match embedder.embed(text).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, "embedding failed; continuing without context");
                return Vec::new();
            }
        };

        let mut passages = match store.similar(&embedding, SIMILARITY_THRESHOLD, TOP_K).await {
            Ok(passages) => passages,
            Err(e) => {
                warn!(error = %e, "similarity query failed; continuing without context");
                return Vec::new();
            }
        };

        // The RPC filters server-side; re-check so a store that ignores the
        // parameters cannot break the contract.
        passages.retain(|p| p.similarity >= SIMILARITY_THRESHOLD);
        passages.truncate(TOP_K);

        debug!(count = passages.len(), "retrieved context passages");
        passages
    }
}
