//! Semantic memory over past exchanges.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Metadata attached to an indexed document; equality-filterable.
pub type MemoryMetadata = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryDocument {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: MemoryMetadata,
    pub timestamp: DateTime<Utc>,
}

/// A search result with its cosine similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryHit {
    pub document: MemoryDocument,
    pub score: f32,
}

/// Text index used to recall earlier exchanges.
#[async_trait]
pub trait MemoryIndex: Send + Sync {
    /// Indexes a text and returns the new document id.
    async fn add(&self, content: &str, metadata: MemoryMetadata) -> Result<String>;

    /// Returns up to `k` documents most similar to `query` whose metadata
    /// contains every pair of `filter`.
    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MemoryMetadata>,
    ) -> Result<Vec<MemoryHit>>;
}
