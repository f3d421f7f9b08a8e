//! Local vector store for recalling past exchanges.
//!
//! Embeddings are a hashed bag of words: each lowercase token is hashed
//! with FNV-1a into one of [`DIMENSIONS`] buckets, then the vector is
//! L2-normalized. Search ranks by cosine similarity. Only texts and
//! metadata are snapshotted; vectors are recomputed on load.

use crate::storage::{load_json, save_json};
use abia_core::error::{AbiaError, Result};
use abia_core::memory::{MemoryDocument, MemoryHit, MemoryIndex, MemoryMetadata};
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::RwLock;

pub const DIMENSIONS: usize = 384;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(FNV_OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME))
}

/// Embeds a text into a unit vector (or the zero vector for token-less text).
pub fn embed(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIMENSIONS];
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let token = token.to_lowercase();
        let bucket = (fnv1a(token.as_bytes()) % DIMENSIONS as u64) as usize;
        vector[bucket] += 1.0;
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
    vector
}

/// Cosine similarity of two unit vectors.
fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn metadata_matches(metadata: &MemoryMetadata, filter: &MemoryMetadata) -> bool {
    filter.iter().all(|(k, v)| metadata.get(k) == Some(v))
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    documents: Vec<MemoryDocument>,
}

#[derive(Default)]
struct Inner {
    entries: Vec<(MemoryDocument, Vec<f32>)>,
    dirty: bool,
}

pub struct VectorStore {
    path: Option<PathBuf>,
    inner: RwLock<Inner>,
}

impl VectorStore {
    /// Opens the store backed by `path`, loading any existing snapshot.
    ///
    /// A corrupt snapshot is logged and replaced by an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let documents = match load_json::<Snapshot>(path.clone()).await {
            Ok(snapshot) => snapshot.map(|s| s.documents).unwrap_or_default(),
            Err(e) => {
                tracing::warn!("[VectorStore] Starting empty: {:#}", e);
                Vec::new()
            }
        };
        tracing::info!(
            "[VectorStore] Loaded {} documents from {}",
            documents.len(),
            path.display()
        );

        let entries = documents
            .into_iter()
            .map(|doc| {
                let vector = embed(&doc.content);
                (doc, vector)
            })
            .collect();

        Self {
            path: Some(path),
            inner: RwLock::new(Inner {
                entries,
                dirty: false,
            }),
        }
    }

    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            inner: RwLock::new(Inner::default()),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn is_dirty(&self) -> bool {
        self.inner.read().await.dirty
    }

    /// Deletes every document whose metadata matches `filter`.
    ///
    /// # Errors
    ///
    /// An empty filter is refused rather than wiping the store.
    pub async fn delete_where(&self, filter: &MemoryMetadata) -> Result<usize> {
        if filter.is_empty() {
            return Err(AbiaError::storage(
                "Refusing to delete memory documents without a filter",
            ));
        }
        let mut inner = self.inner.write().await;
        let before = inner.entries.len();
        inner.entries.retain(|(doc, _)| !metadata_matches(&doc.metadata, filter));
        let removed = before - inner.entries.len();
        if removed > 0 {
            inner.dirty = true;
        }
        Ok(removed)
    }

    /// Writes the snapshot when there are unsaved changes.
    ///
    /// Returns whether a write happened.
    pub async fn flush(&self) -> Result<bool> {
        let Some(path) = self.path.clone() else {
            return Ok(false);
        };

        let mut inner = self.inner.write().await;
        if !inner.dirty {
            return Ok(false);
        }
        let snapshot = Snapshot {
            documents: inner.entries.iter().map(|(doc, _)| doc.clone()).collect(),
        };
        save_json(path, snapshot)
            .await
            .context("Failed to write vector store snapshot")?;
        inner.dirty = false;
        Ok(true)
    }
}

#[async_trait]
impl MemoryIndex for VectorStore {
    async fn add(&self, content: &str, metadata: MemoryMetadata) -> Result<String> {
        let document = MemoryDocument {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.to_string(),
            metadata,
            timestamp: Utc::now(),
        };
        let id = document.id.clone();
        let vector = embed(content);

        let mut inner = self.inner.write().await;
        inner.entries.push((document, vector));
        inner.dirty = true;
        Ok(id)
    }

    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MemoryMetadata>,
    ) -> Result<Vec<MemoryHit>> {
        let query_vector = embed(query);
        let inner = self.inner.read().await;

        let mut hits: Vec<MemoryHit> = inner
            .entries
            .iter()
            .filter(|(doc, _)| filter.is_none_or(|f| metadata_matches(&doc.metadata, f)))
            .map(|(doc, vector)| MemoryHit {
                document: doc.clone(),
                score: cosine(&query_vector, vector),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn meta(pairs: &[(&str, &str)]) -> MemoryMetadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    #[test]
    fn test_embedding_is_normalized() {
        let v = embed("Bonjour le monde, bonjour !");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert_eq!(v.len(), DIMENSIONS);
        assert!(embed("  ,;  ").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_embedding_ignores_case() {
        assert_eq!(embed("Tableau Excel"), embed("tableau excel"));
    }

    #[tokio::test]
    async fn test_nearest_neighbour_ranking() {
        let store = VectorStore::in_memory();
        store
            .add("budget trimestriel dans le tableau excel", MemoryMetadata::new())
            .await
            .unwrap();
        store
            .add("lettre de résiliation pour mon abonnement", MemoryMetadata::new())
            .await
            .unwrap();
        store
            .add("traduction du contrat en anglais", MemoryMetadata::new())
            .await
            .unwrap();

        let hits = store.search("résiliation abonnement", 2, None).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].document.content.contains("résiliation"));
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_metadata_filter() {
        let store = VectorStore::in_memory();
        store
            .add("analyse excel", meta(&[("sessionId", "a")]))
            .await
            .unwrap();
        store
            .add("analyse excel", meta(&[("sessionId", "b")]))
            .await
            .unwrap();

        let filter = meta(&[("sessionId", "b")]);
        let hits = store.search("excel", 5, Some(&filter)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.metadata["sessionId"], "b");
    }

    #[tokio::test]
    async fn test_delete_where_requires_filter() {
        let store = VectorStore::in_memory();
        store.add("x", meta(&[("agent", "chat")])).await.unwrap();
        store.add("y", meta(&[("agent", "mail")])).await.unwrap();

        assert!(store.delete_where(&MemoryMetadata::new()).await.is_err());
        assert_eq!(store.delete_where(&meta(&[("agent", "chat")])).await.unwrap(), 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_snapshot_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("vectorstore").join("vectors.json");

        let store = VectorStore::open(path.clone()).await;
        store
            .add("facture électricité janvier", meta(&[("agent", "document")]))
            .await
            .unwrap();
        assert!(store.is_dirty().await);
        assert!(store.flush().await.unwrap());
        assert!(!store.flush().await.unwrap());

        let reopened = VectorStore::open(path).await;
        assert_eq!(reopened.len().await, 1);
        let hits = reopened.search("facture", 1, None).await.unwrap();
        assert!(hits[0].score > 0.0);
    }

    #[tokio::test]
    async fn test_in_memory_flush_is_noop() {
        let store = VectorStore::in_memory();
        store.add("x", MemoryMetadata::new()).await.unwrap();
        assert!(!store.flush().await.unwrap());
    }
}
