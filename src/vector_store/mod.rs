//! Vector store abstraction for Spor.
//!
//! Every video is stored in its own namespace. [`VectorStore`] is the raw
//! storage backend working on embedded documents; [`VectorIndex`] is the
//! text-in, passages-out view the rest of the crate uses.

mod memory;
mod pinecone;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use pinecone::PineconeVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::chunking::{format_timestamp, Chunk};
use crate::config::{Settings, VectorStoreProvider};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{Result, SporError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// A document stored in the vector database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID.
    pub id: Uuid,
    /// Namespace this document belongs to (one per video).
    pub namespace: String,
    /// Text content of this chunk.
    pub content: String,
    /// Start time in the video (seconds).
    pub start_seconds: f64,
    /// Duration in seconds.
    pub duration_seconds: f64,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// Order of this chunk in the video.
    pub chunk_order: i32,
    /// When this document was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl Document {
    pub fn new(namespace: &str, item: &IndexItem, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            namespace: namespace.to_string(),
            content: item.text.clone(),
            start_seconds: item.start,
            duration_seconds: item.duration,
            embedding,
            chunk_order: item.order,
            indexed_at: Utc::now(),
        }
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched document.
    pub document: Document,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend name for logs and diagnostics.
    fn name(&self) -> &str;

    /// Bulk upsert documents.
    async fn upsert_batch(&self, docs: &[Document]) -> Result<usize>;

    /// Search a namespace for the documents most similar to the query.
    async fn search(&self, namespace: &str, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>>;

    /// Delete every document in a namespace.
    async fn delete_namespace(&self, namespace: &str) -> Result<usize>;

    /// Number of documents in a namespace.
    async fn count(&self, namespace: &str) -> Result<usize>;
}

/// One chunk handed to the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexItem {
    pub text: String,
    pub start: f64,
    pub duration: f64,
    pub order: i32,
}

impl IndexItem {
    /// Index items for chunks, numbered in order.
    pub fn from_chunks(chunks: &[Chunk]) -> Vec<Self> {
        chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| Self {
                text: chunk.text.clone(),
                start: chunk.start,
                duration: chunk.duration,
                order: i as i32,
            })
            .collect()
    }
}

/// Opaque handle to an indexed namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHandle {
    pub namespace: String,
}

/// A retrieved chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Passage {
    pub text: String,
    pub start: f64,
    pub duration: f64,
    pub score: f32,
}

impl Passage {
    pub fn format_timestamp(&self) -> String {
        format_timestamp(self.start)
    }
}

/// Capability: store chunks under a namespace and retrieve the passages
/// most relevant to a question.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(&self, namespace: &str, items: &[IndexItem]) -> Result<IndexHandle>;

    async fn retrieve(&self, handle: &IndexHandle, query: &str, k: usize) -> Result<Vec<Passage>>;
}

/// Embedding-backed index over any [`VectorStore`].
pub struct SemanticIndex {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl SemanticIndex {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }
}

#[async_trait]
impl VectorIndex for SemanticIndex {
    #[instrument(skip(self, items), fields(count = items.len()))]
    async fn upsert(&self, namespace: &str, items: &[IndexItem]) -> Result<IndexHandle> {
        // A rebuilt video (after eviction or restart) replaces its old vectors.
        let removed = self.store.delete_namespace(namespace).await?;
        if removed > 0 {
            debug!("Cleared {} stale documents from {}", removed, namespace);
        }

        let texts: Vec<String> = items.iter().map(|item| item.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != items.len() {
            return Err(SporError::Embedding(format!(
                "Expected {} embeddings, got {}",
                items.len(),
                embeddings.len()
            )));
        }

        let docs: Vec<Document> = items
            .iter()
            .zip(embeddings)
            .map(|(item, embedding)| Document::new(namespace, item, embedding))
            .collect();

        let stored = self.store.upsert_batch(&docs).await?;
        info!("Indexed {} chunks in {} ({})", stored, namespace, self.store.name());

        Ok(IndexHandle {
            namespace: namespace.to_string(),
        })
    }

    #[instrument(skip(self, query))]
    async fn retrieve(&self, handle: &IndexHandle, query: &str, k: usize) -> Result<Vec<Passage>> {
        let query_embedding = self.embedder.embed(query).await?;
        let results = self.store.search(&handle.namespace, &query_embedding, k).await?;

        Ok(results
            .into_iter()
            .map(|r| Passage {
                text: r.document.content,
                start: r.document.start_seconds,
                duration: r.document.duration_seconds,
                score: r.score,
            })
            .collect())
    }
}

/// Build the configured vector store backend.
pub fn create_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    let store: Arc<dyn VectorStore> = match settings.vector_store.provider {
        VectorStoreProvider::Memory => Arc::new(MemoryVectorStore::new()),
        VectorStoreProvider::Sqlite => Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?),
        VectorStoreProvider::Pinecone => Arc::new(PineconeVectorStore::from_settings(
            &settings.vector_store.pinecone,
            settings.embedding.dimensions as usize,
        )?),
    };
    Ok(store)
}

/// Build the semantic index from settings (OpenAI embeddings + configured store).
pub fn create_index(settings: &Settings) -> Result<SemanticIndex> {
    let embedder = Arc::new(OpenAIEmbedder::new(&settings.embedding)?);
    Ok(SemanticIndex::new(embedder, create_store(settings)?))
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Rank scored documents best-first and keep the top `limit`.
pub(crate) fn top_k(mut results: Vec<SearchResult>, limit: usize) -> Vec<SearchResult> {
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(limit);
    results
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Embeds text as letter frequencies over a-z, so texts sharing words
    /// score higher.
    pub struct LetterEmbedder;

    #[async_trait]
    impl Embedder for LetterEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0; 26];
            for c in text.to_lowercase().chars().filter(|c| c.is_ascii_lowercase()) {
                v[(c as u8 - b'a') as usize] += 1.0;
            }
            Ok(v)
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            26
        }
    }

    pub fn item(text: &str, start: f64, order: i32) -> IndexItem {
        IndexItem {
            text: text.to_string(),
            start,
            duration: 5.0,
            order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{item, LetterEmbedder};
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0]), 0.0);
    }

    #[test]
    fn test_index_items_are_numbered() {
        let chunks = vec![Chunk::new("a", 0.0, 1.0), Chunk::new("b", 1.0, 2.0)];
        let items = IndexItem::from_chunks(&chunks);
        assert_eq!(items[1].order, 1);
        assert_eq!(items[1].duration, 2.0);
    }

    #[tokio::test]
    async fn test_semantic_index_retrieves_within_namespace() {
        let index = SemanticIndex::new(Arc::new(LetterEmbedder), Arc::new(MemoryVectorStore::new()));

        let handle = index
            .upsert(
                "video-a",
                &[item("zzz zzz", 0.0, 0), item("hello world", 5.0, 1), item("xxx", 10.0, 2)],
            )
            .await
            .unwrap();
        index.upsert("video-b", &[item("hello world", 0.0, 0)]).await.unwrap();

        let passages = index.retrieve(&handle, "hello", 2).await.unwrap();
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].text, "hello world");
        assert_eq!(passages[0].start, 5.0);
        assert_eq!(passages[0].format_timestamp(), "00:05");
    }

    #[tokio::test]
    async fn test_reindexing_replaces_namespace() {
        let store = Arc::new(MemoryVectorStore::new());
        let index = SemanticIndex::new(Arc::new(LetterEmbedder), store.clone());

        index.upsert("v", &[item("one", 0.0, 0), item("two", 5.0, 1)]).await.unwrap();
        index.upsert("v", &[item("three", 0.0, 0)]).await.unwrap();

        assert_eq!(store.count("v").await.unwrap(), 1);
    }
}
