//! In-memory vector store implementation.
//!
//! Lives as long as the process; the default backend.

use super::{cosine_similarity, top_k, Document, SearchResult, VectorStore};
use crate::error::{Result, SporError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

type Namespaces = HashMap<String, HashMap<Uuid, Document>>;

/// In-memory vector store, documents grouped by namespace.
pub struct MemoryVectorStore {
    namespaces: RwLock<Namespaces>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Namespaces>> {
        self.namespaces
            .read()
            .map_err(|e| SporError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Namespaces>> {
        self.namespaces
            .write()
            .map_err(|e| SporError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upsert_batch(&self, docs: &[Document]) -> Result<usize> {
        let mut store = self.write()?;
        for doc in docs {
            store
                .entry(doc.namespace.clone())
                .or_default()
                .insert(doc.id, doc.clone());
        }
        Ok(docs.len())
    }

    async fn search(&self, namespace: &str, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let store = self.read()?;
        let Some(docs) = store.get(namespace) else {
            return Ok(Vec::new());
        };

        let results = docs
            .values()
            .map(|doc| SearchResult {
                score: cosine_similarity(query_embedding, &doc.embedding),
                document: doc.clone(),
            })
            .collect();

        Ok(top_k(results, limit))
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<usize> {
        let mut store = self.write()?;
        Ok(store.remove(namespace).map(|docs| docs.len()).unwrap_or(0))
    }

    async fn count(&self, namespace: &str) -> Result<usize> {
        let store = self.read()?;
        Ok(store.get(namespace).map(|docs| docs.len()).unwrap_or(0))
    }
}
