//! Pinecone serverless vector store.
//!
//! All videos share one index; each video is a namespace. The index is
//! looked up (and created if missing) on first use, and its data-plane host
//! is remembered for the rest of the process.

use super::{Document, SearchResult, VectorStore};
use crate::config::PineconeSettings;
use crate::error::{Result, SporError};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

/// Vectors per upsert request.
const UPSERT_BATCH: usize = 100;
/// Readiness polls after creating an index.
const READY_ATTEMPTS: u32 = 30;
const READY_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct IndexDescription {
    host: String,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Default, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct VectorMetadata {
    text: String,
    start: f64,
    duration: f64,
    #[serde(default)]
    order: i32,
}

#[derive(Debug, Serialize)]
struct UpsertVector<'a> {
    id: String,
    values: &'a [f32],
    metadata: VectorMetadata,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
    namespace: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    score: f32,
    metadata: Option<VectorMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct IndexStats {
    #[serde(default)]
    namespaces: BTreeMap<String, NamespaceStats>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceStats {
    #[serde(default)]
    vector_count: usize,
}

/// Pinecone-backed vector store.
pub struct PineconeVectorStore {
    client: reqwest::Client,
    api_key: String,
    control_url: Url,
    index_name: String,
    dimension: usize,
    cloud: String,
    region: String,
    host: OnceCell<Url>,
}

impl PineconeVectorStore {
    /// Build from settings, reading the API key from the configured variable.
    pub fn from_settings(settings: &PineconeSettings, dimension: usize) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                SporError::Config(format!(
                    "Pinecone API key not found. Set the {} environment variable.",
                    settings.api_key_env
                ))
            })?;

        Self::with_api_key(settings, dimension, api_key)
    }

    pub fn with_api_key(settings: &PineconeSettings, dimension: usize, api_key: String) -> Result<Self> {
        let control_url = Url::parse(&settings.control_url)
            .map_err(|e| SporError::Config(format!("Invalid Pinecone control URL {}: {}", settings.control_url, e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| SporError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            control_url,
            index_name: settings.index_name.clone(),
            dimension,
            cloud: settings.cloud.clone(),
            region: settings.region.clone(),
            host: OnceCell::new(),
        })
    }

    /// Data-plane URL for the index, resolving (and creating) the index once.
    async fn host(&self) -> Result<&Url> {
        self.host.get_or_try_init(|| self.resolve_host()).await
    }

    #[instrument(skip(self), fields(index = %self.index_name))]
    async fn resolve_host(&self) -> Result<Url> {
        let mut description = match self.describe_index().await? {
            Some(description) => description,
            None => {
                self.create_index().await?;
                self.wait_until_ready().await?
            }
        };

        if description.host.is_empty() {
            description = self.wait_until_ready().await?;
        }

        data_plane_url(&description.host)
    }

    async fn describe_index(&self) -> Result<Option<IndexDescription>> {
        let url = self.control_endpoint(&format!("indexes/{}", self.index_name))?;
        let response = self.client.get(url).header("Api-Key", &self.api_key).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response, "describe index").await?;
        Ok(Some(response.json().await?))
    }

    async fn create_index(&self) -> Result<()> {
        info!(
            "Creating Pinecone index {} ({} dims, {}/{})",
            self.index_name, self.dimension, self.cloud, self.region
        );

        let body = json!({
            "name": self.index_name,
            "dimension": self.dimension,
            "metric": "cosine",
            "spec": { "serverless": { "cloud": self.cloud, "region": self.region } },
        });

        let url = self.control_endpoint("indexes")?;
        let response = self
            .client
            .post(url)
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        // Another process may have created it in the meantime.
        if response.status() == reqwest::StatusCode::CONFLICT {
            warn!("Pinecone index {} already exists", self.index_name);
            return Ok(());
        }
        check_status(response, "create index").await?;
        Ok(())
    }

    async fn wait_until_ready(&self) -> Result<IndexDescription> {
        for attempt in 1..=READY_ATTEMPTS {
            if let Some(description) = self.describe_index().await? {
                if description.status.ready && !description.host.is_empty() {
                    return Ok(description);
                }
            }
            debug!("Waiting for index {} (attempt {})", self.index_name, attempt);
            tokio::time::sleep(READY_INTERVAL).await;
        }

        Err(SporError::VectorStore(format!(
            "Pinecone index {} did not become ready",
            self.index_name
        )))
    }

    fn control_endpoint(&self, path: &str) -> Result<Url> {
        self.control_url
            .join(path)
            .map_err(|e| SporError::Config(format!("Invalid Pinecone URL: {}", e)))
    }

    async fn data_endpoint(&self, path: &str) -> Result<Url> {
        self.host()
            .await?
            .join(path)
            .map_err(|e| SporError::VectorStore(format!("Invalid Pinecone host URL: {}", e)))
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T, what: &str) -> Result<reqwest::Response> {
        let url = self.data_endpoint(path).await?;
        let response = self
            .client
            .post(url)
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await?;
        check_status(response, what).await
    }
}

#[async_trait]
impl VectorStore for PineconeVectorStore {
    fn name(&self) -> &str {
        "pinecone"
    }

    #[instrument(skip(self, docs), fields(count = docs.len()))]
    async fn upsert_batch(&self, docs: &[Document]) -> Result<usize> {
        let mut by_namespace: BTreeMap<&str, Vec<&Document>> = BTreeMap::new();
        for doc in docs {
            by_namespace.entry(doc.namespace.as_str()).or_default().push(doc);
        }

        for (namespace, docs) in by_namespace {
            for batch in docs.chunks(UPSERT_BATCH) {
                let request = UpsertRequest {
                    vectors: batch.iter().map(|doc| to_vector(doc)).collect(),
                    namespace,
                };
                self.post("vectors/upsert", &request, "upsert").await?;
            }
        }

        debug!("Upserted {} vectors", docs.len());
        Ok(docs.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(&self, namespace: &str, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let request = QueryRequest {
            namespace,
            vector: query_embedding,
            top_k: limit,
            include_metadata: true,
        };

        let response: QueryResponse = self.post("query", &request, "query").await?.json().await?;
        Ok(response
            .matches
            .into_iter()
            .filter_map(|m| from_match(namespace, m))
            .collect())
    }

    #[instrument(skip(self))]
    async fn delete_namespace(&self, namespace: &str) -> Result<usize> {
        let existing = self.count(namespace).await?;
        if existing == 0 {
            return Ok(0);
        }

        let body = json!({ "deleteAll": true, "namespace": namespace });
        self.post("vectors/delete", &body, "delete").await?;
        info!("Deleted {} vectors in namespace {}", existing, namespace);
        Ok(existing)
    }

    async fn count(&self, namespace: &str) -> Result<usize> {
        let stats: IndexStats = self
            .post("describe_index_stats", &json!({}), "describe index stats")
            .await?
            .json()
            .await?;
        Ok(stats.namespaces.get(namespace).map(|ns| ns.vector_count).unwrap_or(0))
    }
}

fn data_plane_url(host: &str) -> Result<Url> {
    let base = if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    };
    Url::parse(&base).map_err(|e| SporError::VectorStore(format!("Invalid Pinecone host {}: {}", host, e)))
}

fn to_vector(doc: &Document) -> UpsertVector<'_> {
    UpsertVector {
        id: doc.id.to_string(),
        values: &doc.embedding,
        metadata: VectorMetadata {
            text: doc.content.clone(),
            start: doc.start_seconds,
            duration: doc.duration_seconds,
            order: doc.chunk_order,
        },
    }
}

fn from_match(namespace: &str, m: QueryMatch) -> Option<SearchResult> {
    let metadata = m.metadata?;
    Some(SearchResult {
        document: Document {
            id: Uuid::parse_str(&m.id).unwrap_or_default(),
            namespace: namespace.to_string(),
            content: metadata.text,
            start_seconds: metadata.start,
            duration_seconds: metadata.duration,
            embedding: Vec::new(),
            chunk_order: metadata.order,
            indexed_at: Utc::now(),
        },
        score: m.score,
    })
}

async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SporError::VectorStore(format!(
        "Pinecone {} failed ({}): {}",
        what, status, body
    )))
}

#[cfg(test)]
mod tests {
    use super::super::testing::item;
    use super::*;

    #[test]
    fn test_missing_api_key_is_config_error() {
        let settings = PineconeSettings {
            api_key_env: "SPOR_TEST_UNSET_PINECONE_KEY".to_string(),
            ..Default::default()
        };
        let err = PineconeVectorStore::from_settings(&settings, 1536).err().unwrap();
        assert!(matches!(err, SporError::Config(_)));
        assert!(err.to_string().contains("SPOR_TEST_UNSET_PINECONE_KEY"));
    }

    #[test]
    fn test_urls() {
        let store =
            PineconeVectorStore::with_api_key(&PineconeSettings::default(), 1536, "key".into()).unwrap();
        assert_eq!(
            store.control_endpoint("indexes/youtube-assistant").unwrap().as_str(),
            "https://api.pinecone.io/indexes/youtube-assistant"
        );

        let host = data_plane_url("youtube-assistant-abc.svc.pinecone.io").unwrap();
        assert_eq!(
            host.join("vectors/upsert").unwrap().as_str(),
            "https://youtube-assistant-abc.svc.pinecone.io/vectors/upsert"
        );
        assert_eq!(data_plane_url("http://localhost:5080").unwrap().port(), Some(5080));
    }

    #[test]
    fn test_request_bodies() {
        let doc = Document::new("vid", &item("some words", 4.0, 2), vec![0.25, 0.5]);
        let request = UpsertRequest {
            vectors: vec![to_vector(&doc)],
            namespace: "vid",
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["namespace"], "vid");
        assert_eq!(value["vectors"][0]["values"], json!([0.25, 0.5]));
        assert_eq!(value["vectors"][0]["metadata"]["text"], "some words");
        assert_eq!(value["vectors"][0]["metadata"]["start"], 4.0);

        let query = QueryRequest {
            namespace: "vid",
            vector: &[1.0],
            top_k: 6,
            include_metadata: true,
        };
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value["topK"], 6);
        assert_eq!(value["includeMetadata"], true);
    }

    #[test]
    fn test_parse_query_response() {
        let raw = r#"{
            "matches": [
                {"id": "a", "score": 0.9, "metadata": {"text": "hit", "start": 1.5, "duration": 3.0}},
                {"id": "b", "score": 0.5}
            ],
            "namespace": "vid"
        }"#;
        let response: QueryResponse = serde_json::from_str(raw).unwrap();
        let results: Vec<SearchResult> = response
            .matches
            .into_iter()
            .filter_map(|m| from_match("vid", m))
            .collect();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.content, "hit");
        assert_eq!(results[0].document.start_seconds, 1.5);
        assert!((results[0].score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_parse_stats() {
        let raw = r#"{"namespaces": {"vid": {"vectorCount": 12}}, "dimension": 1536}"#;
        let stats: IndexStats = serde_json::from_str(raw).unwrap();
        assert_eq!(stats.namespaces["vid"].vector_count, 12);
    }
}
