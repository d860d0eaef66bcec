//! Pinecone vector database integration.
//!
//! Talks to the Pinecone REST API directly:
//! - control plane `GET /indexes/{name}` to find the data-plane host
//! - data plane `POST /vectors/upsert`, `POST /query`, `POST /describe_index_stats`
//!
//! # Feature Flag
//!
//! Enable with `--features pinecone` (on by default)

use crate::db::vectorstore::VectorIndex;
use crate::types::{AppError, QueryMatch, RecordMetadata, Result, VectorRecord};
use crate::utils::http::join_url;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const API_VERSION: &str = "2024-07";

/// Pinecone index client bound to one data-plane host and namespace.
pub struct PineconeIndex {
    http: reqwest::Client,
    api_key: String,
    host: String,
    namespace: Option<String>,
}

#[derive(Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<PineconeMatch>,
}

#[derive(Deserialize)]
struct PineconeMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexStatsResponse {
    #[serde(default)]
    total_vector_count: usize,
    #[serde(default)]
    namespaces: std::collections::HashMap<String, NamespaceStats>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceStats {
    #[serde(default)]
    vector_count: usize,
}

/// Data-plane hosts come back without a scheme.
fn normalize_host(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", host.trim_end_matches('/'))
    }
}

/// Look up the data-plane host of `index_name` through the control plane.
pub async fn describe_index_host(
    http: &reqwest::Client,
    control_plane_url: &str,
    api_key: &str,
    index_name: &str,
) -> Result<String> {
    let response = http
        .get(join_url(control_plane_url, &format!("indexes/{}", index_name)))
        .header("Api-Key", api_key)
        .header("X-Pinecone-API-Version", API_VERSION)
        .send()
        .await
        .map_err(|e| AppError::Configuration(format!("Pinecone index lookup failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Configuration(format!(
            "Pinecone index '{}' lookup returned {}: {}",
            index_name, status, body
        )));
    }

    let described: DescribeIndexResponse = response.json().await.map_err(|e| {
        AppError::Configuration(format!("Malformed Pinecone index description: {}", e))
    })?;

    tracing::info!(index = %index_name, host = %described.host, "Resolved Pinecone index host");
    Ok(normalize_host(&described.host))
}

impl PineconeIndex {
    pub fn new(
        http: reqwest::Client,
        api_key: String,
        host: &str,
        namespace: Option<String>,
    ) -> Self {
        Self {
            http,
            api_key,
            host: normalize_host(host),
            namespace,
        }
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        operation: &str,
    ) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(join_url(&self.host, path))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Pinecone {} failed: {}", operation, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Pinecone {} returned {}: {}",
                operation, status, body
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn provider_name(&self) -> &'static str {
        "pinecone"
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let request = UpsertRequest {
            vectors: records,
            namespace: self.namespace.as_deref(),
        };
        let response = self.post("vectors/upsert", &request, "upsert").await?;
        let parsed: UpsertResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Malformed Pinecone upsert response: {}", e)))?;

        Ok(parsed.upserted_count)
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<QueryMatch>> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata,
            include_values: false,
            namespace: self.namespace.as_deref(),
        };
        let response = self.post("query", &request, "query").await?;
        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Malformed Pinecone query response: {}", e)))?;

        Ok(parsed
            .matches
            .into_iter()
            .map(|m| QueryMatch {
                id: m.id,
                score: m.score,
                // Records written by other tools may lack a text field
                metadata: m.metadata.and_then(|meta| {
                    meta.get("text")
                        .and_then(|t| t.as_str())
                        .map(|text| RecordMetadata {
                            text: text.to_string(),
                        })
                }),
            })
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        let response = self
            .post("describe_index_stats", &serde_json::json!({}), "describe_index_stats")
            .await?;
        let stats: IndexStatsResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Malformed Pinecone stats response: {}", e)))?;

        match &self.namespace {
            Some(ns) => Ok(stats.namespaces.get(ns).map(|s| s.vector_count).unwrap_or(0)),
            None => Ok(stats.total_vector_count),
        }
    }
}
