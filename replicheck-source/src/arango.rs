//! ArangoDB HTTP adapter.
//!
//! Talks to the ArangoDB REST API with basic auth. Listing endpoints return
//! entity sets keyed by name; document keys are listed through the cursor
//! API so recency ordering and limits run server-side.

use crate::source::{DocumentKeyInfo, EntitySource, KeyOrder};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use replicheck_types::{EntityRecord, EntitySet, SourceError, SourceResult};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Connection settings for one ArangoDB instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArangoConfig {
    /// Base URL, e.g. `http://localhost:8529`.
    pub base_url: String,
    /// Database name.
    pub database: String,
    pub username: String,
    pub password: String,
    /// Label used in reports (`db1`/`db2`).
    pub label: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ArangoConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8529".to_string(),
            database: "_system".to_string(),
            username: "root".to_string(),
            password: String::new(),
            label: "db".to_string(),
            timeout_secs: 30,
        }
    }
}

// Cursor API envelopes.
#[derive(Debug, Deserialize)]
struct CursorResponse {
    result: Vec<Value>,
    #[serde(rename = "hasMore", default)]
    has_more: bool,
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

/// HTTP entity source over the ArangoDB REST API.
///
/// Cloneable; the inner client is connection-pooled and safe to share
/// across concurrent workers.
#[derive(Debug, Clone)]
pub struct ArangoSource {
    config: ArangoConfig,
    client: Client,
}

impl ArangoSource {
    /// Creates a source from connection settings.
    pub fn new(config: ArangoConfig) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SourceError::Unavailable(format!("http client: {e}")))?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/_db/{}{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.database,
            path
        )
    }

    fn classify_status(status: StatusCode, body: &str) -> SourceError {
        match status.as_u16() {
            401 | 403 => SourceError::Unavailable(format!("auth rejected ({status}): {body}")),
            400 => SourceError::InvalidArgument(format!("bad request: {body}")),
            404 => SourceError::Permanent(format!("not found: {body}")),
            408 | 429 => SourceError::Transient(format!("retryable ({status}): {body}")),
            s if s >= 500 => SourceError::Transient(format!("server error ({status}): {body}")),
            _ => SourceError::Permanent(format!("unexpected status {status}: {body}")),
        }
    }

    fn classify_request_error(e: reqwest::Error) -> SourceError {
        if e.is_connect() {
            SourceError::Unavailable(format!("connect: {e}"))
        } else if e.is_timeout() {
            SourceError::Transient(format!("timeout: {e}"))
        } else {
            SourceError::Transient(e.to_string())
        }
    }

    async fn get_json(&self, path: &str) -> SourceResult<Value> {
        let response = self
            .client
            .get(self.url(path))
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await
            .map_err(Self::classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body));
        }
        response
            .json()
            .await
            .map_err(|e| SourceError::Permanent(format!("malformed response: {e}")))
    }

    /// Runs an AQL query through the cursor API, following continuation
    /// batches until the cursor is drained.
    async fn execute_query(&self, query: &str, bind_vars: Value) -> SourceResult<Vec<Value>> {
        debug!(source = self.config.label, query, "executing AQL query");
        let response = self
            .client
            .post(self.url("/_api/cursor"))
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(&json!({
                "query": query,
                "bindVars": bind_vars,
                "batchSize": 1000,
            }))
            .send()
            .await
            .map_err(Self::classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body));
        }
        let mut cursor: CursorResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Permanent(format!("malformed cursor response: {e}")))?;

        let mut rows = std::mem::take(&mut cursor.result);
        while cursor.has_more {
            let id = cursor
                .id
                .clone()
                .ok_or_else(|| SourceError::Permanent("cursor has more but no id".to_string()))?;
            let response = self
                .client
                .put(self.url(&format!("/_api/cursor/{id}")))
                .basic_auth(&self.config.username, Some(&self.config.password))
                .send()
                .await
                .map_err(Self::classify_request_error)?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Self::classify_status(status, &body));
            }
            cursor = response
                .json()
                .await
                .map_err(|e| SourceError::Permanent(format!("malformed cursor batch: {e}")))?;
            rows.append(&mut cursor.result);
        }
        Ok(rows)
    }

    /// Lists collections, split by type (2 = document, 3 = edge), with
    /// system collections filtered out.
    async fn list_collections_of_type(&self, edge: bool) -> SourceResult<EntitySet> {
        let body = self.get_json("/_api/collection?excludeSystem=true").await?;
        let items = body
            .get("result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let wanted_type = if edge { 3 } else { 2 };
        let mut set = EntitySet::new();
        for item in items {
            let is_system = item
                .get("isSystem")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let kind = item.get("type").and_then(Value::as_i64).unwrap_or(2);
            if is_system || kind != wanted_type {
                continue;
            }
            if let Some(name) = item.get("name").and_then(Value::as_str) {
                set.insert(EntityRecord::new(name, item.clone()));
            }
        }
        Ok(set)
    }

    async fn list_named(&self, path: &str, result_field: &str) -> SourceResult<EntitySet> {
        let body = self.get_json(path).await?;
        let items = body
            .get(result_field)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let mut set = EntitySet::new();
        for item in items {
            let name = item
                .get("name")
                .or_else(|| item.get("_key"))
                .and_then(Value::as_str);
            if let Some(name) = name {
                set.insert(EntityRecord::new(name, item.clone()));
            }
        }
        Ok(set)
    }
}

/// Parses a recency timestamp, tolerating RFC 3339 strings and epoch
/// numbers (seconds or milliseconds).
fn parse_updated_at(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(n) => {
            let raw = n.as_i64()?;
            if raw > 10_000_000_000 {
                Utc.timestamp_millis_opt(raw).single()
            } else {
                Utc.timestamp_opt(raw, 0).single()
            }
        }
        _ => None,
    }
}

#[async_trait]
impl EntitySource for ArangoSource {
    fn name(&self) -> &str {
        &self.config.label
    }

    async fn ping(&self) -> SourceResult<()> {
        // Any failure at ping time means the source is unusable.
        self.get_json("/_api/version")
            .await
            .map(|_| ())
            .map_err(|e| SourceError::Unavailable(e.to_string()))
    }

    async fn list_collections(&self) -> SourceResult<EntitySet> {
        self.list_collections_of_type(false).await
    }

    async fn list_edge_collections(&self) -> SourceResult<EntitySet> {
        self.list_collections_of_type(true).await
    }

    async fn list_indexes(&self, collection: &str) -> SourceResult<EntitySet> {
        let path = format!(
            "/_api/index?collection={}",
            urlencoding::encode(collection)
        );
        let body = self.get_json(&path).await?;
        let items = body
            .get("indexes")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let mut set = EntitySet::new();
        for item in items {
            // Older servers omit index names; fall back to the id.
            let name = item
                .get("name")
                .or_else(|| item.get("id"))
                .and_then(Value::as_str);
            if let Some(name) = name {
                set.insert(EntityRecord::new(name, item.clone()));
            }
        }
        Ok(set)
    }

    async fn list_analyzers(&self) -> SourceResult<EntitySet> {
        self.list_named("/_api/analyzer", "result").await
    }

    async fn list_graphs(&self) -> SourceResult<EntitySet> {
        self.list_named("/_api/gharial", "graphs").await
    }

    async fn list_views(&self) -> SourceResult<EntitySet> {
        self.list_named("/_api/view", "result").await
    }

    async fn count_documents(&self, collection: &str) -> SourceResult<u64> {
        let path = format!(
            "/_api/collection/{}/count",
            urlencoding::encode(collection)
        );
        let body = self.get_json(&path).await?;
        let parsed: CountResponse = serde_json::from_value(body)
            .map_err(|e| SourceError::Permanent(format!("malformed count response: {e}")))?;
        Ok(parsed.count)
    }

    async fn list_document_keys(
        &self,
        collection: &str,
        order: KeyOrder,
        limit: Option<usize>,
    ) -> SourceResult<Vec<DocumentKeyInfo>> {
        let mut query = String::from("FOR d IN @@collection");
        if order == KeyOrder::RecentFirst {
            // DESC puts documents without the field after timestamped ones.
            query.push_str(" SORT d.updatedAt DESC");
        }
        if limit.is_some() {
            query.push_str(" LIMIT @limit");
        }
        query.push_str(" RETURN { key: d._key, updatedAt: d.updatedAt }");

        let mut bind_vars = json!({ "@collection": collection });
        if let Some(n) = limit {
            bind_vars["limit"] = json!(n);
        }

        let rows = self.execute_query(&query, bind_vars).await?;
        let mut keys = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(key) = row.get("key").and_then(Value::as_str) else {
                continue;
            };
            keys.push(DocumentKeyInfo {
                key: key.to_string(),
                updated_at: parse_updated_at(row.get("updatedAt")),
            });
        }
        Ok(keys)
    }

    async fn get_document(&self, collection: &str, key: &str) -> SourceResult<EntityRecord> {
        let path = format!(
            "/_api/document/{}/{}",
            urlencoding::encode(collection),
            urlencoding::encode(key)
        );
        let body = self.get_json(&path).await?;
        let key = body
            .get("_key")
            .and_then(Value::as_str)
            .unwrap_or(key)
            .to_string();
        Ok(EntityRecord::new(key, body))
    }
}
