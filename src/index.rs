//! Remote search index interface.
//!
//! [`SearchIndex`] is the seam between the synchronizer/controller and the
//! hosted search service: clear-all, bulk upsert, and query. The index name
//! lives in configuration and is baked into the client at construction —
//! there is no module-level client instance; callers construct one and pass
//! it where it is needed.
//!
//! Two implementations:
//! - **[`HostedIndex`]** — the managed search service's HTTP API, with the
//!   usual timeout + retry/backoff treatment.
//! - **[`MemoryIndex`]** — in-process implementation for tests and offline
//!   runs. Term-count ranking only; it is not a relevance engine.

use async_trait::async_trait;
use std::sync::RwLock;
use std::time::Duration;

use crate::config::IndexConfig;
use crate::error::BridgeError;
use crate::models::IndexRecord;

/// Operations the core needs from the remote search index.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Delete every record in the index.
    async fn clear_all(&self) -> Result<(), BridgeError>;

    /// Bulk-upsert the given records, keyed by `objectID`.
    async fn save_records(&self, records: &[IndexRecord]) -> Result<(), BridgeError>;

    /// Run a live search query and return the ordered hits.
    async fn query(&self, query: &str) -> Result<Vec<IndexRecord>, BridgeError>;
}

// ============ Hosted Index ============

/// Which credential a hosted-index call authenticates with.
enum KeyKind {
    /// `INDEX_ADMIN_API_KEY` — required for clear and bulk-write.
    Admin,
    /// `INDEX_QUERY_API_KEY` — search-only key used by the query path.
    Query,
}

/// Client for the hosted search service's REST API.
pub struct HostedIndex {
    config: IndexConfig,
    client: reqwest::Client,
}

impl HostedIndex {
    pub fn new(config: &IndexConfig) -> Result<Self, BridgeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BridgeError::RemoteIndex(e.to_string()))?;

        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    fn base_url(&self) -> String {
        match &self.config.url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}-dsn.algolia.net", self.config.app_id),
        }
    }

    fn key(&self, kind: &KeyKind) -> Result<String, BridgeError> {
        let (var, label) = match kind {
            KeyKind::Admin => ("INDEX_ADMIN_API_KEY", "admin"),
            KeyKind::Query => ("INDEX_QUERY_API_KEY", "query"),
        };
        std::env::var(var).map_err(|_| {
            BridgeError::RemoteIndex(format!("{} not set ({} API key)", var, label))
        })
    }

    /// POST a JSON body with retry/backoff. 429 and 5xx retry; other 4xx
    /// fail immediately; network errors retry.
    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
        kind: KeyKind,
    ) -> Result<serde_json::Value, String> {
        let api_key = match self.key(&kind) {
            Ok(k) => k,
            Err(e) => return Err(e.to_string()),
        };
        let url = format!("{}{}", self.base_url(), path);

        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&url)
                .header("X-Algolia-Application-Id", &self.config.app_id)
                .header("X-Algolia-API-Key", &api_key)
                .json(body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response.json().await.map_err(|e| e.to_string());
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(format!("index API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    return Err(format!("index API error {}: {}", status, body_text));
                }
                Err(e) => {
                    last_err = Some(e.to_string());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| "index request failed after retries".to_string()))
    }
}

#[async_trait]
impl SearchIndex for HostedIndex {
    async fn clear_all(&self) -> Result<(), BridgeError> {
        let path = format!("/1/indexes/{}/clear", self.config.index_name);
        self.post_json(&path, &serde_json::json!({}), KeyKind::Admin)
            .await
            .map(|_| ())
            .map_err(BridgeError::RemoteIndex)
    }

    async fn save_records(&self, records: &[IndexRecord]) -> Result<(), BridgeError> {
        let requests: Vec<serde_json::Value> = records
            .iter()
            .map(|r| {
                serde_json::json!({
                    "action": "updateObject",
                    "body": r,
                })
            })
            .collect();

        let path = format!("/1/indexes/{}/batch", self.config.index_name);
        self.post_json(&path, &serde_json::json!({ "requests": requests }), KeyKind::Admin)
            .await
            .map(|_| ())
            .map_err(BridgeError::RemoteIndex)
    }

    async fn query(&self, query: &str) -> Result<Vec<IndexRecord>, BridgeError> {
        let path = format!("/1/indexes/{}/query", self.config.index_name);
        let response = self
            .post_json(&path, &serde_json::json!({ "query": query }), KeyKind::Query)
            .await
            .map_err(BridgeError::Query)?;

        let hits = response
            .get("hits")
            .and_then(|h| h.as_array())
            .ok_or_else(|| BridgeError::Query("missing hits array in response".to_string()))?;

        hits.iter()
            .map(|h| {
                serde_json::from_value(h.clone())
                    .map_err(|e| BridgeError::Query(format!("malformed hit: {}", e)))
            })
            .collect()
    }
}

// ============ Memory Index ============

/// In-process [`SearchIndex`] for tests and offline runs.
///
/// Stores records in insertion order (the synchronizer writes them in
/// descending publish time, so that order is what queries return). Ranking
/// is matched-term count over title, description, tags, and author name.
pub struct MemoryIndex {
    records: RwLock<Vec<IndexRecord>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the stored records, in stored order.
    pub fn records(&self) -> Vec<IndexRecord> {
        self.records.read().unwrap().clone()
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn match_count(record: &IndexRecord, terms: &[&str]) -> usize {
    let haystack = format!(
        "{} {} {} {}",
        record.title,
        record.description,
        record.tags.join(" "),
        record.author_name
    )
    .to_lowercase();
    terms.iter().filter(|t| haystack.contains(**t)).count()
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn clear_all(&self) -> Result<(), BridgeError> {
        self.records.write().unwrap().clear();
        Ok(())
    }

    async fn save_records(&self, records: &[IndexRecord]) -> Result<(), BridgeError> {
        let mut stored = self.records.write().unwrap();
        for record in records {
            // objectID is the upsert key
            stored.retain(|r| r.object_id != record.object_id);
            stored.push(record.clone());
        }
        Ok(())
    }

    async fn query(&self, query: &str) -> Result<Vec<IndexRecord>, BridgeError> {
        let query_lower = query.to_lowercase();
        let terms: Vec<&str> = query_lower.split_whitespace().collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let stored = self.records.read().unwrap();
        let mut scored: Vec<(usize, &IndexRecord)> = stored
            .iter()
            .filter_map(|r| {
                let matches = match_count(r, &terms);
                if matches > 0 {
                    Some((matches, r))
                } else {
                    None
                }
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().map(|(_, r)| r.clone()).collect())
    }
}
