//! Source record fetcher: the read interface onto the CMS.
//!
//! [`ContentStore`] is the seam the synchronizer depends on; [`CmsClient`]
//! is the HTTP implementation against the CMS query API. Deserialization
//! into the typed [`SourceRecord`] contract happens here, at the boundary,
//! so nothing downstream guesses at payload shapes.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::CmsConfig;
use crate::error::BridgeError;
use crate::models::SourceRecord;

/// Read access to the content store.
///
/// Implementations return the full set of records visible to search:
/// publishable, not flagged hidden-from-listings, ordered by descending
/// publish time. A failed read must surface as
/// [`BridgeError::SourceUnavailable`] so callers never partially index.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch every record that should appear in the search index.
    async fn fetch_for_indexing(&self) -> Result<Vec<SourceRecord>, BridgeError>;
}

/// HTTP client for the CMS query API.
///
/// Issues a single filtered, ordered query per fetch. The read token is
/// taken from the `CMS_READ_TOKEN` environment variable when present;
/// public datasets work without one.
pub struct CmsClient {
    config: CmsConfig,
    client: reqwest::Client,
}

impl CmsClient {
    pub fn new(config: &CmsConfig) -> Result<Self, BridgeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BridgeError::SourceUnavailable(e.to_string()))?;

        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    /// The filter/order expression sent to the CMS. Hidden records are
    /// excluded; unpublished records are excluded unless the config override
    /// is set.
    fn query_expr(&self) -> String {
        let mut filter = String::from(r#"_type == "blog" && (seoHideFromLists != true)"#);
        if !self.config.include_unpublished {
            filter.push_str(" && defined(publishedAt)");
        }
        format!(
            r#"*[{}] | order(publishedAt desc){{_id, _type, _createdAt, title, description, "slug": slug.current, publishedAt, tags, "authors": authors[]->{{name, position}}, "image": {{"url": image.asset->url, "alt": image.alt}}}}"#,
            filter
        )
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v{}/data/query/{}",
            self.config.url.trim_end_matches('/'),
            self.config.api_version,
            self.config.dataset
        )
    }
}

#[derive(Debug, serde::Deserialize)]
struct QueryResponse {
    result: Option<Vec<SourceRecord>>,
}

#[async_trait]
impl ContentStore for CmsClient {
    async fn fetch_for_indexing(&self) -> Result<Vec<SourceRecord>, BridgeError> {
        let token = std::env::var("CMS_READ_TOKEN").ok();

        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let mut request = self
                .client
                .get(self.endpoint())
                .query(&[("query", self.query_expr())]);
            if let Some(ref token) = token {
                request = request.header("Authorization", format!("Bearer {}", token));
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let parsed: QueryResponse = response
                            .json()
                            .await
                            .map_err(|e| BridgeError::SourceUnavailable(e.to_string()))?;
                        return Ok(parsed.result.unwrap_or_default());
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body = response.text().await.unwrap_or_default();
                        last_err = Some(format!("CMS API error {}: {}", status, body));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body = response.text().await.unwrap_or_default();
                    return Err(BridgeError::SourceUnavailable(format!(
                        "CMS API error {}: {}",
                        status, body
                    )));
                }
                Err(e) => {
                    last_err = Some(e.to_string());
                    continue;
                }
            }
        }

        Err(BridgeError::SourceUnavailable(
            last_err.unwrap_or_else(|| "fetch failed after retries".to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CmsConfig;

    fn test_config() -> CmsConfig {
        CmsConfig {
            url: "https://abc123.api.example.io".to_string(),
            dataset: "production".to_string(),
            api_version: "2024-10-28".to_string(),
            include_unpublished: false,
            timeout_secs: 30,
            max_retries: 5,
        }
    }

    #[test]
    fn test_endpoint_includes_version_and_dataset() {
        let client = CmsClient::new(&test_config()).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://abc123.api.example.io/v2024-10-28/data/query/production"
        );
    }

    #[test]
    fn test_query_excludes_hidden_and_unpublished_by_default() {
        let client = CmsClient::new(&test_config()).unwrap();
        let q = client.query_expr();
        assert!(q.contains("seoHideFromLists != true"));
        assert!(q.contains("defined(publishedAt)"));
        assert!(q.contains("order(publishedAt desc)"));
    }

    #[test]
    fn test_include_unpublished_override_drops_publish_filter() {
        let mut cfg = test_config();
        cfg.include_unpublished = true;
        let client = CmsClient::new(&cfg).unwrap();
        assert!(!client.query_expr().contains("defined(publishedAt)"));
    }

    #[test]
    fn test_source_record_deserializes_from_query_payload() {
        let payload = serde_json::json!({
            "result": [{
                "_id": "post-1",
                "_type": "blog",
                "_createdAt": "2024-11-02T09:00:00Z",
                "title": "Shipping search",
                "description": "How we wired it up",
                "slug": "shipping-search",
                "publishedAt": "2024-11-03T08:00:00Z",
                "tags": ["search"],
                "authors": [{"name": "Ada", "position": "Staff Engineer"}],
                "image": {"url": "https://cdn.example.io/a.png", "alt": "cover"}
            }]
        });
        let parsed: QueryResponse = serde_json::from_value(payload).unwrap();
        let records = parsed.result.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "post-1");
        assert_eq!(records[0].authors[0].name.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_missing_optional_fields_still_deserialize() {
        let payload = serde_json::json!({
            "result": [{
                "_id": "post-2",
                "_type": "blog",
                "_createdAt": "2024-11-02T09:00:00Z"
            }]
        });
        let parsed: QueryResponse = serde_json::from_value(payload).unwrap();
        let records = parsed.result.unwrap();
        assert!(records[0].title.is_none());
        assert!(records[0].authors.is_empty());
        assert!(records[0].image.is_none());
    }

    #[test]
    fn test_null_result_is_empty_set() {
        let parsed: QueryResponse = serde_json::from_value(serde_json::json!({"result": null})).unwrap();
        assert!(parsed.result.unwrap_or_default().is_empty());
    }
}
