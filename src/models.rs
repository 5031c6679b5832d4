//! Core data models for the indexing and query pipeline.
//!
//! [`SourceRecord`] is the typed contract for content items read from the
//! CMS; every field the upstream may omit is an explicit `Option` resolved
//! to a documented fallback during projection. [`IndexRecord`] is the flat
//! shape persisted in the remote search index and returned as query hits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A content item as read from the CMS, after boundary validation.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_type")]
    pub record_type: String,
    #[serde(rename = "_createdAt")]
    pub created_at: DateTime<Utc>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub slug: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub authors: Vec<AuthorRef>,
    pub image: Option<ImageRef>,
}

/// An author reference attached to a content item.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorRef {
    pub name: Option<String>,
    pub position: Option<String>,
}

/// A resolved image reference attached to a content item.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageRef {
    pub url: Option<String>,
    pub alt: Option<String>,
}

/// The unit persisted in the remote index and returned as a search hit.
///
/// Field names follow the remote index's wire convention (`objectID` is the
/// upsert/delete key). Every field is always present: projection substitutes
/// empty strings and empty lists for absent upstream data so the index
/// schema is uniform across records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    #[serde(rename = "objectID")]
    pub object_id: String,
    pub title: String,
    pub description: String,
    pub slug: String,
    #[serde(rename = "publishedAt")]
    pub published_at: String,
    #[serde(rename = "authorName")]
    pub author_name: String,
    #[serde(rename = "authorPosition")]
    pub author_position: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    #[serde(rename = "imageAlt")]
    pub image_alt: String,
    /// Mirrors `description`; not independently computed.
    pub excerpt: String,
    /// Order preserved for display (the first tag is shown as a badge).
    pub tags: Vec<String>,
    #[serde(rename = "_type")]
    pub record_type: String,
    #[serde(rename = "_id")]
    pub source_id: String,
}
