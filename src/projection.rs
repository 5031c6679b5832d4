//! Projection of CMS records into index records.
//!
//! Total by construction: every field of the output is either the source
//! value or its zero value, so a partially populated [`SourceRecord`] never
//! produces an absent field and the remote index schema stays uniform.

use chrono::SecondsFormat;

use crate::models::{IndexRecord, SourceRecord};

/// Flatten a CMS record into the shape persisted in the remote index.
///
/// The first author wins; `excerpt` mirrors `description`; `publishedAt`
/// falls back to the creation timestamp.
pub fn project(record: &SourceRecord) -> IndexRecord {
    let first_author = record.authors.first();

    IndexRecord {
        object_id: record.id.clone(),
        title: record.title.clone().unwrap_or_default(),
        description: record.description.clone().unwrap_or_default(),
        slug: record.slug.clone().unwrap_or_default(),
        published_at: record
            .published_at
            .unwrap_or(record.created_at)
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        author_name: first_author
            .and_then(|a| a.name.clone())
            .unwrap_or_default(),
        author_position: first_author
            .and_then(|a| a.position.clone())
            .unwrap_or_default(),
        image_url: record
            .image
            .as_ref()
            .and_then(|i| i.url.clone())
            .unwrap_or_default(),
        image_alt: record
            .image
            .as_ref()
            .and_then(|i| i.alt.clone())
            .unwrap_or_default(),
        excerpt: record.description.clone().unwrap_or_default(),
        tags: record.tags.clone().unwrap_or_default(),
        record_type: record.record_type.clone(),
        source_id: record.id.clone(),
    }
}
