//! Full-reindex synchronization.
//!
//! The remote index is replaced wholesale: clear everything, then bulk-load
//! the freshly projected corpus. Replace-not-merge keeps deletions and
//! unpublishes correct without tracking prior index state; the cost is one
//! full-corpus write per run, acceptable for an administratively triggered
//! sync. Two concurrent runs are not coordinated here — callers serialize.

use tracing::{info, warn};

use crate::cms::ContentStore;
use crate::error::BridgeError;
use crate::index::SearchIndex;
use crate::projection::project;

/// Replace the remote index contents with the current publishable corpus.
///
/// Fetches every record visible to search, projects each into its index
/// shape, clears the remote index, and bulk-upserts the projected set (the
/// write is skipped when the corpus is empty). Returns the number of
/// records indexed.
///
/// A fetch failure aborts before any index mutation, so a read outage can
/// never replace good index data with a partial or empty set. A clear or
/// write failure aborts at the failing step; if the clear succeeded the
/// index may be left empty until the next successful run.
pub async fn reindex_all(
    store: &dyn ContentStore,
    index: &dyn SearchIndex,
) -> Result<usize, BridgeError> {
    let records = match store.fetch_for_indexing().await {
        Ok(records) => records,
        Err(e) => {
            warn!("reindex aborted before touching the index: {}", e);
            return Err(e);
        }
    };

    let projected: Vec<_> = records.iter().map(project).collect();
    info!(count = projected.len(), "fetched corpus for reindex");

    index.clear_all().await?;

    if !projected.is_empty() {
        index.save_records(&projected).await?;
    }

    info!(count = projected.len(), "reindex complete");
    Ok(projected.len())
}
