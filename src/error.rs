//! Error taxonomy for the sync and query paths.
//!
//! The synchronizer's callers need to distinguish a failed content-store
//! read (remote index left untouched, safe to retry any time) from a failed
//! index write (the index may have been cleared; retrying `reindex_all` is
//! the recovery path). Query failures never propagate past the controller.

use thiserror::Error;

/// Failure classes surfaced by the fetch, sync, and query operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The content store could not be read. No index mutation was attempted.
    #[error("content store unavailable: {0}")]
    SourceUnavailable(String),

    /// A clear or bulk-write against the remote index failed. The index may
    /// be empty if the clear succeeded before the write failed.
    #[error("remote index error: {0}")]
    RemoteIndex(String),

    /// A live search query failed. The controller maps this to an empty
    /// result set rather than an error state.
    #[error("search query failed: {0}")]
    Query(String),
}
