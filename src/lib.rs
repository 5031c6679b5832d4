//! # Search Bridge
//!
//! Mirrors publishable blog content from a headless CMS into a hosted
//! search index and drives the client-side query path: debounced input, a
//! persisted read-through cache, and stale-response suppression.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌──────────────┐
//! │   CMS    │──▶│ Projection │──▶│ Full Reindex │──▶ hosted index
//! │ (query)  │   │ (flatten)  │   │ (clear+load) │
//! └──────────┘   └────────────┘   └──────────────┘
//!
//! keystrokes ──▶ ┌────────────┐   ┌───────────┐
//!                │ Controller │──▶│   Cache   │──▶ hit: resolve
//!                │ (debounce) │   │ (LRU+disk)│
//!                └─────┬──────┘   └───────────┘
//!                      └── miss: live query ──▶ hosted index
//! ```
//!
//! The reindex path replaces the remote index wholesale on each run; it is
//! triggered administratively (CLI or authorized HTTP call), never on
//! content edits. The query path resolves at most one live query per
//! debounce window and discards responses that a newer query has
//! superseded.
//!
//! ## Quick Start
//!
//! ```bash
//! sbx reindex                     # mirror the corpus into the index
//! sbx search "deployment"         # one-shot query through the cache
//! sbx watch                       # interactive debounced search
//! sbx serve                       # admin HTTP trigger
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Source and index record types |
//! | [`error`] | Failure taxonomy |
//! | [`cms`] | CMS read interface |
//! | [`projection`] | Source → index record flattening |
//! | [`index`] | Remote search index clients |
//! | [`reindex`] | Full-replace synchronization |
//! | [`cache`] | Persisted read-through query cache |
//! | [`controller`] | Debounced query controller |
//! | [`server`] | Administrative HTTP server |

pub mod cache;
pub mod cms;
pub mod config;
pub mod controller;
pub mod error;
pub mod index;
pub mod models;
pub mod projection;
pub mod reindex;
pub mod server;
