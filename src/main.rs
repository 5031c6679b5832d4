//! # Search Bridge CLI (`sbx`)
//!
//! The `sbx` binary is the operational interface for Search Bridge. It
//! triggers full reindexes, runs one-shot and interactive searches through
//! the persisted query cache, manages that cache, and starts the
//! administrative HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! sbx --config ./config/sbx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sbx reindex` | Replace the remote index with the current corpus |
//! | `sbx search "<query>"` | One-shot search (cache first, then live) |
//! | `sbx watch` | Interactive debounced search on stdin |
//! | `sbx serve` | Start the administrative HTTP server |
//! | `sbx cache show` | List cached queries |
//! | `sbx cache clear` | Reset the persisted cache |
//!
//! ## Environment
//!
//! | Variable | Used by |
//! |----------|---------|
//! | `CMS_READ_TOKEN` | CMS fetch (optional for public datasets) |
//! | `INDEX_ADMIN_API_KEY` | Reindex (clear + bulk write) |
//! | `INDEX_QUERY_API_KEY` | Search queries |
//! | `REINDEX_ADMIN_TOKEN` | `sbx serve` endpoint authorization |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio::sync::Mutex;

use search_bridge::cache::QueryCache;
use search_bridge::cms::CmsClient;
use search_bridge::config::{self, Config};
use search_bridge::controller::SearchController;
use search_bridge::index::{HostedIndex, SearchIndex};
use search_bridge::models::IndexRecord;
use search_bridge::reindex::reindex_all;
use search_bridge::server;

/// Search Bridge CLI — mirrors headless-CMS blog content into a hosted
/// search index and drives the client query path.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/sbx.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "sbx",
    about = "Search Bridge — CMS-to-search-index mirroring and query orchestration",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/sbx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Replace the remote index with the current publishable corpus.
    ///
    /// Fetches every record visible to search, projects it, clears the
    /// remote index, and bulk-loads the projected set. Destructive and
    /// full-replace; safe to re-run at any time. Exits non-zero if the
    /// fetch or either index operation fails.
    Reindex,

    /// Search the remote index once, through the persisted cache.
    ///
    /// A cached query resolves locally without a network call; a miss runs
    /// one live query and stores the result.
    Search {
        /// The search query string.
        query: String,
    },

    /// Interactive search: type queries line by line.
    ///
    /// Each line feeds the debounced controller, so rapid edits collapse
    /// into one query and superseded responses are discarded. The last
    /// typed query is restored on startup.
    Watch,

    /// Start the administrative HTTP server.
    ///
    /// Exposes `POST /reindex` (bearer-token protected) for scheduled jobs
    /// and webhooks, plus `GET /health`.
    Serve,

    /// Inspect or reset the persisted query cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Cache maintenance subcommands.
#[derive(Subcommand)]
enum CacheAction {
    /// List cached queries with their hit counts, most recent first.
    Show,
    /// Drop every cached entry and the saved last query.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Reindex => {
            run_reindex(&cfg).await?;
        }
        Commands::Search { query } => {
            run_search(&cfg, &query).await?;
        }
        Commands::Watch => {
            run_watch(&cfg).await?;
        }
        Commands::Serve => {
            let store = Arc::new(CmsClient::new(&cfg.cms)?);
            let index = Arc::new(HostedIndex::new(&cfg.index)?);
            server::run_server(&cfg, store, index).await?;
        }
        Commands::Cache { action } => match action {
            CacheAction::Show => {
                let cache = QueryCache::open(&cfg.cache.dir, cfg.cache.capacity);
                if cache.is_empty() {
                    println!("cache is empty");
                } else {
                    println!("{:<40} HITS", "QUERY");
                    for (query, hits) in cache.summary() {
                        println!("{:<40} {}", query, hits);
                    }
                    println!("{} cached queries", cache.len());
                }
            }
            CacheAction::Clear => {
                let mut cache = QueryCache::open(&cfg.cache.dir, cfg.cache.capacity);
                cache.clear();
                println!("cache cleared");
            }
        },
    }

    Ok(())
}

async fn run_reindex(cfg: &Config) -> anyhow::Result<()> {
    let store = CmsClient::new(&cfg.cms)?;
    let index = HostedIndex::new(&cfg.index)?;

    let count = reindex_all(&store, &index).await?;

    println!("reindex {}", cfg.index.index_name);
    println!("  indexed: {} records", count);
    println!("ok");
    Ok(())
}

async fn run_search(cfg: &Config, query: &str) -> anyhow::Result<()> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        println!("No results.");
        return Ok(());
    }

    let mut cache = QueryCache::open(&cfg.cache.dir, cfg.cache.capacity);

    if let Some(hits) = cache.get(trimmed) {
        print_hits(&hits, true);
        return Ok(());
    }

    let index = HostedIndex::new(&cfg.index)?;
    let hits = index.query(trimmed).await?;
    cache.put(trimmed, hits.clone());
    print_hits(&hits, false);
    Ok(())
}

fn print_hits(hits: &[IndexRecord], cached: bool) {
    if hits.is_empty() {
        println!("No results.");
        return;
    }
    for (i, hit) in hits.iter().enumerate() {
        let title = if hit.title.is_empty() {
            hit.object_id.as_str()
        } else {
            hit.title.as_str()
        };
        println!("{:2}. {}  /blog/{}", i + 1, title, hit.slug);
        if let Some(tag) = hit.tags.first() {
            println!("      [{}]  {}", tag, hit.published_at);
        } else if !hit.published_at.is_empty() {
            println!("      {}", hit.published_at);
        }
    }
    println!(
        "{} hit{}{}",
        hits.len(),
        if hits.len() == 1 { "" } else { "s" },
        if cached { " (cached)" } else { "" }
    );
}

async fn run_watch(cfg: &Config) -> anyhow::Result<()> {
    let index: Arc<dyn SearchIndex> = Arc::new(HostedIndex::new(&cfg.index)?);
    let cache = Arc::new(Mutex::new(QueryCache::open(
        &cfg.cache.dir,
        cfg.cache.capacity,
    )));

    let restored = cache.lock().await.last_query().map(|q| q.to_string());

    let controller = SearchController::spawn(
        index,
        cache,
        Duration::from_millis(cfg.search.debounce_ms),
    );

    let mut results = controller.results();
    let mut searching = controller.searching();
    let mut query = controller.query();

    println!("type a query and press enter (empty line clears, Ctrl-D exits)");
    if let Some(q) = restored {
        println!("restored query: {}", q);
        controller.input(&q);
    }

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => controller.input(&line),
                    None => break,
                }
            }
            _ = query.changed() => {
                let q = query.borrow_and_update().clone();
                if !q.is_empty() {
                    println!("query: {}", q);
                }
            }
            _ = searching.changed() => {
                if *searching.borrow_and_update() {
                    println!("searching...");
                }
            }
            _ = results.changed() => {
                let hits = results.borrow_and_update().clone();
                print_hits(&hits, false);
            }
        }
    }

    Ok(())
}
