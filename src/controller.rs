//! Debounced query controller.
//!
//! The interactive front door for search: raw keystroke input goes in, and
//! three independently observable signals come out — the current result
//! set, the in-flight flag, and the trimmed query being displayed. The
//! signals are `watch` channels; a consuming view reads whichever it needs.
//!
//! Per quiescence window the controller resolves at most one query:
//!
//! - Input changes reset the window (last keystroke wins).
//! - An empty trimmed query resolves to no results, touching neither cache
//!   nor network.
//! - A cached query resolves from the cache; the in-flight flag is never
//!   raised.
//! - Otherwise one live query is issued, tagged with the current generation.
//!   A completion from a superseded generation is discarded, so a slow
//!   response can never overwrite the results of a newer query.
//! - A failed live query resolves to an empty result set; the failure is
//!   logged, not surfaced as a distinct state.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::QueryCache;
use crate::error::BridgeError;
use crate::index::SearchIndex;
use crate::models::IndexRecord;

/// Outcome of a live query, tagged with the generation that issued it.
struct Completion {
    generation: u64,
    query: String,
    outcome: Result<Vec<IndexRecord>, BridgeError>,
}

/// Drives the debounce/cache/query lifecycle on a background task.
///
/// Dropping the controller stops the task; any in-flight query is
/// abandoned.
pub struct SearchController {
    input_tx: mpsc::UnboundedSender<String>,
    results_rx: watch::Receiver<Vec<IndexRecord>>,
    searching_rx: watch::Receiver<bool>,
    query_rx: watch::Receiver<String>,
    worker: JoinHandle<()>,
}

impl SearchController {
    /// Spawn a controller over the given index and cache.
    pub fn spawn(
        index: Arc<dyn SearchIndex>,
        cache: Arc<Mutex<QueryCache>>,
        debounce: Duration,
    ) -> Self {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (results_tx, results_rx) = watch::channel(Vec::new());
        let (searching_tx, searching_rx) = watch::channel(false);
        let (query_tx, query_rx) = watch::channel(String::new());

        let worker = tokio::spawn(worker_loop(
            input_rx,
            index,
            cache,
            debounce,
            results_tx,
            searching_tx,
            query_tx,
        ));

        Self {
            input_tx,
            results_rx,
            searching_rx,
            query_rx,
            worker,
        }
    }

    /// Feed the current raw input value. Resets the quiescence window.
    pub fn input(&self, raw: &str) {
        let _ = self.input_tx.send(raw.to_string());
    }

    /// The most recently resolved result set.
    pub fn results(&self) -> watch::Receiver<Vec<IndexRecord>> {
        self.results_rx.clone()
    }

    /// Whether a live query is currently in flight.
    pub fn searching(&self) -> watch::Receiver<bool> {
        self.searching_rx.clone()
    }

    /// The trimmed query string the current results belong to.
    pub fn query(&self) -> watch::Receiver<String> {
        self.query_rx.clone()
    }
}

impl Drop for SearchController {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

#[allow(clippy::too_many_arguments)]
async fn worker_loop(
    mut input_rx: mpsc::UnboundedReceiver<String>,
    index: Arc<dyn SearchIndex>,
    cache: Arc<Mutex<QueryCache>>,
    debounce: Duration,
    results_tx: watch::Sender<Vec<IndexRecord>>,
    searching_tx: watch::Sender<bool>,
    query_tx: watch::Sender<String>,
) {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();

    let mut pending: Option<String> = None;
    let mut deadline: Option<Instant> = None;
    let mut generation: u64 = 0;

    loop {
        tokio::select! {
            maybe_input = input_rx.recv() => {
                match maybe_input {
                    Some(raw) => {
                        cache.lock().await.set_last_query(&raw);
                        pending = Some(raw);
                        deadline = Some(Instant::now() + debounce);
                    }
                    None => break,
                }
            }

            Some(completion) = done_rx.recv() => {
                if completion.generation != generation {
                    debug!(query = %completion.query, "discarding stale query response");
                    continue;
                }
                searching_tx.send_replace(false);
                match completion.outcome {
                    Ok(hits) => {
                        cache.lock().await.put(&completion.query, hits.clone());
                        results_tx.send_replace(hits);
                    }
                    Err(e) => {
                        warn!(query = %completion.query, "live query failed: {}", e);
                        results_tx.send_replace(Vec::new());
                    }
                }
            }

            _ = async { tokio::time::sleep_until(deadline.unwrap()).await }, if deadline.is_some() => {
                deadline = None;
                let raw = pending.take().unwrap_or_default();
                generation += 1;

                let trimmed = raw.trim().to_string();
                query_tx.send_replace(trimmed.clone());

                if trimmed.is_empty() {
                    // Cleared search: no cache, no network.
                    lower_flag(&searching_tx);
                    results_tx.send_replace(Vec::new());
                    continue;
                }

                if let Some(hits) = cache.lock().await.get(&trimmed) {
                    lower_flag(&searching_tx);
                    results_tx.send_replace(hits);
                    continue;
                }

                searching_tx.send_replace(true);
                let index = index.clone();
                let done_tx = done_tx.clone();
                let issued = generation;
                tokio::spawn(async move {
                    let outcome = index.query(&trimmed).await;
                    let _ = done_tx.send(Completion {
                        generation: issued,
                        query: trimmed,
                        outcome,
                    });
                });
            }
        }
    }
}

fn lower_flag(searching_tx: &watch::Sender<bool>) {
    if *searching_tx.borrow() {
        searching_tx.send_replace(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryIndex;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const DEBOUNCE: Duration = Duration::from_millis(300);

    fn hit(id: &str, title: &str) -> IndexRecord {
        IndexRecord {
            object_id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            slug: String::new(),
            published_at: String::new(),
            author_name: String::new(),
            author_position: String::new(),
            image_url: String::new(),
            image_alt: String::new(),
            excerpt: String::new(),
            tags: Vec::new(),
            record_type: "blog".to_string(),
            source_id: id.to_string(),
        }
    }

    /// Index wrapper counting live queries.
    struct CountingIndex {
        inner: MemoryIndex,
        queries: AtomicUsize,
    }

    impl CountingIndex {
        fn new() -> Self {
            Self {
                inner: MemoryIndex::new(),
                queries: AtomicUsize::new(0),
            }
        }

        fn query_count(&self) -> usize {
            self.queries.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SearchIndex for CountingIndex {
        async fn clear_all(&self) -> Result<(), BridgeError> {
            self.inner.clear_all().await
        }

        async fn save_records(&self, records: &[IndexRecord]) -> Result<(), BridgeError> {
            self.inner.save_records(records).await
        }

        async fn query(&self, query: &str) -> Result<Vec<IndexRecord>, BridgeError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.inner.query(query).await
        }
    }

    /// Index whose responses take a fixed, per-query time to arrive.
    struct DelayedIndex {
        inner: MemoryIndex,
        delays: Vec<(String, Duration)>,
    }

    #[async_trait]
    impl SearchIndex for DelayedIndex {
        async fn clear_all(&self) -> Result<(), BridgeError> {
            self.inner.clear_all().await
        }

        async fn save_records(&self, records: &[IndexRecord]) -> Result<(), BridgeError> {
            self.inner.save_records(records).await
        }

        async fn query(&self, query: &str) -> Result<Vec<IndexRecord>, BridgeError> {
            if let Some((_, delay)) = self.delays.iter().find(|(q, _)| q == query) {
                tokio::time::sleep(*delay).await;
            }
            self.inner.query(query).await
        }
    }

    /// Index whose query path always fails.
    struct BrokenIndex;

    #[async_trait]
    impl SearchIndex for BrokenIndex {
        async fn clear_all(&self) -> Result<(), BridgeError> {
            Ok(())
        }

        async fn save_records(&self, _records: &[IndexRecord]) -> Result<(), BridgeError> {
            Ok(())
        }

        async fn query(&self, _query: &str) -> Result<Vec<IndexRecord>, BridgeError> {
            Err(BridgeError::Query("service unavailable".to_string()))
        }
    }

    fn test_cache(tmp: &TempDir) -> Arc<Mutex<QueryCache>> {
        Arc::new(Mutex::new(QueryCache::open(tmp.path(), 16)))
    }

    async fn settle() {
        // Paused clock: sleeping well past the debounce window lets the
        // worker drain every pending event deterministically.
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_one_query_for_final_value() {
        let tmp = TempDir::new().unwrap();
        let index = Arc::new(CountingIndex::new());
        index
            .inner
            .save_records(&[hit("a", "abc post")])
            .await
            .unwrap();

        let controller =
            SearchController::spawn(index.clone(), test_cache(&tmp), DEBOUNCE);

        controller.input("a");
        tokio::time::sleep(Duration::from_millis(100)).await;
        controller.input("ab");
        tokio::time::sleep(Duration::from_millis(100)).await;
        controller.input("abc");
        settle().await;

        assert_eq!(index.query_count(), 1);
        assert_eq!(*controller.query().borrow(), "abc");
        assert_eq!(controller.results().borrow().len(), 1);
        assert!(!*controller.searching().borrow());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_query_short_circuits() {
        let tmp = TempDir::new().unwrap();
        let index = Arc::new(CountingIndex::new());
        let cache = test_cache(&tmp);
        let controller = SearchController::spawn(index.clone(), cache.clone(), DEBOUNCE);

        controller.input("   ");
        settle().await;

        assert_eq!(index.query_count(), 0);
        assert_eq!(*controller.query().borrow(), "");
        assert!(controller.results().borrow().is_empty());
        // The whitespace-only query must not have been cached either.
        assert!(cache.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_avoids_network_and_inflight_flag() {
        let tmp = TempDir::new().unwrap();
        let index = Arc::new(CountingIndex::new());
        let cache = test_cache(&tmp);
        cache
            .lock()
            .await
            .put("pikachu", vec![hit("a1", "Pikachu deep dive")]);

        let controller = SearchController::spawn(index.clone(), cache, DEBOUNCE);
        let searching = controller.searching();

        controller.input("pikachu");
        settle().await;

        assert_eq!(index.query_count(), 0);
        assert_eq!(controller.results().borrow()[0].object_id, "a1");
        // The flag never rose: no change notification beyond the initial value.
        assert!(!searching.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_miss_populates_cache() {
        let tmp = TempDir::new().unwrap();
        let index = Arc::new(CountingIndex::new());
        index
            .inner
            .save_records(&[hit("a", "charmander notes")])
            .await
            .unwrap();
        let cache = test_cache(&tmp);

        let controller = SearchController::spawn(index.clone(), cache.clone(), DEBOUNCE);
        controller.input("charmander");
        settle().await;

        assert_eq!(index.query_count(), 1);
        assert_eq!(cache.lock().await.get("charmander").unwrap().len(), 1);

        // The same query again resolves from cache.
        controller.input("");
        settle().await;
        controller.input("charmander");
        settle().await;
        assert_eq!(index.query_count(), 1);
        assert_eq!(controller.results().borrow().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_failure_resolves_to_empty_results() {
        let tmp = TempDir::new().unwrap();
        let cache = test_cache(&tmp);
        let controller =
            SearchController::spawn(Arc::new(BrokenIndex), cache.clone(), DEBOUNCE);

        controller.input("anything");
        settle().await;

        assert!(controller.results().borrow().is_empty());
        assert!(!*controller.searching().borrow());
        // Failures are not cached.
        assert!(cache.lock().await.get("anything").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_is_discarded() {
        let tmp = TempDir::new().unwrap();
        let inner = MemoryIndex::new();
        inner
            .save_records(&[hit("c1", "char overview"), hit("c2", "charizard guide")])
            .await
            .unwrap();
        let index = Arc::new(DelayedIndex {
            inner,
            delays: vec![
                ("char".to_string(), Duration::from_millis(800)),
                ("charizard".to_string(), Duration::from_millis(50)),
            ],
        });
        let cache = test_cache(&tmp);
        let controller = SearchController::spawn(index, cache.clone(), DEBOUNCE);

        controller.input("char");
        // Let the first query fire and hang in flight.
        tokio::time::sleep(Duration::from_millis(400)).await;
        controller.input("charizard");
        settle().await;

        // The slow "char" response arrived after "charizard" resolved and
        // must not have replaced it.
        assert_eq!(*controller.query().borrow(), "charizard");
        let results = controller.results().borrow().clone();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].object_id, "c2");
        // The discarded response was not cached under its query either.
        assert!(cache.lock().await.get("char").is_none());
        assert!(!*controller.searching().borrow());
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_query_persisted_per_keystroke() {
        let tmp = TempDir::new().unwrap();
        let cache = test_cache(&tmp);
        let controller =
            SearchController::spawn(Arc::new(CountingIndex::new()), cache.clone(), DEBOUNCE);

        controller.input("dra");
        controller.input("dragonite");
        settle().await;

        assert_eq!(cache.lock().await.last_query(), Some("dragonite"));
    }
}
