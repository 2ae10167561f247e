#![allow(dead_code)]

use async_trait::async_trait;
use searchgate::store::memory::MemoryIndex;
use searchgate::store::{
    CacheStore, DeferredTask, FacetResult, HttpCallbackScheduler, IndexHandle, IteratorResult,
    ListOptions, MemoryCacheStore, MemorySearchStore, ResultIterator, SearchOptions, SearchStore,
    TaskScheduler,
};
use searchgate::{Document, DocumentId, GatewayConfig, GatewayError, Result, SearchGateway};
use searchgate_http::auth::Secrets;
use searchgate_http::handlers::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

pub const LIVE_SECRET: &str = "live-secret";
pub const TEST_SECRET: &str = "test-secret";

/// Keeps scheduled callbacks instead of firing them.
#[derive(Default)]
pub struct RecordingScheduler {
    pub tasks: Mutex<Vec<DeferredTask>>,
}

impl RecordingScheduler {
    pub fn tasks(&self) -> Vec<DeferredTask> {
        self.tasks.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskScheduler for RecordingScheduler {
    async fn schedule(&self, task: DeferredTask) -> Result<()> {
        self.tasks.lock().unwrap().push(task);
        Ok(())
    }
}

/// Memory cache whose reads or writes can be switched to fail.
#[derive(Default)]
pub struct FlakyCache {
    pub inner: MemoryCacheStore,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

#[async_trait]
impl CacheStore for FlakyCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(GatewayError::Cache("cache unavailable".into()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(GatewayError::Cache("cache unavailable".into()));
        }
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }
}

/// Failures shared by a [`FlakyStore`] and every index it opens.
#[derive(Default)]
pub struct Faults {
    /// `put_multi` calls containing any of these IDs fail.
    poisoned_ids: Mutex<Vec<String>>,
    /// Whole-index enumeration fails after this many IDs.
    list_fails_after: Mutex<Option<usize>>,
}

/// Search store over [`MemorySearchStore`] with injectable failures.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemorySearchStore,
    pub faults: Arc<Faults>,
}

impl FlakyStore {
    pub fn poison(&self, id: &str) {
        self.faults.poisoned_ids.lock().unwrap().push(id.to_string());
    }

    pub fn break_listing_after(&self, n: usize) {
        *self.faults.list_fails_after.lock().unwrap() = Some(n);
    }
}

impl SearchStore for FlakyStore {
    fn open(&self, namespace: &str, index: &str) -> Result<Arc<dyn IndexHandle>> {
        Ok(Arc::new(FlakyIndex {
            faults: self.faults.clone(),
            inner: self.inner.index(namespace, index),
        }))
    }
}

pub struct FlakyIndex {
    faults: Arc<Faults>,
    inner: Arc<MemoryIndex>,
}

#[async_trait]
impl IndexHandle for FlakyIndex {
    async fn put_multi(&self, docs: Vec<Document>) -> Result<Vec<DocumentId>> {
        let poisoned = self.faults.poisoned_ids.lock().unwrap().clone();
        if let Some(bad) = docs.iter().find(|d| poisoned.contains(&d.id)) {
            self.inner.stats.put_calls.fetch_add(1, Ordering::SeqCst);
            return Err(GatewayError::Search(format!("document {} rejected", bad.id)));
        }
        self.inner.put_multi(docs).await
    }

    async fn delete_multi(&self, ids: &[DocumentId]) -> Result<()> {
        self.inner.delete_multi(ids).await
    }

    async fn search(&self, query: &str, opts: &SearchOptions) -> Box<dyn ResultIterator> {
        self.inner.search(query, opts).await
    }

    async fn list(&self, opts: &ListOptions) -> Box<dyn ResultIterator> {
        let fails_after = *self.faults.list_fails_after.lock().unwrap();
        let it = self.inner.list(opts).await;
        match fails_after {
            Some(limit) => Box::new(BreakingIterator {
                inner: it,
                remaining: limit,
            }),
            None => it,
        }
    }
}

struct BreakingIterator {
    inner: Box<dyn ResultIterator>,
    remaining: usize,
}

#[async_trait]
impl ResultIterator for BreakingIterator {
    async fn next(&mut self) -> IteratorResult {
        if self.remaining == 0 {
            return IteratorResult::Error(GatewayError::Search("listing interrupted".into()));
        }
        self.remaining -= 1;
        self.inner.next().await
    }

    fn facets(&self) -> Result<Vec<Vec<FacetResult>>> {
        self.inner.facets()
    }
}

pub struct Harness {
    pub gateway: Arc<SearchGateway>,
    pub store: Arc<FlakyStore>,
    pub cache: Arc<FlakyCache>,
    pub scheduler: Arc<RecordingScheduler>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(GatewayConfig::default())
    }

    pub fn with_config(config: GatewayConfig) -> Self {
        let store = Arc::new(FlakyStore::default());
        let cache = Arc::new(FlakyCache::default());
        let scheduler = Arc::new(RecordingScheduler::default());
        let gateway = Arc::new(SearchGateway::new(
            store.clone(),
            cache.clone(),
            scheduler.clone(),
            config,
        ));
        Harness {
            gateway,
            store,
            cache,
            scheduler,
        }
    }

    pub fn index(&self, namespace: &str, index: &str) -> Arc<MemoryIndex> {
        self.store.inner.index(namespace, index)
    }
}

/// `n` product documents with IDs `p0000`, `p0001`, ...
pub fn products(n: usize) -> Vec<Document> {
    (0..n)
        .map(|i| {
            serde_json::from_value::<searchgate::DocumentInput>(serde_json::json!({
                "id": format!("p{:04}", i),
                "fields": [
                    {"name": "title", "value": format!("running shoes model {}", i)},
                    {"name": "brand", "value": if i % 2 == 0 { "acme" } else { "zen" }, "type": "atom", "facet": true},
                    {"name": "price", "value": (i % 50) as f64 + 0.5, "facet": true}
                ]
            }))
            .unwrap()
            .into_document()
        })
        .collect()
}

/// Serve the full router for `gateway` on an ephemeral port.
pub async fn spawn_server(gateway: Arc<SearchGateway>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    serve_on(listener, gateway).await;
    addr
}

/// Like [`spawn_server`], but delayed resets are real HTTP callbacks posted
/// back to the spawned server.
pub async fn spawn_server_with_callbacks(config: GatewayConfig) -> (String, Arc<SearchGateway>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let scheduler =
        HttpCallbackScheduler::new(format!("http://{}", addr), Some(LIVE_SECRET.to_string()));
    let gateway = Arc::new(SearchGateway::new(
        Arc::new(MemorySearchStore::new()),
        Arc::new(MemoryCacheStore::new()),
        Arc::new(scheduler),
        config,
    ));
    serve_on(listener, gateway.clone()).await;
    (addr, gateway)
}

async fn serve_on(listener: TcpListener, gateway: Arc<SearchGateway>) {
    let state = Arc::new(AppState { gateway });
    let secrets = Arc::new(Secrets::new(LIVE_SECRET, TEST_SECRET).unwrap());
    let app = searchgate_http::build_router(state, secrets, 1024 * 1024);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
}
