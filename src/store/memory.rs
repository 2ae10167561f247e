//! In-process stand-ins for the managed cache and search services, used by
//! the development server and the test suites.

use super::{
    CacheStore, FacetResult, FacetResultValue, IndexHandle, IteratorResult, ListOptions,
    ResultIterator, SearchOptions, SearchStore,
};
use crate::config::MAX_BATCH_SIZE;
use crate::error::{GatewayError, Result};
use crate::query::facets::{FacetSpec, FacetValueSpec};
use crate::types::{DocumentId, Document, FacetValue};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64, Engine as _};
use dashmap::DashMap;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

const DEFAULT_LIMIT: usize = 20;
const DISCOVERED_VALUES_PER_FACET: usize = 10;

/// How often a write also sweeps out every expired entry.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// TTL-aware key/value cache. Expired entries are dropped when read, and
/// writes periodically sweep the whole map so entries nobody reads again
/// (results cached under an old generation) are reclaimed too.
pub struct MemoryCacheStore {
    entries: DashMap<String, (Instant, Vec<u8>)>,
    started: Instant,
    next_sweep_ms: AtomicU64,
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        MemoryCacheStore {
            entries: DashMap::new(),
            started: Instant::now(),
            next_sweep_ms: AtomicU64::new(SWEEP_INTERVAL.as_millis() as u64),
        }
    }
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, (expires_at, _)| *expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    fn maybe_sweep(&self, now: Instant) {
        let elapsed = now.duration_since(self.started).as_millis() as u64;
        let due = self.next_sweep_ms.load(Ordering::Acquire);
        if elapsed < due {
            return;
        }
        let next = elapsed + SWEEP_INTERVAL.as_millis() as u64;
        // one writer wins the sweep
        if self
            .next_sweep_ms
            .compare_exchange(due, next, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let purged = self.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, remaining = self.entries.len(), "Swept expired cache entries");
            }
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(entry) = self.entries.get(key) {
            let (expires_at, value) = entry.value();
            if Instant::now() < *expires_at {
                return Ok(Some(value.clone()));
            }
        }
        // re-checked under the shard lock so a concurrent set survives
        self.entries
            .remove_if(key, |_, (expires_at, _)| Instant::now() >= *expires_at);
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        self.maybe_sweep(now);
        self.entries.insert(key.to_string(), (now + ttl, value));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Per-index call counters.
#[derive(Debug, Default)]
pub struct IndexStats {
    pub put_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
}

/// In-memory search backend holding one [`MemoryIndex`] per
/// (namespace, index) pair. Indexes are created on first open.
#[derive(Default)]
pub struct MemorySearchStore {
    indexes: DashMap<(String, String), Arc<MemoryIndex>>,
}

impl MemorySearchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The concrete index, for inspection.
    pub fn index(&self, namespace: &str, index: &str) -> Arc<MemoryIndex> {
        self.indexes
            .entry((namespace.to_string(), index.to_string()))
            .or_default()
            .clone()
    }
}

impl SearchStore for MemorySearchStore {
    fn open(&self, namespace: &str, index: &str) -> Result<Arc<dyn IndexHandle>> {
        if index.is_empty() {
            return Err(GatewayError::Search("index name must not be empty".into()));
        }
        Ok(self.index(namespace, index))
    }
}

#[derive(Default)]
pub struct MemoryIndex {
    docs: RwLock<BTreeMap<DocumentId, Document>>,
    pub stats: IndexStats,
}

impl MemoryIndex {
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn get(&self, id: &str) -> Option<Document> {
        self.docs.read().await.get(id).cloned()
    }

    pub fn put_calls(&self) -> usize {
        self.stats.put_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.stats.search_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.stats.delete_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.stats.list_calls.load(Ordering::SeqCst)
    }
}

fn matches_query(doc: &Document, terms: &[String]) -> bool {
    terms.iter().all(|term| {
        doc.id.to_lowercase().contains(term.as_str())
            || doc
                .fields
                .iter()
                .any(|f| f.value.search_text().contains(term.as_str()))
    })
}

fn encode_cursor(offset: usize) -> String {
    BASE64.encode(format!("offset:{}", offset))
}

fn decode_cursor(cursor: &str) -> Option<usize> {
    let raw = BASE64.decode(cursor).ok()?;
    let text = String::from_utf8(raw).ok()?;
    text.strip_prefix("offset:")?.parse().ok()
}

fn facet_key(v: &FacetValue) -> String {
    match v {
        FacetValue::Atom(s) => s.clone(),
        FacetValue::Number(n) => n.to_string(),
    }
}

/// Count the most common values of one facet across `docs`.
fn discover(name: &str, docs: &[&Document]) -> Vec<FacetResult> {
    let mut counts: BTreeMap<String, (FacetValue, u64)> = BTreeMap::new();
    for doc in docs {
        for f in doc.facets.iter().filter(|f| f.name == name) {
            counts
                .entry(facet_key(&f.value))
                .or_insert_with(|| (f.value.clone(), 0))
                .1 += 1;
        }
    }
    let mut buckets: Vec<(FacetValue, u64)> = counts.into_values().collect();
    buckets.sort_by(|a, b| b.1.cmp(&a.1));
    buckets
        .into_iter()
        .take(DISCOVERED_VALUES_PER_FACET)
        .map(|(value, count)| FacetResult {
            name: name.to_string(),
            value: FacetResultValue::Value(value),
            count,
        })
        .collect()
}

fn count_value(name: &str, spec: &FacetValueSpec, docs: &[&Document]) -> FacetResult {
    let count = docs
        .iter()
        .filter(|doc| {
            doc.facets.iter().any(|f| {
                f.name == name
                    && match (spec, &f.value) {
                        (FacetValueSpec::Atom(a), FacetValue::Atom(v)) => a == v,
                        (FacetValueSpec::Atom(a), FacetValue::Number(n)) => {
                            a.parse::<f64>().map(|x| x == *n).unwrap_or(false)
                        }
                        (FacetValueSpec::Range(r), FacetValue::Number(n)) => r.contains(*n),
                        (FacetValueSpec::Range(_), FacetValue::Atom(_)) => false,
                    }
            })
        })
        .count() as u64;
    let value = match spec {
        FacetValueSpec::Atom(a) => FacetResultValue::Value(FacetValue::Atom(a.clone())),
        FacetValueSpec::Range(r) => FacetResultValue::Range(*r),
    };
    FacetResult {
        name: name.to_string(),
        value,
        count,
    }
}

fn compute_facets(specs: &[FacetSpec], docs: &[&Document]) -> Vec<Vec<FacetResult>> {
    let mut out = Vec::new();
    for spec in specs {
        match spec {
            FacetSpec::Auto => {
                let names: BTreeSet<&str> = docs
                    .iter()
                    .flat_map(|d| d.facets.iter().map(|f| f.name.as_str()))
                    .collect();
                out.extend(names.into_iter().map(|n| discover(n, docs)));
            }
            FacetSpec::Named {
                name,
                values,
                min_count,
            } => {
                let mut buckets = if values.is_empty() {
                    discover(name, docs)
                } else {
                    values.iter().map(|v| count_value(name, v, docs)).collect()
                };
                let floor = min_count.unwrap_or(1).max(1) as u64;
                buckets.retain(|b| b.count >= floor);
                out.push(buckets);
            }
        }
    }
    out.retain(|group| !group.is_empty());
    out
}

fn project(doc: &Document, fields: &[String]) -> Document {
    if fields.is_empty() {
        return doc.clone();
    }
    Document {
        id: doc.id.clone(),
        fields: doc
            .fields
            .iter()
            .filter(|f| fields.contains(&f.name))
            .cloned()
            .collect(),
        facets: doc.facets.clone(),
    }
}

#[async_trait]
impl IndexHandle for MemoryIndex {
    async fn put_multi(&self, docs: Vec<Document>) -> Result<Vec<DocumentId>> {
        self.stats.put_calls.fetch_add(1, Ordering::SeqCst);
        if docs.len() > MAX_BATCH_SIZE {
            return Err(GatewayError::Search(format!(
                "PutMulti: {} documents exceeds the limit of {}",
                docs.len(),
                MAX_BATCH_SIZE
            )));
        }
        let mut stored = self.docs.write().await;
        let mut ids = Vec::with_capacity(docs.len());
        for mut doc in docs {
            if doc.id.is_empty() {
                doc.id = uuid::Uuid::new_v4().simple().to_string();
            }
            ids.push(doc.id.clone());
            stored.insert(doc.id.clone(), doc);
        }
        Ok(ids)
    }

    async fn delete_multi(&self, ids: &[DocumentId]) -> Result<()> {
        self.stats.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut stored = self.docs.write().await;
        for id in ids {
            stored.remove(id);
        }
        Ok(())
    }

    async fn search(&self, query: &str, opts: &SearchOptions) -> Box<dyn ResultIterator> {
        self.stats.search_calls.fetch_add(1, Ordering::SeqCst);

        let offset = match opts.cursor.as_deref() {
            None | Some("") => 0,
            Some(c) => match decode_cursor(c) {
                Some(o) => o,
                None => {
                    return Box::new(MemoryIterator::failed(GatewayError::Search(
                        "invalid cursor".into(),
                    )))
                }
            },
        };
        let limit = if opts.limit == 0 {
            DEFAULT_LIMIT
        } else {
            opts.limit
        };
        let terms: Vec<String> = query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();

        let stored = self.docs.read().await;
        let matched: Vec<&Document> = stored
            .values()
            .filter(|d| matches_query(d, &terms))
            .collect();
        let facets = compute_facets(&opts.facets, &matched);

        let items: VecDeque<(DocumentId, Option<Document>)> = matched
            .iter()
            .skip(offset)
            .take(limit)
            .map(|d| {
                let body = (!opts.ids_only).then(|| project(d, &opts.fields));
                (d.id.clone(), body)
            })
            .collect();
        let next = offset + items.len();
        let cursor = (next < matched.len()).then(|| encode_cursor(next));

        Box::new(MemoryIterator {
            items,
            cursor,
            facets: Ok(facets),
            error: None,
        })
    }

    async fn list(&self, opts: &ListOptions) -> Box<dyn ResultIterator> {
        self.stats.list_calls.fetch_add(1, Ordering::SeqCst);
        let stored = self.docs.read().await;
        let items = stored
            .iter()
            .map(|(id, d)| (id.clone(), (!opts.ids_only).then(|| d.clone())))
            .collect();
        Box::new(MemoryIterator {
            items,
            cursor: None,
            facets: Ok(Vec::new()),
            error: None,
        })
    }
}

/// Iterator over a snapshot taken when the query ran.
pub struct MemoryIterator {
    items: VecDeque<(DocumentId, Option<Document>)>,
    cursor: Option<String>,
    facets: Result<Vec<Vec<FacetResult>>>,
    error: Option<GatewayError>,
}

impl MemoryIterator {
    fn failed(err: GatewayError) -> Self {
        MemoryIterator {
            items: VecDeque::new(),
            cursor: None,
            facets: Err(err.clone()),
            error: Some(err),
        }
    }
}

#[async_trait]
impl ResultIterator for MemoryIterator {
    async fn next(&mut self) -> IteratorResult {
        if let Some(err) = self.error.take() {
            return IteratorResult::Error(err);
        }
        match self.items.pop_front() {
            Some((id, document)) => IteratorResult::Item { id, document },
            None => IteratorResult::Done {
                cursor: self.cursor.clone(),
            },
        }
    }

    fn facets(&self) -> Result<Vec<Vec<FacetResult>>> {
        self.facets.clone()
    }
}
