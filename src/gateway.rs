use crate::cache::{GenerationStore, Invalidator, ResultCache};
use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::index::BatchIndexer;
use crate::query::{QueryParams, SearchRequest};
use crate::store::{
    CacheStore, FacetResult, FacetResultValue, IteratorResult, ResultIterator, SearchStore,
    TaskScheduler,
};
use crate::types::{
    Document, DocumentId, DocumentMeta, FacetBucket, SearchHit, SearchOutcome, SearchResponse,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Caching front for a search backend.
///
/// `SearchGateway` answers searches from the result cache when it can and
/// routes every write through the batch indexer, invalidating the affected
/// index's cached responses as it goes. Tenants are namespaces on the
/// backend; callers pass them already resolved.
///
/// # Examples
///
/// ```rust,no_run
/// use searchgate::store::{HttpCallbackScheduler, MemoryCacheStore, MemorySearchStore};
/// use searchgate::{GatewayConfig, QueryParams, SearchGateway};
/// use std::sync::Arc;
///
/// # async fn run() -> searchgate::Result<()> {
/// let gateway = SearchGateway::new(
///     Arc::new(MemorySearchStore::new()),
///     Arc::new(MemoryCacheStore::new()),
///     Arc::new(HttpCallbackScheduler::new("http://127.0.0.1:8080", None)),
///     GatewayConfig::default(),
/// );
/// let params = QueryParams::from_pairs([("q", "shoes")]);
/// let outcome = gateway.search("live_shop", "products", &params).await?;
/// println!("{} hits", outcome.ids().len());
/// # Ok(())
/// # }
/// ```
pub struct SearchGateway {
    search: Arc<dyn SearchStore>,
    cache: Arc<dyn CacheStore>,
    generations: Arc<GenerationStore>,
    results: ResultCache,
    invalidator: Invalidator,
    indexer: BatchIndexer,
    config: GatewayConfig,
}

impl SearchGateway {
    pub fn new(
        search: Arc<dyn SearchStore>,
        cache: Arc<dyn CacheStore>,
        scheduler: Arc<dyn TaskScheduler>,
        config: GatewayConfig,
    ) -> Self {
        let generations = Arc::new(GenerationStore::new(cache.clone(), config.generation_ttl));
        let invalidator = Invalidator::new(
            generations.clone(),
            scheduler,
            config.reset_delay,
            config.reset_route.clone(),
        );
        SearchGateway {
            search,
            results: ResultCache::new(cache.clone(), config.result_ttl),
            cache,
            generations,
            invalidator,
            indexer: BatchIndexer::from_config(&config),
            config,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn generations(&self) -> &Arc<GenerationStore> {
        &self.generations
    }

    /// The raw cache the gateway keeps its generations and responses in.
    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// Run a search, serving it from the result cache when the same query
    /// was answered under the current generation.
    pub async fn search(
        &self,
        tenant: &str,
        index: &str,
        params: &QueryParams,
    ) -> Result<SearchOutcome> {
        let request = SearchRequest::from_params(params)?;
        let key = self.generations.fingerprint(tenant, index, params).await;
        if let Some(hit) = self.results.lookup(&key).await {
            return Ok(hit);
        }

        let handle = self.search.open(tenant, index)?;
        let opts = request.search_options(self.config.default_search_limit);
        let mut it = handle.search(&request.query, &opts).await;

        let mut response = SearchResponse::default();
        loop {
            match it.next().await {
                IteratorResult::Done { cursor } => {
                    response.cursor = cursor.unwrap_or_default();
                    break;
                }
                IteratorResult::Error(e) => {
                    tracing::error!(tenant = %tenant, index = %index, "SearchError: {}", e);
                    return Err(e);
                }
                IteratorResult::Item { id, document } => {
                    if id.is_empty() {
                        continue;
                    }
                    response.result.push(format_hit(id, document, &request));
                }
            }
        }
        response.facets = collect_facets(it.as_ref());

        let outcome = if request.ids_only {
            SearchOutcome::Ids(response.result.into_iter().map(|h| h.id).collect())
        } else {
            SearchOutcome::Results(response)
        };
        self.results.store(&key, &outcome).await;
        Ok(outcome)
    }

    /// Index documents in backend-sized batches while invalidating the
    /// index's cached responses. Invalidation happens even when some
    /// batches fail.
    pub async fn put(
        &self,
        tenant: &str,
        index: &str,
        docs: Vec<Document>,
    ) -> Result<Vec<DocumentId>> {
        let handle = self.search.open(tenant, index)?;
        let count = docs.len();
        let (written, _) = tokio::join!(
            self.indexer.put(handle, docs),
            self.invalidator.invalidate(tenant, index)
        );
        let ids = written?;
        tracing::info!(tenant = %tenant, index = %index, docs = count, "Put complete");
        Ok(ids)
    }

    pub async fn delete(&self, tenant: &str, index: &str, ids: &[DocumentId]) -> Result<()> {
        if ids.is_empty() {
            return Err(GatewayError::BadRequest("ids not found".to_string()));
        }
        let handle = self.search.open(tenant, index)?;
        let (deleted, _) = tokio::join!(
            crate::index::delete_by_ids(handle.as_ref(), ids),
            self.invalidator.invalidate(tenant, index)
        );
        deleted
    }

    /// Delete every document in the index. Returns how many were removed.
    pub async fn drop_index(&self, tenant: &str, index: &str) -> Result<usize> {
        let handle = self.search.open(tenant, index)?;
        let (dropped, _) = tokio::join!(
            crate::index::drop_index(handle, self.config.batch_size),
            self.invalidator.invalidate(tenant, index)
        );
        dropped
    }

    /// Bump the generation of one index. This is also what the delayed
    /// callback scheduled after each write lands on.
    pub async fn reset_cache(&self, tenant: &str, index: &str) -> Result<String> {
        self.generations.bump(tenant, index).await
    }
}

fn format_hit(id: DocumentId, document: Option<Document>, request: &SearchRequest) -> SearchHit {
    let (fields, facets) = match document {
        Some(doc) => (Some(doc.fields), doc.facets),
        None => (None, Vec::new()),
    };
    SearchHit {
        id,
        fields: if request.fields.is_empty() { None } else { fields },
        meta: request.with_meta.then_some(DocumentMeta { facets }),
    }
}

/// Group backend facet counts by name. Infinite range bounds are reported
/// as 0; a backend facet failure is logged and leaves the response without
/// facets.
fn collect_facets(it: &dyn ResultIterator) -> Option<BTreeMap<String, Vec<FacetBucket>>> {
    let groups = match it.facets() {
        Ok(groups) => groups,
        Err(e) => {
            tracing::warn!("FacetsErr: {}", e);
            return None;
        }
    };
    let mut out: BTreeMap<String, Vec<FacetBucket>> = BTreeMap::new();
    for FacetResult { name, value, count } in groups.into_iter().flatten() {
        let bucket = match value {
            FacetResultValue::Range(r) => FacetBucket {
                value: None,
                start: finite_or_zero(r.start),
                end: finite_or_zero(r.end),
                count,
            },
            FacetResultValue::Value(v) => FacetBucket {
                value: Some(v),
                start: 0.0,
                end: 0.0,
                count,
            },
        };
        out.entry(name).or_default().push(bucket);
    }
    Some(out)
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_infinite() {
        0.0
    } else {
        v
    }
}
