//! Contracts for the managed services the gateway sits in front of: a
//! key/value cache, a full-text search index, and a deferred task queue.
//!
//! The core never talks to a concrete backend. Everything is passed in as a
//! trait object, so the in-memory implementations in [`memory`] can stand in
//! for the real services in development and tests.

pub mod memory;
pub mod scheduler;

use crate::error::Result;
use crate::query::facets::FacetSpec;
use crate::types::{DocumentId, Document, FacetValue, Range};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub use memory::{MemoryCacheStore, MemorySearchStore};
pub use scheduler::HttpCallbackScheduler;

/// Key/value cache with per-entry expiry. A miss is `Ok(None)`.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Entry point to the search backend. Indexes are scoped by tenant namespace.
pub trait SearchStore: Send + Sync {
    fn open(&self, namespace: &str, index: &str) -> Result<Arc<dyn IndexHandle>>;
}

/// Options for a search call.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Maximum documents returned; 0 lets the backend choose.
    pub limit: usize,
    pub ids_only: bool,
    /// Field projection; empty means all fields.
    pub fields: Vec<String>,
    pub cursor: Option<String>,
    pub facets: Vec<FacetSpec>,
}

/// Options for whole-index enumeration.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub ids_only: bool,
}

/// One step of a result iterator. `Done` is the normal terminal signal and
/// carries the cursor to resume from.
#[derive(Debug)]
pub enum IteratorResult {
    Item {
        id: DocumentId,
        document: Option<Document>,
    },
    Done {
        cursor: Option<String>,
    },
    Error(crate::error::GatewayError),
}

/// Value of a facet count reported by the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum FacetResultValue {
    Value(FacetValue),
    Range(Range),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FacetResult {
    pub name: String,
    pub value: FacetResultValue,
    pub count: u64,
}

#[async_trait]
pub trait ResultIterator: Send {
    async fn next(&mut self) -> IteratorResult;

    /// Facet counts for the query, grouped per facet name in request order.
    fn facets(&self) -> Result<Vec<Vec<FacetResult>>>;
}

#[async_trait]
pub trait IndexHandle: Send + Sync {
    /// Store documents, returning the ID assigned to each one in input order.
    /// Backends reject calls with more than [`crate::config::MAX_BATCH_SIZE`]
    /// documents.
    async fn put_multi(&self, docs: Vec<Document>) -> Result<Vec<DocumentId>>;

    async fn delete_multi(&self, ids: &[DocumentId]) -> Result<()>;

    async fn search(&self, query: &str, opts: &SearchOptions) -> Box<dyn ResultIterator>;

    async fn list(&self, opts: &ListOptions) -> Box<dyn ResultIterator>;
}

/// A callback the scheduler fires once `delay` has elapsed.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredTask {
    pub route: String,
    pub params: Vec<(String, String)>,
    pub delay: Duration,
}

#[async_trait]
pub trait TaskScheduler: Send + Sync {
    async fn schedule(&self, task: DeferredTask) -> Result<()>;
}
