//! # Searchgate
//!
//! A caching gateway for eventually-consistent full-text search backends.
//! Search responses are cached under a per-index generation token, so a
//! single token bump invalidates every cached response of that index.
//! Writes are split into backend-sized batches that run concurrently, and
//! every write bumps the generation twice: right away, and again once the
//! backend has had time to catch up.
//!
//! The backends are abstract ([`store::CacheStore`], [`store::SearchStore`],
//! [`store::TaskScheduler`]); in-memory implementations ship in
//! [`store::memory`]. The HTTP surface lives in the companion
//! `searchgate-http` crate.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use searchgate::store::{HttpCallbackScheduler, MemoryCacheStore, MemorySearchStore};
//! use searchgate::{DocumentInput, GatewayConfig, QueryParams, SearchGateway};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn run() -> searchgate::Result<()> {
//! let gateway = SearchGateway::new(
//!     Arc::new(MemorySearchStore::new()),
//!     Arc::new(MemoryCacheStore::new()),
//!     Arc::new(HttpCallbackScheduler::new("http://127.0.0.1:8080", None)),
//!     GatewayConfig::from_env(),
//! );
//!
//! let doc: DocumentInput = serde_json::from_value(json!({
//!     "id": "sku-1",
//!     "fields": [{"name": "title", "value": "Trail Runner"}]
//! }))?;
//! gateway.put("live_shop", "products", vec![doc.into_document()]).await?;
//!
//! let params = QueryParams::from_pairs([("q", "trail"), ("fields", "title")]);
//! let outcome = gateway.search("live_shop", "products", &params).await?;
//! println!("{:?}", outcome.ids());
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//!
//! | Feature | Dependencies | Use case |
//! |---------|-------------|----------|
//! | `axum-support` | axum | [`GatewayError`] implements `IntoResponse` |

pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod index;
pub mod query;
pub mod store;
pub mod types;

pub use config::{GatewayConfig, MAX_BATCH_SIZE};
pub use error::{GatewayError, Result};
pub use gateway::SearchGateway;
pub use index::{BatchIndexer, DocumentInput, FieldInput};
pub use query::{compile_facets, FacetSpec, QueryParams, SearchRequest};
pub use types::*;
