use crate::store::CacheStore;
use crate::types::{DocumentId, SearchOutcome, SearchResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        BASE64.decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// Stored form of a search response.
///
/// `found == false` is what a miss looks like; it is never written to the
/// store. Exactly one of `ids` / `data` is meaningful, chosen by `ids_only`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedResult {
    pub found: bool,
    pub ids_only: bool,
    #[serde(default)]
    pub ids: Vec<DocumentId>,
    #[serde(default, with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl CachedResult {
    /// Build the envelope for a fresh response. A response that fails to
    /// serialize yields a not-found envelope so it is never cached.
    pub fn from_outcome(outcome: &SearchOutcome) -> Self {
        match outcome {
            SearchOutcome::Ids(ids) => CachedResult {
                found: true,
                ids_only: true,
                ids: ids.clone(),
                data: Vec::new(),
            },
            SearchOutcome::Results(resp) => match serde_json::to_vec(resp) {
                Ok(data) => CachedResult {
                    found: true,
                    ids_only: false,
                    ids: Vec::new(),
                    data,
                },
                Err(e) => {
                    tracing::warn!("MarshalErr: {}", e);
                    CachedResult::default()
                }
            },
        }
    }

    /// Decode the payload. ID-only entries skip the body entirely; a body
    /// that fails to decode is logged and treated as a miss.
    pub fn into_outcome(self) -> Option<SearchOutcome> {
        if !self.found {
            return None;
        }
        if self.ids_only {
            return Some(SearchOutcome::Ids(self.ids));
        }
        match serde_json::from_slice::<SearchResponse>(&self.data) {
            Ok(resp) => Some(SearchOutcome::Results(resp)),
            Err(e) => {
                tracing::warn!("UnmarshalErr: {}", e);
                None
            }
        }
    }
}

/// Cache of search responses keyed by query fingerprint.
pub struct ResultCache {
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(cache: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        ResultCache { cache, ttl }
    }

    /// Fetch the envelope under `key`. Store errors and undecodable entries
    /// come back as a not-found envelope.
    pub async fn get(&self, key: &str) -> CachedResult {
        let bytes = match self.cache.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return CachedResult::default(),
            Err(e) => {
                tracing::warn!(key = %key, "GetCache: error {}", e);
                return CachedResult::default();
            }
        };
        match serde_json::from_slice::<CachedResult>(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key = %key, "Corrupt cache entry: {}", e);
                CachedResult::default()
            }
        }
    }

    pub async fn lookup(&self, key: &str) -> Option<SearchOutcome> {
        let outcome = self.get(key).await.into_outcome();
        if outcome.is_some() {
            tracing::debug!(key = %key, "CacheHit");
        }
        outcome
    }

    /// Write an envelope. Not-found envelopes are skipped and store failures
    /// are only logged.
    pub async fn put(&self, key: &str, entry: &CachedResult, ttl: Duration) {
        if !entry.found {
            return;
        }
        let bytes = match serde_json::to_vec(entry) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(key = %key, "MarshalErr: {}", e);
                return;
            }
        };
        if let Err(e) = self.cache.set(key, bytes, ttl).await {
            tracing::warn!(key = %key, "SetCache error {}", e);
        }
    }

    pub async fn store(&self, key: &str, outcome: &SearchOutcome) {
        self.put(key, &CachedResult::from_outcome(outcome), self.ttl)
            .await;
    }
}
