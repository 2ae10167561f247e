//! Generation tokens.
//!
//! Every (tenant, index) pair has one token in the cache store. Result cache
//! keys are derived from the current token, so replacing it makes every
//! response cached under the old token unreachable at once. Nothing is
//! deleted: orphaned entries age out with their TTL.

use crate::error::Result;
use crate::query::params::QueryParams;
use crate::store::CacheStore;
use sha1::{Digest, Sha1};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cache key holding the generation token for a tenant's index.
pub fn generation_key(tenant: &str, index: &str) -> String {
    format!("search:{}:index:{}", tenant, index)
}

pub fn hash_sha1(text: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

pub struct GenerationStore {
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
    last_stamp: AtomicI64,
}

impl GenerationStore {
    pub fn new(cache: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        GenerationStore {
            cache,
            ttl,
            last_stamp: AtomicI64::new(0),
        }
    }

    /// Microsecond unix timestamp, strictly increasing within this process so
    /// two bumps in the same tick still yield distinct tokens.
    fn next_stamp(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_micros();
        let prev = self
            .last_stamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(prev + 1)
    }

    fn fresh_token(&self, key: &str) -> String {
        format!("{}{}", key, self.next_stamp())
    }

    /// Read the current token, creating and storing one if absent.
    ///
    /// Store failures are logged and never reach the caller; a token that
    /// could not be written is still returned and simply won't match later.
    pub async fn current(&self, tenant: &str, index: &str) -> String {
        let key = generation_key(tenant, index);
        match self.cache.get(&key).await {
            Ok(Some(bytes)) => match String::from_utf8(bytes) {
                Ok(token) if !token.is_empty() => return token,
                _ => tracing::warn!(key = %key, "Generation token unreadable, replacing"),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(key = %key, "Generation read failed: {}", e),
        }

        let token = self.fresh_token(&key);
        if let Err(e) = self
            .cache
            .set(&key, token.clone().into_bytes(), self.ttl)
            .await
        {
            tracing::warn!(key = %key, "SearchCacheKey: failed to cache prefix: {}", e);
        }
        token
    }

    /// Replace the token unconditionally, invalidating every derived entry.
    pub async fn bump(&self, tenant: &str, index: &str) -> Result<String> {
        let key = generation_key(tenant, index);
        let token = self.fresh_token(&key);
        tracing::info!(key = %key, "Resetting");
        self.cache
            .set(&key, token.clone().into_bytes(), self.ttl)
            .await?;
        Ok(token)
    }

    /// Cache key of a query under the current generation.
    pub async fn fingerprint(&self, tenant: &str, index: &str, params: &QueryParams) -> String {
        let token = self.current(tenant, index).await;
        fingerprint_with(&token, params)
    }
}

pub fn fingerprint_with(token: &str, params: &QueryParams) -> String {
    hash_sha1(&format!("{}{}", token, params.canonical_json()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCacheStore;

    fn store() -> (Arc<MemoryCacheStore>, GenerationStore) {
        let cache = Arc::new(MemoryCacheStore::new());
        let gens = GenerationStore::new(cache.clone(), Duration::from_secs(3600));
        (cache, gens)
    }

    #[test]
    fn key_format_is_stable() {
        assert_eq!(generation_key("t1", "products"), "search:t1:index:products");
    }

    #[test]
    fn sha1_matches_reference_vector() {
        assert_eq!(hash_sha1("abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[tokio::test]
    async fn current_is_idempotent() {
        let (_, gens) = store();
        let a = gens.current("t1", "products").await;
        let b = gens.current("t1", "products").await;
        assert_eq!(a, b);
        assert!(a.starts_with("search:t1:index:products"));
    }

    #[tokio::test]
    async fn bump_produces_a_new_token_every_time() {
        let (_, gens) = store();
        let mut seen = vec![gens.current("t1", "products").await];
        for _ in 0..50 {
            gens.bump("t1", "products").await.unwrap();
            let now = gens.current("t1", "products").await;
            assert!(!seen.contains(&now), "token {} was reused", now);
            seen.push(now);
        }
    }

    #[tokio::test]
    async fn tokens_are_scoped_per_index() {
        let (_, gens) = store();
        let a = gens.current("t1", "products").await;
        gens.bump("t1", "orders").await.unwrap();
        assert_eq!(gens.current("t1", "products").await, a);
    }

    #[tokio::test]
    async fn fingerprint_changes_with_params_and_generation() {
        let (_, gens) = store();
        let q1 = QueryParams::from_pairs([("q", "shoes")]);
        let q2 = QueryParams::from_pairs([("q", "boots")]);
        let f1 = gens.fingerprint("t1", "products", &q1).await;
        let f2 = gens.fingerprint("t1", "products", &q2).await;
        assert_ne!(f1, f2);
        assert_eq!(f1, gens.fingerprint("t1", "products", &q1).await);
        assert_eq!(f1.len(), 40);

        gens.bump("t1", "products").await.unwrap();
        assert_ne!(f1, gens.fingerprint("t1", "products", &q1).await);
    }

    #[tokio::test]
    async fn lazily_created_token_is_persisted() {
        let (cache, gens) = store();
        let token = gens.current("t1", "products").await;
        let stored = cache
            .get(&generation_key("t1", "products"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(String::from_utf8(stored).unwrap(), token);
    }
}
