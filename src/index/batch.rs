use crate::config::{GatewayConfig, MAX_BATCH_SIZE};
use crate::error::{GatewayError, Result};
use crate::store::IndexHandle;
use crate::types::{Document, DocumentId};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Splits writes into backend-sized chunks and runs them concurrently.
///
/// Every chunk runs to completion even when a sibling fails. Failures are
/// reported together once all chunks have finished.
#[derive(Debug, Clone)]
pub struct BatchIndexer {
    batch_size: usize,
    max_inflight: usize,
}

impl BatchIndexer {
    /// `batch_size` is clamped to the backend's per-call ceiling.
    pub fn new(batch_size: usize, max_inflight: usize) -> Self {
        BatchIndexer {
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
            max_inflight,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.batch_size, config.max_inflight_batches)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of backend calls a write of `n` documents takes.
    pub fn chunk_count(&self, n: usize) -> usize {
        n.div_ceil(self.batch_size)
    }

    /// Index `docs` and return every assigned ID. IDs are grouped per chunk
    /// and chunks finish in no particular order.
    pub async fn put(&self, index: Arc<dyn IndexHandle>, docs: Vec<Document>) -> Result<Vec<DocumentId>> {
        let total = docs.len();
        let limiter = (self.max_inflight > 0).then(|| Arc::new(Semaphore::new(self.max_inflight)));

        let mut join_set = JoinSet::new();
        let mut docs = docs.into_iter().peekable();
        let mut chunk_no = 0usize;
        while docs.peek().is_some() {
            let chunk: Vec<Document> = docs.by_ref().take(self.batch_size).collect();
            let index = index.clone();
            let limiter = limiter.clone();
            let n = chunk_no;
            join_set.spawn(async move {
                let _permit = match limiter {
                    Some(sem) => Some(sem.acquire_owned().await.map_err(|e| {
                        GatewayError::Search(format!("chunk {}: {}", n, e))
                    })?),
                    None => None,
                };
                let size = chunk.len();
                let ids = index.put_multi(chunk).await?;
                tracing::debug!(chunk = n, docs = size, "Indexed chunk");
                Ok::<_, GatewayError>(ids)
            });
            chunk_no += 1;
        }

        let mut ids = Vec::with_capacity(total);
        let mut errors = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Ok(chunk_ids)) => ids.extend(chunk_ids),
                Ok(Err(e)) => errors.push(e.to_string()),
                Err(e) => errors.push(format!("Task join error: {}", e)),
            }
        }

        if !errors.is_empty() {
            tracing::error!(
                chunks = chunk_no,
                failed = errors.len(),
                "Batch put failed: {}",
                errors.join("; ")
            );
            return Err(GatewayError::AggregateWrite { op: "put", errors });
        }
        tracing::info!(docs = total, chunks = chunk_no, "Batch put complete");
        Ok(ids)
    }
}
