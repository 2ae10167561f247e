use crate::error::{GatewayError, Result};
use crate::store::{IndexHandle, IteratorResult, ListOptions};
use crate::types::DocumentId;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Delete the given documents in a single backend call.
pub async fn delete_by_ids(index: &dyn IndexHandle, ids: &[DocumentId]) -> Result<()> {
    if ids.is_empty() {
        return Err(GatewayError::BadRequest("ids not found".to_string()));
    }
    index.delete_multi(ids).await?;
    tracing::debug!(count = ids.len(), "Deleted documents");
    Ok(())
}

/// Enumerate the whole index by ID and delete everything.
///
/// A delete batch is dispatched as soon as more than `threshold` IDs have
/// accumulated; batches run concurrently with the enumeration. Delete
/// failures are collected and reported together. An enumeration error ends
/// the drop immediately: batches already dispatched are left to finish on
/// their own and the error is returned.
pub async fn drop_index(index: Arc<dyn IndexHandle>, threshold: usize) -> Result<usize> {
    let mut it = index
        .list(&ListOptions { ids_only: true })
        .await;

    let mut join_set = JoinSet::new();
    let mut pending: Vec<DocumentId> = Vec::new();
    let mut total = 0usize;

    let dispatch = |join_set: &mut JoinSet<Result<()>>, batch: Vec<DocumentId>| {
        let index = index.clone();
        join_set.spawn(async move { index.delete_multi(&batch).await });
    };

    loop {
        match it.next().await {
            IteratorResult::Done { .. } => break,
            IteratorResult::Error(e) => {
                tracing::error!(enumerated = total, "Drop aborted, enumeration failed: {}", e);
                join_set.detach_all();
                return Err(e);
            }
            IteratorResult::Item { id, .. } => {
                if !id.is_empty() {
                    pending.push(id);
                    total += 1;
                }
                if pending.len() > threshold {
                    dispatch(&mut join_set, std::mem::take(&mut pending));
                }
            }
        }
    }
    if !pending.is_empty() {
        dispatch(&mut join_set, pending);
    }

    let mut errors = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => errors.push(e.to_string()),
            Err(e) => errors.push(format!("Task join error: {}", e)),
        }
    }
    if !errors.is_empty() {
        return Err(GatewayError::AggregateWrite {
            op: "delete",
            errors,
        });
    }
    tracing::info!(deleted = total, "Index dropped");
    Ok(total)
}
