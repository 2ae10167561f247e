//! Double invalidation after writes.
//!
//! The search backend makes writes visible only after an indexing lag. The
//! generation is bumped right away so responses cached before the write stop
//! being served, and once more after `delay` so responses cached from
//! lagging reads in between are dropped as well. The delay is a tunable
//! bound on that lag, not a guarantee.

use crate::cache::generation::GenerationStore;
use crate::store::{DeferredTask, TaskScheduler};
use std::sync::Arc;
use std::time::Duration;

/// What an invalidation managed to do. Failures are logged, never raised.
#[derive(Debug, Clone, PartialEq)]
pub struct Invalidation {
    /// The new generation token, if the immediate bump succeeded.
    pub token: Option<String>,
    /// Whether the delayed bump was accepted by the scheduler.
    pub scheduled: bool,
}

pub struct Invalidator {
    generations: Arc<GenerationStore>,
    scheduler: Arc<dyn TaskScheduler>,
    delay: Duration,
    route: String,
}

impl Invalidator {
    pub fn new(
        generations: Arc<GenerationStore>,
        scheduler: Arc<dyn TaskScheduler>,
        delay: Duration,
        route: impl Into<String>,
    ) -> Self {
        Invalidator {
            generations,
            scheduler,
            delay,
            route: route.into(),
        }
    }

    /// Callback that performs the delayed bump for one index.
    pub fn reset_task(&self, tenant: &str, index: &str) -> DeferredTask {
        DeferredTask {
            route: self.route.clone(),
            params: vec![
                ("ns".to_string(), tenant.to_string()),
                ("index".to_string(), index.to_string()),
            ],
            delay: self.delay,
        }
    }

    /// Bump now and schedule the delayed bump, concurrently.
    pub async fn invalidate(&self, tenant: &str, index: &str) -> Invalidation {
        let task = self.reset_task(tenant, index);
        let (bumped, scheduled) = tokio::join!(
            self.generations.bump(tenant, index),
            self.scheduler.schedule(task)
        );

        let token = match bumped {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::error!(tenant = %tenant, index = %index, "Generation bump failed: {}", e);
                None
            }
        };
        let scheduled = match scheduled {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(tenant = %tenant, index = %index, "Delayed reset not scheduled: {}", e);
                false
            }
        };
        Invalidation { token, scheduled }
    }
}
