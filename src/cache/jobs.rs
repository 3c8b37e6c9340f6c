//! Job listing cache using moka
//!
//! Every entry records the invalidation epoch it was fetched under. A
//! mutation bumps the epoch before clearing the cache, so a fetch that was
//! in flight across the mutation lands as a stale entry: it is dropped and
//! fetched again instead of being served.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::client::{ApiError, ApiResult, TrackerApi};
use crate::config::{CacheConfig, MAX_CACHE_TTL_SECONDS};
use crate::models::{Job, JobCreate, JobUpdate, StatusFilter};

const TRACING_TARGET: &str = "jobtrack::cache";

/// Cached listing plus the epoch it was fetched under
#[derive(Clone)]
struct CachedJobs {
    epoch: u64,
    jobs: Arc<Vec<Job>>,
}

/// Query cache for job listings, and the mutation entry point that keeps it
/// consistent.
pub struct JobCache {
    api: Arc<dyn TrackerApi>,
    entries: Cache<StatusFilter, CachedJobs>,
    epoch: AtomicU64,
    fetches: AtomicU64,
}

impl fmt::Debug for JobCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobCache")
            .field("entry_count", &self.entries.entry_count())
            .field("epoch", &self.epoch())
            .finish_non_exhaustive()
    }
}

impl JobCache {
    /// Create a cache over `api`. A TTL of zero disables expiry; longer
    /// TTLs than [`MAX_CACHE_TTL_SECONDS`] are capped.
    pub fn new(api: Arc<dyn TrackerApi>, config: &CacheConfig) -> Self {
        let mut builder = Cache::builder().max_capacity(config.max_capacity);
        if config.ttl_seconds > 0 {
            let ttl = config.ttl().min(Duration::from_secs(MAX_CACHE_TTL_SECONDS));
            builder = builder.time_to_live(ttl);
        }

        Self {
            api,
            entries: builder.build(),
            epoch: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
        }
    }

    /// Current invalidation epoch
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Number of backend list requests issued through this cache
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Acquire)
    }

    /// Jobs matching `filter`, served from cache when fresh.
    ///
    /// Concurrent calls for the same filter share one backend request and
    /// all receive its result, error included. Errors are not cached.
    pub async fn list_jobs(&self, filter: StatusFilter) -> ApiResult<Arc<Vec<Job>>> {
        loop {
            let epoch = self.epoch();
            let api = Arc::clone(&self.api);
            let fetches = &self.fetches;

            let entry = self
                .entries
                .try_get_with(filter, async move {
                    fetches.fetch_add(1, Ordering::AcqRel);
                    tracing::debug!(target: TRACING_TARGET, %filter, epoch, "Fetching jobs");
                    let jobs = api.list_jobs(filter.as_query()).await?;
                    Ok::<_, ApiError>(CachedJobs {
                        epoch,
                        jobs: Arc::new(jobs),
                    })
                })
                .await
                .map_err(Arc::unwrap_or_clone)?;

            if entry.epoch == self.epoch() {
                return Ok(entry.jobs);
            }

            tracing::debug!(
                target: TRACING_TARGET,
                %filter,
                fetched_epoch = entry.epoch,
                "Discarding listing fetched before a mutation"
            );
            self.entries.invalidate(&filter).await;
        }
    }

    /// Cached jobs for `filter` without touching the backend
    pub async fn peek(&self, filter: StatusFilter) -> Option<Arc<Vec<Job>>> {
        self.entries
            .get(&filter)
            .await
            .filter(|entry| entry.epoch == self.epoch())
            .map(|entry| entry.jobs)
    }

    /// Drop every cached listing and mark in-flight fetches stale
    pub fn invalidate_all(&self) {
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        self.entries.invalidate_all();
        tracing::debug!(target: TRACING_TARGET, epoch, "Invalidated job listings");
    }

    /// Create a job; on success every cached listing is invalidated
    pub async fn create_job(&self, input: &JobCreate) -> ApiResult<Job> {
        let job = self.api.create_job(input).await?;
        self.invalidate_all();
        Ok(job)
    }

    /// Update a job; on success every cached listing is invalidated
    pub async fn update_job(&self, id: i64, input: &JobUpdate) -> ApiResult<Job> {
        let job = self.api.update_job(id, input).await?;
        self.invalidate_all();
        Ok(job)
    }

    /// Delete a job; on success every cached listing is invalidated
    pub async fn delete_job(&self, id: i64) -> ApiResult<()> {
        self.api.delete_job(id).await?;
        self.invalidate_all();
        Ok(())
    }
}
