//! Job board service
//!
//! The board is the view a user works with: the active status filter, the
//! jobs matching it, and their counters. Listings come from the
//! [`JobCache`]; writes go through it so every filter is refreshed.
//!
//! Each fetch takes a ticket. Only the result of the most recent ticket is
//! applied, so when filters change quickly a slow response for an earlier
//! filter never replaces a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::cache::JobCache;
use crate::client::{ApiError, ApiResult};
use crate::models::{Job, JobCreate, JobStats, JobUpdate, SessionEvent, StatusFilter};
use crate::services::session::SessionObserver;

const TRACING_TARGET: &str = "jobtrack::board";

/// What the board currently shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardView {
    /// Active filter
    pub filter: StatusFilter,
    /// Jobs matching the filter
    pub jobs: Arc<Vec<Job>>,
    /// Counters over `jobs`
    pub stats: JobStats,
    /// A fetch for `filter` is outstanding
    pub loading: bool,
    /// Last fetch failure for `filter`. Session expiry is never recorded
    /// here; it is reported through the session notices.
    pub error: Option<ApiError>,
}

/// Job board
pub struct JobBoard {
    cache: Arc<JobCache>,
    ticket: AtomicU64,
    view: watch::Sender<BoardView>,
}

impl JobBoard {
    pub fn new(cache: Arc<JobCache>) -> Self {
        let (view, _) = watch::channel(BoardView::default());
        Self {
            cache,
            ticket: AtomicU64::new(0),
            view,
        }
    }

    /// Snapshot of the current view
    pub fn view(&self) -> BoardView {
        self.view.borrow().clone()
    }

    /// Active filter
    pub fn filter(&self) -> StatusFilter {
        self.view.borrow().filter
    }

    /// Subscribe to view changes
    pub fn subscribe(&self) -> watch::Receiver<BoardView> {
        self.view.subscribe()
    }

    /// Switch to `filter` and load it.
    ///
    /// Returns `Ok(None)` if a later `select`, `refresh` or `detach`
    /// superseded this one before it completed; the view then reflects the
    /// later request.
    pub async fn select(&self, filter: StatusFilter) -> ApiResult<Option<Arc<Vec<Job>>>> {
        let ticket = self.ticket.fetch_add(1, Ordering::AcqRel) + 1;

        self.view.send_modify(|view| {
            if view.filter != filter {
                view.filter = filter;
                view.jobs = Arc::default();
                view.stats = JobStats::default();
            }
            view.loading = true;
            view.error = None;
        });

        tracing::debug!(target: TRACING_TARGET, %filter, ticket, "Loading jobs");
        let result = self.cache.list_jobs(filter).await;

        let applied = self.view.send_if_modified(|view| {
            if self.ticket.load(Ordering::Acquire) != ticket {
                return false;
            }
            view.loading = false;
            match &result {
                Ok(jobs) => {
                    view.stats = JobStats::from_jobs(jobs);
                    view.jobs = Arc::clone(jobs);
                    view.error = None;
                }
                Err(e) if e.is_session_expiry() => view.error = None,
                Err(e) => view.error = Some(e.clone()),
            }
            true
        });

        if !applied {
            tracing::debug!(target: TRACING_TARGET, %filter, ticket, "Discarding superseded result");
        }

        match result {
            Ok(jobs) if applied => Ok(Some(jobs)),
            Ok(_) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Reload the active filter
    pub async fn refresh(&self) -> ApiResult<Option<Arc<Vec<Job>>>> {
        self.select(self.filter()).await
    }

    /// Stop waiting for outstanding fetches; their results are dropped
    pub fn detach(&self) {
        self.ticket.fetch_add(1, Ordering::AcqRel);
        self.view.send_if_modified(|view| std::mem::replace(&mut view.loading, false));
    }

    /// Forget everything loaded so far: outstanding fetches are superseded,
    /// every cached listing is dropped and the view is emptied. The active
    /// filter is kept.
    pub fn reset(&self) {
        self.ticket.fetch_add(1, Ordering::AcqRel);
        self.cache.invalidate_all();
        self.view.send_modify(|view| {
            *view = BoardView {
                filter: view.filter,
                ..BoardView::default()
            };
        });
    }

    /// Create a job, then reload the active filter
    pub async fn create_job(&self, input: &JobCreate) -> ApiResult<Job> {
        let job = self.cache.create_job(input).await?;
        self.reload_after_write().await;
        Ok(job)
    }

    /// Update a job, then reload the active filter
    pub async fn update_job(&self, id: i64, input: &JobUpdate) -> ApiResult<Job> {
        let job = self.cache.update_job(id, input).await?;
        self.reload_after_write().await;
        Ok(job)
    }

    /// Delete a job, then reload the active filter
    pub async fn delete_job(&self, id: i64) -> ApiResult<()> {
        self.cache.delete_job(id).await?;
        self.reload_after_write().await;
        Ok(())
    }

    /// The write already succeeded; a failed reload is visible in the view.
    async fn reload_after_write(&self) {
        if let Err(e) = self.refresh().await {
            tracing::warn!(target: TRACING_TARGET, error = %e, "Reload after write failed");
        }
    }
}

impl SessionObserver for JobBoard {
    fn on_session_changed(&self, event: &SessionEvent) {
        tracing::debug!(target: TRACING_TARGET, ?event, "Session changed, clearing board");
        self.reset();
    }
}
