//! Cache layer
//!
//! This module provides the client-side query cache for job listings.
//! Results are keyed by [`StatusFilter`](crate::models::StatusFilter) and
//! held in a moka async cache with a configurable TTL and capacity.
//!
//! - Concurrent requests for the same filter share one backend fetch
//! - Any successful mutation invalidates every cached filter
//! - A fetch that started before a mutation is never served after it
//!
//! # Usage
//!
//! ```rust,ignore
//! use jobtrack::cache::JobCache;
//! use jobtrack::models::StatusFilter;
//!
//! let cache = JobCache::new(api, &config.cache);
//! let jobs = cache.list_jobs(StatusFilter::All).await?;
//! ```

pub mod jobs;

pub use jobs::JobCache;
