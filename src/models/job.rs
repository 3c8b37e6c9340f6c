//! Job application model
//!
//! This module defines the Job entity, its status, the write payloads sent to
//! the backend, the status filter used as a cache key, and the per-status
//! counters shown next to a job list.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A job application record owned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier (assigned by the backend)
    pub id: i64,
    /// Position title
    pub title: String,
    /// Company name
    pub company: String,
    /// Location (optional)
    #[serde(default)]
    pub location: Option<String>,
    /// Application status
    pub status: JobStatus,
    /// Calendar date the application was sent
    pub date_applied: NaiveDate,
    /// ID of the owning user
    pub owner_id: i64,
}

impl Job {
    /// Project this job back onto a write payload, e.g. to pre-fill an edit.
    pub fn to_update(&self) -> JobUpdate {
        JobCreate {
            title: self.title.clone(),
            company: self.company.clone(),
            location: self.location.clone(),
            status: self.status,
            date_applied: self.date_applied,
        }
    }
}

/// Application status.
///
/// Serialized exactly as the backend expects: `Applied`, `Interviewing`,
/// `Offer`, `Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum JobStatus {
    /// Application sent, no response yet
    #[default]
    Applied,
    /// In the interview process
    Interviewing,
    /// Offer received
    Offer,
    /// Application rejected
    Rejected,
}

impl JobStatus {
    /// Every status, in display order
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Applied,
        JobStatus::Interviewing,
        JobStatus::Offer,
        JobStatus::Rejected,
    ];

    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Applied => "Applied",
            JobStatus::Interviewing => "Interviewing",
            JobStatus::Offer => "Offer",
            JobStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "applied" => Ok(JobStatus::Applied),
            "interviewing" => Ok(JobStatus::Interviewing),
            "offer" => Ok(JobStatus::Offer),
            "rejected" => Ok(JobStatus::Rejected),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// Payload for creating a job. Carries every writable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCreate {
    pub title: String,
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub status: JobStatus,
    pub date_applied: NaiveDate,
}

/// Payload for updating a job. Same shape as [`JobCreate`]: updates replace
/// every field.
pub type JobUpdate = JobCreate;

impl JobCreate {
    /// New payload with status `Applied` and today's date, matching the
    /// defaults of a blank job form.
    pub fn new(title: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            company: company.into(),
            location: None,
            status: JobStatus::default(),
            date_applied: Local::now().date_naive(),
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the status
    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the application date
    pub fn with_date(mut self, date_applied: NaiveDate) -> Self {
        self.date_applied = date_applied;
        self
    }
}

/// Which subset of jobs a listing represents. Used as the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatusFilter {
    /// Every job; the status query parameter is omitted
    #[default]
    All,
    /// Only jobs with the given status
    Only(JobStatus),
}

impl StatusFilter {
    /// Query value sent to the backend, `None` for [`StatusFilter::All`]
    pub fn as_query(&self) -> Option<&'static str> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Only(status) => Some(status.as_str()),
        }
    }

    /// Whether a job belongs to this filter
    pub fn matches(&self, job: &Job) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(status) => job.status == *status,
        }
    }
}

impl From<JobStatus> for StatusFilter {
    fn from(status: JobStatus) -> Self {
        StatusFilter::Only(status)
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("All"),
            StatusFilter::Only(status) => status.fmt(f),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        s.parse::<JobStatus>().map(StatusFilter::Only)
    }
}

/// Per-status counters over a job list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct JobStats {
    pub total: usize,
    pub applied: usize,
    pub interviewing: usize,
    pub offers: usize,
    pub rejected: usize,
}

impl JobStats {
    /// Count the jobs of a list by status
    pub fn from_jobs(jobs: &[Job]) -> Self {
        jobs.iter().fold(
            Self {
                total: jobs.len(),
                ..Self::default()
            },
            |mut stats, job| {
                match job.status {
                    JobStatus::Applied => stats.applied += 1,
                    JobStatus::Interviewing => stats.interviewing += 1,
                    JobStatus::Offer => stats.offers += 1,
                    JobStatus::Rejected => stats.rejected += 1,
                }
                stats
            },
        )
    }
}
