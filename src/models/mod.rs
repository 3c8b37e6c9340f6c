//! Data models
//!
//! This module contains the data structures shared by the client, the
//! session manager and the job cache:
//! - Backend entities (User, Job)
//! - Request payloads (UserCreate, JobCreate/JobUpdate, Credentials)
//! - Client-side state (SessionState, Session, StatusFilter, JobStats)

mod job;
mod session;
mod token;
mod user;

pub use job::{Job, JobCreate, JobStats, JobStatus, JobUpdate, StatusFilter};
pub use session::{Session, SessionEvent, SessionState};
pub use token::{Credentials, TokenResponse};
pub use user::{User, UserCreate};
