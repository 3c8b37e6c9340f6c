//! Backend API client
//!
//! [`TrackerApi`] is the seam between the backend and the rest of the crate;
//! [`ApiClient`] is the HTTP implementation. Every request carries the bearer
//! token found in the credential store at send time, and every 401 from an
//! authenticated call goes through the shared [`AuthGuard`].

mod error;
mod guard;
mod http;


pub use error::{ApiError, ApiResult};
pub use guard::{AuthGuard, SessionTeardown};
pub use http::ApiClient;

use async_trait::async_trait;

use crate::models::{Credentials, Job, JobCreate, JobUpdate, TokenResponse, User, UserCreate};

/// Operations offered by the tracker backend
#[async_trait]
pub trait TrackerApi: Send + Sync {
    /// Exchange credentials for a token. On success the token is persisted.
    async fn login(&self, credentials: &Credentials) -> ApiResult<TokenResponse>;

    /// Create a user account
    async fn register(&self, input: &UserCreate) -> ApiResult<User>;

    /// The user identified by the current token
    async fn current_user(&self) -> ApiResult<User>;

    /// The caller's jobs, optionally restricted to one status
    async fn list_jobs(&self, status: Option<&str>) -> ApiResult<Vec<Job>>;

    async fn create_job(&self, input: &JobCreate) -> ApiResult<Job>;

    async fn update_job(&self, id: i64, input: &JobUpdate) -> ApiResult<Job>;

    async fn delete_job(&self, id: i64) -> ApiResult<()>;

    /// Whether the backend answers its root endpoint
    async fn health(&self) -> ApiResult<bool>;
}
