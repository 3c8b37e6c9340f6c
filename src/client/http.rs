//! HTTP implementation of [`TrackerApi`] using reqwest.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::{ApiError, ApiResult, AuthGuard, TrackerApi};
use crate::config::ApiConfig;
use crate::models::{Credentials, Job, JobCreate, JobUpdate, TokenResponse, User, UserCreate};
use crate::store::{keys, CredentialStore};

/// Tracing target for backend requests.
pub const TRACING_TARGET: &str = "jobtrack::client";

struct ApiClientInner {
    http: Client,
    base_url: String,
    store: Arc<dyn CredentialStore>,
    guard: Arc<AuthGuard>,
}

impl fmt::Debug for ApiClientInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClientInner")
            .field("base_url", &self.base_url)
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

/// Client for the tracker backend.
///
/// Cheap to clone; clones share the connection pool, the credential store
/// and the 401 guard.
#[derive(Clone, Debug)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

impl ApiClient {
    /// Create a client for the backend described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] if the base URL is not an absolute
    /// http(s) URL or the HTTP client cannot be created.
    pub fn new(
        config: &ApiConfig,
        store: Arc<dyn CredentialStore>,
        guard: Arc<AuthGuard>,
    ) -> ApiResult<Self> {
        let parsed = Url::parse(&config.base_url)
            .map_err(|e| ApiError::Config(format!("invalid base URL '{}': {}", config.base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::Config(format!(
                "unsupported URL scheme '{}'",
                parsed.scheme()
            )));
        }

        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;

        let base_url = config.base_url.trim_end_matches('/').to_string();

        tracing::debug!(
            target: TRACING_TARGET,
            base_url = %base_url,
            timeout_secs = config.timeout_seconds,
            "Created API client"
        );

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url,
                store,
                guard,
            }),
        })
    }

    /// Base URL requests are sent to, without trailing slash
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// The 401 guard shared with the session manager
    pub fn guard(&self) -> &Arc<AuthGuard> {
        &self.inner.guard
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    /// Attach the bearer token currently held by the store, if any.
    fn authorize(&self, request: RequestBuilder) -> ApiResult<RequestBuilder> {
        match self.inner.store.get(keys::TOKEN)? {
            Some(token) => Ok(request.bearer_auth(token)),
            None => Ok(request),
        }
    }

    /// Send an authenticated request and sort the response into success or
    /// an [`ApiError`]. A 401 trips the guard.
    async fn send(&self, request: RequestBuilder, operation: &'static str) -> ApiResult<Response> {
        let response = self.authorize(request)?.send().await.map_err(|e| {
            tracing::warn!(target: TRACING_TARGET, operation, error = %e, "Request failed");
            ApiError::from(e)
        })?;

        let status = response.status();
        tracing::debug!(target: TRACING_TARGET, operation, status = status.as_u16(), "Response received");

        if status == StatusCode::UNAUTHORIZED {
            if self.inner.guard.trip(self.inner.store.as_ref()) {
                tracing::warn!(target: TRACING_TARGET, operation, "Token rejected, session cleared");
            }
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            return Err(Self::error_from(response).await);
        }

        Ok(response)
    }

    async fn error_from(response: Response) -> ApiError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        ApiError::from_status(status, &body)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl TrackerApi for ApiClient {
    async fn login(&self, credentials: &Credentials) -> ApiResult<TokenResponse> {
        tracing::debug!(target: TRACING_TARGET, username = %credentials.username, "Logging in");

        let request = self.inner.http.post(self.url("/token")).form(credentials);
        let response = request.send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(Self::error_from(response).await);
        }

        let token: TokenResponse = Self::decode(response).await?;
        if token.access_token.is_empty() {
            return Err(ApiError::Decode("empty access token".to_string()));
        }

        self.inner.store.set(keys::TOKEN, &token.access_token)?;
        tracing::info!(target: TRACING_TARGET, username = %credentials.username, "Logged in");

        Ok(token)
    }

    async fn register(&self, input: &UserCreate) -> ApiResult<User> {
        let request = self.inner.http.post(self.url("/users/")).json(input);
        let response = self.send(request, "register").await?;
        let user: User = Self::decode(response).await?;

        tracing::info!(target: TRACING_TARGET, user_id = user.id, "Registered user");
        Ok(user)
    }

    async fn current_user(&self) -> ApiResult<User> {
        let request = self.inner.http.get(self.url("/users/me"));
        let response = self.send(request, "current_user").await?;
        Self::decode(response).await
    }

    async fn list_jobs(&self, status: Option<&str>) -> ApiResult<Vec<Job>> {
        let mut request = self.inner.http.get(self.url("/jobs/"));
        if let Some(status) = status {
            request = request.query(&[("status", status)]);
        }

        let response = self.send(request, "list_jobs").await?;
        let jobs: Vec<Job> = Self::decode(response).await?;

        tracing::debug!(
            target: TRACING_TARGET,
            status = status.unwrap_or("All"),
            count = jobs.len(),
            "Listed jobs"
        );
        Ok(jobs)
    }

    async fn create_job(&self, input: &JobCreate) -> ApiResult<Job> {
        let request = self.inner.http.post(self.url("/jobs/")).json(input);
        let response = self.send(request, "create_job").await?;
        let job: Job = Self::decode(response).await?;

        tracing::info!(target: TRACING_TARGET, job_id = job.id, "Created job");
        Ok(job)
    }

    async fn update_job(&self, id: i64, input: &JobUpdate) -> ApiResult<Job> {
        let request = self
            .inner
            .http
            .put(self.url(&format!("/jobs/{}", id)))
            .json(input);
        let response = self.send(request, "update_job").await?;
        let job: Job = Self::decode(response).await?;

        tracing::info!(target: TRACING_TARGET, job_id = job.id, "Updated job");
        Ok(job)
    }

    async fn delete_job(&self, id: i64) -> ApiResult<()> {
        let request = self.inner.http.delete(self.url(&format!("/jobs/{}", id)));
        self.send(request, "delete_job").await?;

        tracing::info!(target: TRACING_TARGET, job_id = id, "Deleted job");
        Ok(())
    }

    async fn health(&self) -> ApiResult<bool> {
        let response = self.inner.http.get(self.url("/")).send().await?;
        Ok(response.status().is_success())
    }
}
