//! In-process tracker backend for tests.
//!
//! Serves the same routes as the real backend from memory on a random local
//! port. Counts list requests and can hold list responses for a given status
//! to stage out-of-order completions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Form, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use crate::config::ApiConfig;
use crate::models::{Job, JobCreate, JobStatus, User};

struct MockUser {
    id: i64,
    email: String,
    password: String,
    first_name: String,
    last_name: String,
}

#[derive(Default)]
struct Data {
    users: Vec<MockUser>,
    jobs: Vec<Job>,
    tokens: HashMap<String, i64>,
    next_user_id: i64,
    next_job_id: i64,
    next_token: u64,
}

impl Data {
    fn user_json(&self, user: &MockUser) -> Value {
        let jobs = self
            .jobs
            .iter()
            .filter(|job| job.owner_id == user.id)
            .cloned()
            .collect();
        serde_json::to_value(User {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            jobs,
        })
        .unwrap_or(Value::Null)
    }
}

/// Shared state of the mock backend
#[derive(Default)]
pub(crate) struct MockState {
    data: Mutex<Data>,
    list_delays: Mutex<HashMap<String, Duration>>,
    list_calls: AtomicUsize,
    me_calls: AtomicUsize,
}

impl MockState {
    pub(crate) fn add_user(&self, email: &str, password: &str) -> i64 {
        let mut data = self.data.lock().unwrap();
        data.next_user_id += 1;
        let id = data.next_user_id;
        data.users.push(MockUser {
            id,
            email: email.to_string(),
            password: password.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
        });
        id
    }

    pub(crate) fn issue_token(&self, user_id: i64) -> String {
        let mut data = self.data.lock().unwrap();
        data.next_token += 1;
        let token = format!("token-{}-{}", user_id, data.next_token);
        data.tokens.insert(token.clone(), user_id);
        token
    }

    pub(crate) fn insert_job(&self, owner_id: i64, title: &str, status: JobStatus) -> Job {
        let mut data = self.data.lock().unwrap();
        data.next_job_id += 1;
        let job = Job {
            id: data.next_job_id,
            title: title.to_string(),
            company: "Acme".to_string(),
            location: None,
            status,
            date_applied: chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            owner_id,
        };
        data.jobs.push(job.clone());
        job
    }

    /// Invalidate every issued token, as a backend restart or expiry would
    pub(crate) fn revoke_tokens(&self) {
        self.data.lock().unwrap().tokens.clear();
    }

    /// Hold list responses for `status` ("All" for the unfiltered list)
    pub(crate) fn delay_list(&self, status: &str, delay: Duration) {
        self.list_delays
            .lock()
            .unwrap()
            .insert(status.to_string(), delay);
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn me_calls(&self) -> usize {
        self.me_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn job_count(&self) -> usize {
        self.data.lock().unwrap().jobs.len()
    }

    fn authenticate(&self, headers: &HeaderMap) -> Result<i64, Response> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        let data = self.data.lock().unwrap();
        token
            .and_then(|t| data.tokens.get(t).copied())
            .ok_or_else(|| detail(StatusCode::UNAUTHORIZED, "Could not validate credentials"))
    }
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

/// A running mock backend. The server stops when this is dropped.
pub(crate) struct MockBackend {
    pub(crate) base_url: String,
    pub(crate) state: Arc<MockState>,
    task: JoinHandle<()>,
}

impl MockBackend {
    pub(crate) async fn start() -> Self {
        let state = Arc::new(MockState::default());

        let app = Router::new()
            .route("/", get(root))
            .route("/token", post(token))
            .route("/users/", post(create_user))
            .route("/users/me", get(me))
            .route("/jobs/", get(list_jobs).post(create_job))
            .route("/jobs/{id}", put(update_job).delete(delete_job))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            task,
        }
    }

    pub(crate) fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            timeout_seconds: 5,
            ..ApiConfig::default()
        }
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Job tracker API" }))
}

async fn token(
    State(state): State<Arc<MockState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let username = form.get("username").cloned().unwrap_or_default();
    let password = form.get("password").cloned().unwrap_or_default();

    let user_id = {
        let data = state.data.lock().unwrap();
        data.users
            .iter()
            .find(|u| u.email == username && u.password == password)
            .map(|u| u.id)
    };

    match user_id {
        Some(id) => {
            let access_token = state.issue_token(id);
            Json(json!({ "access_token": access_token, "token_type": "bearer" })).into_response()
        }
        None => detail(StatusCode::UNAUTHORIZED, "Incorrect email or password"),
    }
}

async fn create_user(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let field = |name: &str| body.get(name).and_then(Value::as_str).map(str::to_string);

    let missing: Vec<Value> = ["email", "password", "firstName", "lastName"]
        .into_iter()
        .filter(|name| field(name).is_none())
        .map(|name| json!({ "loc": ["body", name], "msg": "field required", "type": "value_error.missing" }))
        .collect();
    if !missing.is_empty() {
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": missing }))).into_response();
    }

    let email = field("email").unwrap_or_default();
    let mut data = state.data.lock().unwrap();
    if data.users.iter().any(|u| u.email == email) {
        return detail(StatusCode::BAD_REQUEST, "Email already registered");
    }

    data.next_user_id += 1;
    let user = MockUser {
        id: data.next_user_id,
        email,
        password: field("password").unwrap_or_default(),
        first_name: field("firstName").unwrap_or_default(),
        last_name: field("lastName").unwrap_or_default(),
    };
    let body = data.user_json(&user);
    data.users.push(user);

    Json(body).into_response()
}

async fn me(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.me_calls.fetch_add(1, Ordering::SeqCst);
    let user_id = match state.authenticate(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let data = state.data.lock().unwrap();
    match data.users.iter().find(|u| u.id == user_id) {
        Some(user) => Json(data.user_json(user)).into_response(),
        None => detail(StatusCode::NOT_FOUND, "User not found"),
    }
}

async fn list_jobs(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.list_calls.fetch_add(1, Ordering::SeqCst);
    let user_id = match state.authenticate(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let status = query.get("status").cloned();
    let key = status.clone().unwrap_or_else(|| "All".to_string());
    let filter = match status.map(|s| s.parse::<JobStatus>()) {
        Some(Ok(status)) => Some(status),
        Some(Err(_)) => return detail(StatusCode::UNPROCESSABLE_ENTITY, "Invalid status"),
        None => None,
    };

    // Snapshot before the delay so a held response carries the data as of
    // request time.
    let jobs: Vec<Job> = {
        let data = state.data.lock().unwrap();
        data.jobs
            .iter()
            .filter(|job| job.owner_id == user_id)
            .filter(|job| filter.map_or(true, |s| job.status == s))
            .cloned()
            .collect()
    };

    let delay = state.list_delays.lock().unwrap().get(&key).copied();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    Json(jobs).into_response()
}

async fn create_job(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(input): Json<JobCreate>,
) -> Response {
    let user_id = match state.authenticate(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let mut data = state.data.lock().unwrap();
    data.next_job_id += 1;
    let job = Job {
        id: data.next_job_id,
        title: input.title,
        company: input.company,
        location: input.location,
        status: input.status,
        date_applied: input.date_applied,
        owner_id: user_id,
    };
    data.jobs.push(job.clone());

    (StatusCode::CREATED, Json(job)).into_response()
}

async fn update_job(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(input): Json<JobCreate>,
) -> Response {
    let user_id = match state.authenticate(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let mut data = state.data.lock().unwrap();
    match data
        .jobs
        .iter_mut()
        .find(|job| job.id == id && job.owner_id == user_id)
    {
        Some(job) => {
            job.title = input.title;
            job.company = input.company;
            job.location = input.location;
            job.status = input.status;
            job.date_applied = input.date_applied;
            Json(job.clone()).into_response()
        }
        None => detail(StatusCode::NOT_FOUND, "Job not found"),
    }
}

async fn delete_job(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let user_id = match state.authenticate(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let mut data = state.data.lock().unwrap();
    let before = data.jobs.len();
    data.jobs.retain(|job| !(job.id == id && job.owner_id == user_id));
    if data.jobs.len() == before {
        return detail(StatusCode::NOT_FOUND, "Job not found");
    }

    StatusCode::NO_CONTENT.into_response()
}
