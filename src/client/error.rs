//! Error types for backend API calls.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::store::StoreError;

/// Result type alias for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Error returned by every backend operation.
///
/// Cloneable so one failed fetch can be handed to every caller that was
/// waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Login rejected
    #[error("Incorrect email or password")]
    InvalidCredentials,
    /// The backend rejected a field or payload; message passed through verbatim
    #[error("{0}")]
    Validation(String),
    /// Token missing, invalid or expired. Handled globally by the session.
    #[error("Your session has expired. Please log in again.")]
    Unauthorized,
    /// The requested record does not exist (or is not owned by the caller)
    #[error("{0}")]
    NotFound(String),
    /// The request could not complete
    #[error("Network error: {0}")]
    Network(String),
    /// Any other non-success response
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
    /// The response body did not have the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),
    /// Reading or writing the persisted token failed
    #[error("Credential storage error: {0}")]
    Storage(String),
    /// The client could not be constructed
    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// True for the one error kind the presentation layer must not show
    /// inline: the session teardown already notified the user.
    pub fn is_session_expiry(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// Map a non-success status and its body onto an error kind.
    pub(crate) fn from_status(status: StatusCode, body: &str) -> Self {
        let message = detail_message(body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });

        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            s if s.is_client_error() => ApiError::Validation(message),
            s => ApiError::Server {
                status: s.as_u16(),
                message,
            },
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if err.is_timeout() {
            ApiError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Network("Connection failed".to_string())
        } else if err.is_builder() {
            ApiError::Config(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Storage(err.to_string())
    }
}

/// Error body shape of the backend: `{"detail": "..."}`, or for request
/// validation failures `{"detail": [{"msg": "...", ...}, ...]}`.
#[derive(Deserialize)]
struct ErrorBody {
    detail: Detail,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Detail {
    Message(String),
    Items(Vec<DetailItem>),
}

#[derive(Deserialize)]
struct DetailItem {
    msg: String,
}

fn detail_message(body: &str) -> Option<String> {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        let message = match parsed.detail {
            Detail::Message(message) => message,
            Detail::Items(items) => items
                .into_iter()
                .map(|item| item.msg)
                .collect::<Vec<_>>()
                .join("; "),
        };
        return Some(message).filter(|m| !m.is_empty());
    }

    let trimmed = body.trim();
    (!trimmed.is_empty() && trimmed.len() <= 512).then(|| trimmed.to_string())
}
