//! User model
//!
//! This module defines the User entity returned by the backend and the
//! registration payload sent to it.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Job;

/// User entity as returned by `GET /users/me` and `POST /users/`.
///
/// The client only ever holds a read-only copy, valid for the lifetime of
/// the session that fetched it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Email address (used as the login name)
    pub email: String,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Jobs owned by this user at fetch time
    #[serde(default)]
    pub jobs: Vec<Job>,
}

impl User {
    /// Full display name
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Input for registering a new user.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreate {
    /// Email address
    pub email: String,
    /// Plaintext password (hashed by the backend)
    pub password: String,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
}

impl UserCreate {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }
}

impl fmt::Debug for UserCreate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCreate")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}
