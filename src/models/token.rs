//! Login credentials and token types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Credentials submitted to `POST /token` as a form.
///
/// The backend's OAuth2 password form calls the login name `username`; this
/// client always sends the user's email there.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Response of a successful login.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_form_encoding_fields() {
        let value = serde_json::to_value(Credentials::new("a@b.com", "pw")).unwrap();
        assert_eq!(value["username"], "a@b.com");
        assert_eq!(value["password"], "pw");
    }

    #[test]
    fn test_debug_never_prints_secrets() {
        let creds = Credentials::new("a@b.com", "hunter2");
        let token = TokenResponse {
            access_token: "secret-token".to_string(),
            token_type: "bearer".to_string(),
        };

        assert!(!format!("{:?}", creds).contains("hunter2"));
        assert!(!format!("{:?}", token).contains("secret-token"));
    }
}
