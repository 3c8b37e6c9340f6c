//! Session model

use serde::Serialize;

use super::User;

/// Lifecycle state of the client session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Startup validation has not finished yet
    Initializing,
    /// No valid token
    Anonymous,
    /// A validated token and the user it belongs to
    Authenticated(User),
}

impl SessionState {
    /// Check if a user is signed in
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    /// The signed-in user, if any
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Notices published by the session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A user signed in (or an existing token was validated)
    SignedIn { user_id: i64 },
    /// The user signed out
    SignedOut,
    /// The backend rejected the token; the session is being torn down
    Expired,
}

/// Snapshot of the session as seen by consumers.
///
/// `user` is only ever set together with `token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Bearer token, if one is stored
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Validated user
    pub user: Option<User>,
    /// True while startup validation is running
    pub is_loading: bool,
}

impl Session {
    /// Build a snapshot from a state and the currently stored token
    pub fn from_state(state: &SessionState, token: Option<String>) -> Self {
        match state {
            SessionState::Initializing => Self {
                token,
                user: None,
                is_loading: true,
            },
            SessionState::Anonymous => Self {
                token: None,
                user: None,
                is_loading: false,
            },
            SessionState::Authenticated(user) => Self {
                token,
                user: Some(user.clone()),
                is_loading: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 1,
            email: "a@b.com".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            jobs: vec![],
        }
    }

    #[test]
    fn test_snapshot_anonymous_drops_token() {
        let session = Session::from_state(&SessionState::Anonymous, Some("stale".to_string()));
        assert_eq!(session.token, None);
        assert_eq!(session.user, None);
        assert!(!session.is_loading);
    }

    #[test]
    fn test_snapshot_initializing_is_loading() {
        let session = Session::from_state(&SessionState::Initializing, Some("t".to_string()));
        assert!(session.is_loading);
        assert_eq!(session.user, None);
    }

    #[test]
    fn test_snapshot_authenticated() {
        let state = SessionState::Authenticated(user());
        let session = Session::from_state(&state, Some("t".to_string()));

        assert_eq!(session.token.as_deref(), Some("t"));
        assert_eq!(session.user.map(|u| u.id), Some(1));
        assert!(state.is_authenticated());
        assert_eq!(state.user().map(|u| u.email.as_str()), Some("a@b.com"));
    }
}
