//! Services layer - Client state
//!
//! This module contains the stateful services the presentation layer talks
//! to. Services are responsible for:
//! - Holding the session and reacting to rejected tokens
//! - Presenting the filtered job list and keeping it fresh after writes
//! - Persisting user preferences

pub mod board;
pub mod session;
pub mod theme;

pub use board::{BoardView, JobBoard};
pub use session::{SessionManager, SessionObserver};
pub use theme::ThemePreference;
