//! Session model
//!
//! A session is never stored as an object; it is derived from the persisted
//! token on every watchdog check.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One watchdog check's view of the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Token the snapshot was derived from
    pub token: String,
    /// Expiry decoded from the token's `exp` claim
    pub expires_at_ms: i64,
    /// Last recorded user interaction
    pub last_activity_ms: i64,
    /// Whether the renewal prompt is currently shown
    pub warning_shown: bool,
}

impl SessionSnapshot {
    /// Milliseconds until the token expires (negative once expired)
    pub fn remaining_ms(&self, now_ms: i64) -> i64 {
        self.expires_at_ms - now_ms
    }

    /// Milliseconds since the last recorded interaction
    pub fn idle_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.last_activity_ms
    }
}

/// Why the client forced a logout.
///
/// The wire codes are stable; hosts use them to pick the message shown on
/// the login view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogoutReason {
    /// The token's validity deadline has passed
    Expired,
    /// No tracked interaction within the idle ceiling
    IdleTimeout,
    /// The renewal request failed
    RefreshFailed,
    /// A session record exists but carries no token
    NoToken,
    /// The token has no readable expiry claim
    InvalidToken,
    /// The user logged out on purpose
    UserLogout,
}

impl LogoutReason {
    pub fn code(&self) -> &'static str {
        match self {
            LogoutReason::Expired => "EXPIRED",
            LogoutReason::IdleTimeout => "IDLE_TIMEOUT",
            LogoutReason::RefreshFailed => "REFRESH_FAILED",
            LogoutReason::NoToken => "NO_TOKEN",
            LogoutReason::InvalidToken => "INVALID_TOKEN",
            LogoutReason::UserLogout => "USER_LOGOUT",
        }
    }
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Watchdog state for one mount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// No session, or mounted on a public view
    Inactive,
    /// Periodic checks running
    Monitoring,
    /// Renewal prompt shown
    Warning,
    /// Terminal for this session instance
    LoggedOut(LogoutReason),
}

impl MonitorState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MonitorState::LoggedOut(_))
    }
}

/// Kinds of user interaction that reset the idle clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Pointer,
    Keyboard,
    Scroll,
    Touch,
    Focus,
}

/// Which kind of view the monitor is mounted on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewScope {
    /// Landing and login views; the watchdog stays inactive
    Public,
    /// Everything behind login
    Authenticated,
}
