//! Ledger records and the storage seam.
//!
//! A [`ChatStore`] is a plain collection store: every method is an
//! independent write or read with no cross-call transaction. Grouping the
//! writes of one turn is the ledger's job, and partial completion is
//! tolerated.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::canned::Topic;
use crate::error::AppError;

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Always twice the number of completed turns.
    pub message_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageRecord {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    /// Set on assistant messages only.
    pub topic: Option<Topic>,
    pub timestamp: DateTime<Utc>,
}

/// Blocking storage backend for sessions and messages.
///
/// Implementations must be shareable across threads; callers on the async
/// side run every method inside `spawn_blocking`.
pub trait ChatStore: Send + Sync {
    /// Insert `session` unless a session with the same id exists.
    /// Returns `true` when a row was created.
    fn insert_session_if_absent(&self, session: &SessionRecord) -> Result<bool, AppError>;

    fn session(&self, session_id: &str) -> Result<Option<SessionRecord>, AppError>;

    fn append_message(&self, message: &MessageRecord) -> Result<(), AppError>;

    /// Add `by` to the session's message count and set `updated_at = at`.
    fn bump_session(&self, session_id: &str, by: u64, at: DateTime<Utc>) -> Result<(), AppError>;

    /// Messages of one session, oldest first, at most `limit`.
    fn messages(&self, session_id: &str, limit: usize) -> Result<Vec<MessageRecord>, AppError>;

    /// Sessions ordered by `updated_at`, most recent first, at most `limit`.
    fn sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, AppError>;
}

/// Storage format for timestamps: RFC 3339, UTC, microsecond precision.
/// Fixed width, so lexicographic order matches chronological order.
pub fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_ts(s: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| AppError::Store(format!("bad timestamp '{s}': {e}")))
}
