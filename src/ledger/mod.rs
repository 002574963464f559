//! Session ledger: records each canned question/answer turn.
//!
//! A turn is four independent store writes, in order:
//!
//! 1. create the session (titled from the first message's topic) if it is new
//! 2. append the user message
//! 3. resolve the canned answer and append the assistant message
//! 4. add 2 to the session's message count and refresh `updated_at`
//!
//! Nothing is rolled back. If a later step fails, the earlier writes stay
//! and the error is returned to the caller.

pub mod sqlite;
pub mod store;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::canned::{self, Topic};
use crate::config::StoreConfig;
use crate::error::AppError;

pub use sqlite::SqliteChatStore;
pub use store::{ChatStore, MessageRecord, Role, SessionRecord};

/// Result of one recorded turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub session_id: String,
    pub topic: Topic,
    pub response: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Async facade over a blocking [`ChatStore`]. Cheap to clone.
#[derive(Clone)]
pub struct SessionLedger {
    store: Arc<dyn ChatStore>,
    history_limit: usize,
    sessions_limit: usize,
}

impl SessionLedger {
    pub fn new(store: Arc<dyn ChatStore>, history_limit: usize, sessions_limit: usize) -> Self {
        Self {
            store,
            history_limit,
            sessions_limit,
        }
    }

    /// Open the SQLite ledger named by `cfg.path`. `Ok(None)` when no path is
    /// configured.
    pub fn open(cfg: &StoreConfig) -> Result<Option<Self>, AppError> {
        let Some(path) = &cfg.path else {
            return Ok(None);
        };
        let store = SqliteChatStore::open(path)?;
        info!(path = %path.display(), "session ledger opened");
        Ok(Some(Self::new(
            Arc::new(store),
            cfg.history_limit,
            cfg.sessions_limit,
        )))
    }

    /// Classify `message`, answer it from the canned documents, and record
    /// the exchange. A missing `session_id` starts a new session.
    pub async fn record_turn(
        &self,
        session_id: Option<String>,
        message: String,
    ) -> Result<TurnOutcome, AppError> {
        let session_id = session_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || record_turn_blocking(store.as_ref(), session_id, message))
            .await
            .map_err(|e| AppError::Store(format!("record_turn join: {e}")))?
    }

    /// Messages of one session, oldest first.
    pub async fn history(&self, session_id: String) -> Result<Vec<MessageRecord>, AppError> {
        let store = self.store.clone();
        let limit = self.history_limit;
        tokio::task::spawn_blocking(move || store.messages(&session_id, limit))
            .await
            .map_err(|e| AppError::Store(format!("history join: {e}")))?
    }

    /// Sessions, most recently updated first.
    pub async fn sessions(&self) -> Result<Vec<SessionRecord>, AppError> {
        let store = self.store.clone();
        let limit = self.sessions_limit;
        tokio::task::spawn_blocking(move || store.sessions(limit))
            .await
            .map_err(|e| AppError::Store(format!("sessions join: {e}")))?
    }

    /// Mint a fresh session id. Nothing is stored until its first message.
    pub fn new_session(&self) -> (String, DateTime<Utc>) {
        (Uuid::new_v4().to_string(), Utc::now())
    }
}

fn record_turn_blocking(
    store: &dyn ChatStore,
    session_id: String,
    message: String,
) -> Result<TurnOutcome, AppError> {
    let topic = canned::classify(&message);
    let now = Utc::now();

    let created = store
        .insert_session_if_absent(&SessionRecord {
            session_id: session_id.clone(),
            title: topic.title().to_string(),
            created_at: now,
            updated_at: now,
            message_count: 0,
        })
        .inspect_err(|e| error!(%session_id, error = %e, "failed to create session"))?;
    if created {
        info!(%session_id, title = topic.title(), "session created");
    }

    store
        .append_message(&MessageRecord {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.clone(),
            role: Role::User,
            content: message,
            topic: None,
            timestamp: now,
        })
        .inspect_err(|e| error!(%session_id, error = %e, "failed to store user message"))?;

    let response = canned::resolve(topic.as_str());
    let answered_at = Utc::now();
    store
        .append_message(&MessageRecord {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.clone(),
            role: Role::Assistant,
            content: response.to_string(),
            topic: Some(topic),
            timestamp: answered_at,
        })
        .inspect_err(|e| error!(%session_id, error = %e, "failed to store assistant message"))?;

    store
        .bump_session(&session_id, 2, answered_at)
        .inspect_err(|e| error!(%session_id, error = %e, "failed to update session counters"))?;

    debug!(%session_id, %topic, "turn recorded");
    Ok(TurnOutcome {
        session_id,
        topic,
        response,
        timestamp: answered_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// In-memory store that can be told to fail a given operation.
    #[derive(Default)]
    struct FlakyStore {
        sessions: Mutex<Vec<SessionRecord>>,
        messages: Mutex<Vec<MessageRecord>>,
        fail_assistant: bool,
    }

    impl ChatStore for FlakyStore {
        fn insert_session_if_absent(&self, session: &SessionRecord) -> Result<bool, AppError> {
            let mut sessions = self.sessions.lock().unwrap();
            if sessions.iter().any(|s| s.session_id == session.session_id) {
                return Ok(false);
            }
            sessions.push(session.clone());
            Ok(true)
        }

        fn session(&self, session_id: &str) -> Result<Option<SessionRecord>, AppError> {
            let sessions = self.sessions.lock().unwrap();
            Ok(sessions.iter().find(|s| s.session_id == session_id).cloned())
        }

        fn append_message(&self, message: &MessageRecord) -> Result<(), AppError> {
            if self.fail_assistant && message.role == Role::Assistant {
                return Err(AppError::Store("disk full".into()));
            }
            self.messages.lock().unwrap().push(message.clone());
            Ok(())
        }

        fn bump_session(&self, session_id: &str, by: u64, at: DateTime<Utc>) -> Result<(), AppError> {
            let mut sessions = self.sessions.lock().unwrap();
            let s = sessions
                .iter_mut()
                .find(|s| s.session_id == session_id)
                .ok_or_else(|| AppError::Store("missing".into()))?;
            s.message_count += by;
            s.updated_at = at;
            Ok(())
        }

        fn messages(&self, session_id: &str, limit: usize) -> Result<Vec<MessageRecord>, AppError> {
            let messages = self.messages.lock().unwrap();
            Ok(messages
                .iter()
                .filter(|m| m.session_id == session_id)
                .take(limit)
                .cloned()
                .collect())
        }

        fn sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, AppError> {
            let mut sessions = self.sessions.lock().unwrap().clone();
            sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            sessions.truncate(limit);
            Ok(sessions)
        }
    }

    #[tokio::test]
    async fn new_turn_creates_titled_session() {
        let store = Arc::new(FlakyStore::default());
        let ledger = SessionLedger::new(store.clone(), 1000, 100);
        let out = ledger
            .record_turn(None, "What skills do you have?".into())
            .await
            .unwrap();
        assert_eq!(out.topic, Topic::Skills);
        assert_eq!(out.response, canned::resolve("skills"));
        let s = store.session(&out.session_id).unwrap().unwrap();
        assert_eq!(s.title, "Technical Skills");
        assert_eq!(s.message_count, 2);
    }

    #[tokio::test]
    async fn title_is_kept_from_first_message() {
        let store = Arc::new(FlakyStore::default());
        let ledger = SessionLedger::new(store.clone(), 1000, 100);
        let first = ledger.record_turn(None, "show me".into()).await.unwrap();
        ledger
            .record_turn(Some(first.session_id.clone()), "education".into())
            .await
            .unwrap();
        let s = store.session(&first.session_id).unwrap().unwrap();
        assert_eq!(s.title, "Projects");
        assert_eq!(s.message_count, 4);
    }

    #[tokio::test]
    async fn blank_session_id_starts_new_session() {
        let store = Arc::new(FlakyStore::default());
        let ledger = SessionLedger::new(store, 1000, 100);
        let out = ledger.record_turn(Some("  ".into()), "hi".into()).await.unwrap();
        assert!(Uuid::parse_str(&out.session_id).is_ok());
        assert_eq!(out.topic, Topic::Custom);
        assert_eq!(out.response, canned::FALLBACK_RESPONSE);
    }

    #[tokio::test]
    async fn partial_failure_is_not_rolled_back() {
        let store = Arc::new(FlakyStore {
            fail_assistant: true,
            ..Default::default()
        });
        let ledger = SessionLedger::new(store.clone(), 1000, 100);
        let err = ledger
            .record_turn(Some("s1".into()), "projects".into())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("disk full"));

        let msgs = store.messages("s1", 10).unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].role, Role::User);
        assert_eq!(store.session("s1").unwrap().unwrap().message_count, 0);
    }

    #[tokio::test]
    async fn history_lists_user_then_assistant() {
        let store = Arc::new(FlakyStore::default());
        let ledger = SessionLedger::new(store, 1000, 100);
        let out = ledger.record_turn(None, "courses".into()).await.unwrap();
        let history = ledger.history(out.session_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].topic, Some(Topic::Courses));
        assert!(history[0].timestamp <= history[1].timestamp);
    }

    #[test]
    fn new_session_mints_unique_ids() {
        let ledger = SessionLedger::new(Arc::new(FlakyStore::default()), 1000, 100);
        let (a, _) = ledger.new_session();
        let (b, _) = ledger.new_session();
        assert_ne!(a, b);
    }

    #[test]
    fn open_without_path_is_none() {
        let cfg = StoreConfig {
            path: None,
            history_limit: 1000,
            sessions_limit: 100,
        };
        assert!(SessionLedger::open(&cfg).unwrap().is_none());
    }
}
