//! Integration tests for the session ledger on SQLite.
//!
//! Run with:
//!   cargo test --test test_ledger

use std::sync::Arc;

use tempfile::TempDir;

use folio_bot::canned::{self, Topic};
use folio_bot::config::StoreConfig;
use folio_bot::ledger::{ChatStore, Role, SessionLedger, SqliteChatStore};

// ── helpers ──────────────────────────────────────────────────────────────────

fn ledger(tmp: &TempDir) -> SessionLedger {
    let cfg = StoreConfig {
        path: Some(tmp.path().join("nested").join("sessions.db")),
        history_limit: 1000,
        sessions_limit: 100,
    };
    SessionLedger::open(&cfg)
        .expect("open ledger")
        .expect("path is configured")
}

// ── record_turn ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn history_holds_n_user_and_n_assistant_messages() {
    let tmp = TempDir::new().unwrap();
    let ledger = ledger(&tmp);

    let first = ledger.record_turn(None, "What courses did you take?".into()).await.unwrap();
    let id = first.session_id.clone();
    for msg in ["skills", "show me", "who are you", "asdkjalksjd"] {
        ledger.record_turn(Some(id.clone()), msg.into()).await.unwrap();
    }

    let history = ledger.history(id.clone()).await.unwrap();
    assert_eq!(history.len(), 10);
    assert_eq!(history.iter().filter(|m| m.role == Role::User).count(), 5);
    assert_eq!(history.iter().filter(|m| m.role == Role::Assistant).count(), 5);
    assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    for pair in history.chunks(2) {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1].role, Role::Assistant);
    }
    assert_eq!(history[9].content, canned::FALLBACK_RESPONSE);
}

#[tokio::test]
async fn message_count_grows_by_two_per_turn() {
    let tmp = TempDir::new().unwrap();
    let ledger = ledger(&tmp);

    let turn = ledger.record_turn(None, "education".into()).await.unwrap();
    for expected in [4u64, 6, 8] {
        ledger
            .record_turn(Some(turn.session_id.clone()), "projects".into())
            .await
            .unwrap();
        let sessions = ledger.sessions().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].message_count, expected);
    }
}

#[tokio::test]
async fn first_message_sets_session_title() {
    let tmp = TempDir::new().unwrap();
    let ledger = ledger(&tmp);

    let turn = ledger
        .record_turn(None, "Tell me about your projects".into())
        .await
        .unwrap();
    assert_eq!(turn.topic, Topic::Projects);
    assert_eq!(turn.response, canned::resolve("projects"));

    let sessions = ledger.sessions().await.unwrap();
    assert_eq!(sessions[0].title, Topic::Projects.title());
}

#[tokio::test]
async fn sessions_are_listed_most_recent_first() {
    let tmp = TempDir::new().unwrap();
    let ledger = ledger(&tmp);

    let a = ledger.record_turn(None, "skills".into()).await.unwrap();
    let b = ledger.record_turn(None, "courses".into()).await.unwrap();
    ledger
        .record_turn(Some(a.session_id.clone()), "education".into())
        .await
        .unwrap();

    let sessions = ledger.sessions().await.unwrap();
    let ids: Vec<_> = sessions.iter().map(|s| s.session_id.as_str()).collect();
    assert_eq!(ids, vec![a.session_id.as_str(), b.session_id.as_str()]);
}

#[tokio::test]
async fn reopening_keeps_records() {
    let tmp = TempDir::new().unwrap();
    let id = {
        let ledger = ledger(&tmp);
        ledger.record_turn(None, "about yourself".into()).await.unwrap().session_id
    };

    let store = SqliteChatStore::open(&tmp.path().join("nested").join("sessions.db")).unwrap();
    let store: Arc<dyn ChatStore> = Arc::new(store);
    let session = store.session(&id).unwrap().expect("session persisted");
    assert_eq!(session.title, Topic::About.title());
    assert_eq!(store.messages(&id, 10).unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_session_has_empty_history() {
    let tmp = TempDir::new().unwrap();
    let ledger = ledger(&tmp);
    assert!(ledger.history("missing".into()).await.unwrap().is_empty());
}
