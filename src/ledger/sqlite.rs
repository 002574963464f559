//! SQLite-backed [`ChatStore`].
//!
//! One database file, two tables: `sessions` (unique `session_id`) and
//! `messages` (indexed by `session_id` and `timestamp`). A fresh connection
//! is opened per call, so the store itself holds only a path.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use super::store::{ChatStore, MessageRecord, Role, SessionRecord, format_ts, parse_ts};
use crate::canned::Topic;
use crate::error::AppError;

/// Schema version stored in `PRAGMA user_version`.
const SCHEMA_VERSION: i64 = 1;

fn init_schema(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sessions (
            session_id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            message_count INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS messages (
            message_id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL,
            role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
            content TEXT NOT NULL,
            topic TEXT,
            timestamp TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id);
        CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages(timestamp);
        CREATE INDEX IF NOT EXISTS idx_sessions_updated ON sessions(updated_at);

        PRAGMA user_version = 1;
        ",
    )
    .map_err(|e| AppError::Store(format!("chat store: initialize schema: {e}")))
}

/// Open `db_path` with WAL, foreign keys and a 5 s busy timeout.
fn open_conn(db_path: &Path) -> Result<Connection, AppError> {
    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Store(format!("chat store: open {}: {e}", db_path.display())))?;

    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(|e| AppError::Store(format!("chat store: set journal_mode WAL: {e}")))?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| AppError::Store(format!("chat store: set foreign_keys ON: {e}")))?;
    conn.pragma_update(None, "busy_timeout", 5000)
        .map_err(|e| AppError::Store(format!("chat store: set busy_timeout: {e}")))?;

    Ok(conn)
}

fn sql_err(op: &str) -> impl Fn(rusqlite::Error) -> AppError + '_ {
    move |e| AppError::Store(format!("chat store: {op}: {e}"))
}

#[derive(Debug, Clone)]
pub struct SqliteChatStore {
    db_path: PathBuf,
}

impl SqliteChatStore {
    /// Open (creating if needed) the database at `db_path` and bring the
    /// schema up to date. Parent directories are created.
    pub fn open(db_path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = open_conn(db_path)?;
        let version: i64 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .map_err(sql_err("read user_version"))?;
        match version {
            0 => init_schema(&conn)?,
            SCHEMA_VERSION => {}
            other => {
                return Err(AppError::Store(format!(
                    "chat store: unsupported schema version {other} in {}",
                    db_path.display()
                )));
            }
        }
        debug!(path = %db_path.display(), "chat store ready");
        Ok(Self {
            db_path: db_path.to_path_buf(),
        })
    }

    fn conn(&self) -> Result<Connection, AppError> {
        open_conn(&self.db_path)
    }
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<(String, String, String, String, i64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn build_session(
    (session_id, title, created_at, updated_at, count): (String, String, String, String, i64),
) -> Result<SessionRecord, AppError> {
    Ok(SessionRecord {
        session_id,
        title,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
        message_count: u64::try_from(count).unwrap_or(0),
    })
}

impl ChatStore for SqliteChatStore {
    fn insert_session_if_absent(&self, session: &SessionRecord) -> Result<bool, AppError> {
        let conn = self.conn()?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO sessions
                     (session_id, title, created_at, updated_at, message_count)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    session.session_id,
                    session.title,
                    format_ts(&session.created_at),
                    format_ts(&session.updated_at),
                    session.message_count as i64,
                ],
            )
            .map_err(sql_err("insert session"))?;
        Ok(inserted > 0)
    }

    fn session(&self, session_id: &str) -> Result<Option<SessionRecord>, AppError> {
        let conn = self.conn()?;
        let raw = conn
            .query_row(
                "SELECT session_id, title, created_at, updated_at, message_count
                 FROM sessions WHERE session_id = ?1",
                params![session_id],
                session_from_row,
            )
            .optional()
            .map_err(sql_err("read session"))?;
        raw.map(build_session).transpose()
    }

    fn append_message(&self, message: &MessageRecord) -> Result<(), AppError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO messages (message_id, session_id, role, content, topic, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.id,
                message.session_id,
                message.role.as_str(),
                message.content,
                message.topic.map(Topic::as_str),
                format_ts(&message.timestamp),
            ],
        )
        .map_err(sql_err("append message"))?;
        Ok(())
    }

    fn bump_session(&self, session_id: &str, by: u64, at: DateTime<Utc>) -> Result<(), AppError> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE sessions
                 SET message_count = message_count + ?2, updated_at = ?3
                 WHERE session_id = ?1",
                params![session_id, by as i64, format_ts(&at)],
            )
            .map_err(sql_err("bump session"))?;
        if changed == 0 {
            return Err(AppError::Store(format!(
                "chat store: bump session: no session '{session_id}'"
            )));
        }
        Ok(())
    }

    fn messages(&self, session_id: &str, limit: usize) -> Result<Vec<MessageRecord>, AppError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT message_id, session_id, role, content, topic, timestamp
                 FROM messages WHERE session_id = ?1
                 ORDER BY timestamp ASC, rowid ASC
                 LIMIT ?2",
            )
            .map_err(sql_err("prepare messages"))?;
        let rows = stmt
            .query_map(params![session_id, limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .map_err(sql_err("query messages"))?;

        let mut out = Vec::new();
        for row in rows {
            let (id, session_id, role, content, topic, ts) = row.map_err(sql_err("read message"))?;
            let role = Role::parse(&role)
                .ok_or_else(|| AppError::Store(format!("chat store: unknown role '{role}'")))?;
            out.push(MessageRecord {
                id,
                session_id,
                role,
                content,
                topic: topic.as_deref().and_then(Topic::from_tag),
                timestamp: parse_ts(&ts)?,
            });
        }
        Ok(out)
    }

    fn sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, AppError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT session_id, title, created_at, updated_at, message_count
                 FROM sessions
                 ORDER BY updated_at DESC, rowid DESC
                 LIMIT ?1",
            )
            .map_err(sql_err("prepare sessions"))?;
        let rows = stmt
            .query_map(params![limit as i64], session_from_row)
            .map_err(sql_err("query sessions"))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(build_session(row.map_err(sql_err("read session"))?)?);
        }
        Ok(out)
    }
}
