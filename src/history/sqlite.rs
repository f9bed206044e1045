//! SQLite chat-history store

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};

use super::{render_turns, ChatHistoryStore, MessageRole};

/// Durable history store backed by SQLite
pub struct SqliteHistoryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteHistoryStore {
    /// Create or open the database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| Error::History(format!("failed to open database: {}", e)))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Create an in-memory database (for testing)
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::History(format!("failed to open in-memory database: {}", e)))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
        "#,
        )
        .map_err(|e| Error::History(format!("failed to set pragmas: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chat_session (
                session_id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chat_message (
                message_id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id INTEGER NOT NULL REFERENCES chat_session(session_id),
                message_type TEXT NOT NULL,
                message_text TEXT NOT NULL,
                create_time TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1
            );

            CREATE INDEX IF NOT EXISTS idx_chat_message_session
                ON chat_message(session_id, create_time);
        "#,
        )
        .map_err(|e| Error::History(format!("migration failed: {}", e)))?;

        Ok(())
    }

    fn parse_session_id(session_id: &str) -> Result<i64> {
        session_id
            .parse::<i64>()
            .map_err(|_| Error::History(format!("invalid session id: {}", session_id)))
    }
}

impl ChatHistoryStore for SqliteHistoryStore {
    fn create_session(&self, user_id: &str) -> Result<String> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO chat_session (user_id, created_at) VALUES (?1, ?2)",
            params![user_id, Utc::now().to_rfc3339()],
        )
        .map_err(|e| Error::History(e.to_string()))?;
        Ok(conn.last_insert_rowid().to_string())
    }

    fn append(&self, session_id: &str, role: MessageRole, text: &str) -> Result<()> {
        let id = Self::parse_session_id(session_id)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO chat_message (session_id, message_type, message_text, create_time, is_active)
             VALUES (?1, ?2, ?3, ?4, 1)",
            params![id, role.as_str(), text, Utc::now().to_rfc3339()],
        )
        .map_err(|e| Error::History(e.to_string()))?;
        Ok(())
    }

    fn load_recent(&self, session_id: &str, limit: usize) -> Result<Vec<String>> {
        let id = Self::parse_session_id(session_id)?;
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT message_type, message_text FROM chat_message
                 WHERE session_id = ?1 AND is_active = 1
                 ORDER BY create_time ASC, message_id ASC",
            )
            .map_err(|e| Error::History(e.to_string()))?;

        let rows = stmt
            .query_map(params![id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| Error::History(e.to_string()))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::History(e.to_string()))?;

        Ok(render_turns(&rows, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_distinct() {
        let store = SqliteHistoryStore::in_memory().unwrap();
        let a = store.create_session("user-1").unwrap();
        let b = store.create_session("user-2").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_messages_round_trip_as_turns() {
        let store = SqliteHistoryStore::in_memory().unwrap();
        let session = store.create_session("user-1").unwrap();

        store.append(&session, MessageRole::User, "지각 기준이 뭔가요?").unwrap();
        store.append(&session, MessageRole::Bot, "제12조에 따르면 지각 3회는 결근 1회입니다.").unwrap();

        let turns = store.load_recent(&session, 10).unwrap();
        assert_eq!(turns.len(), 1);
        assert!(turns[0].starts_with("Q: 지각 기준이"));
        assert!(turns[0].contains("A: 제12조"));
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SqliteHistoryStore::in_memory().unwrap();
        let a = store.create_session("user-1").unwrap();
        let b = store.create_session("user-2").unwrap();

        store.append(&a, MessageRole::User, "질문 A").unwrap();
        store.append(&a, MessageRole::Bot, "답변 A").unwrap();

        assert_eq!(store.load_recent(&a, 10).unwrap().len(), 1);
        assert!(store.load_recent(&b, 10).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_session_id_is_an_error() {
        let store = SqliteHistoryStore::in_memory().unwrap();
        assert!(store.load_recent("not-a-number", 10).is_err());
    }
}
