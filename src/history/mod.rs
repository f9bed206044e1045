//! Persisted chat history, keyed by session
//!
//! The agent only needs three operations: create a session, append one
//! message, and load the recent rendered Q/A turns. The store owns the
//! session ids; everything else about sessions (users, summaries, admin)
//! belongs to the surrounding application.

mod sqlite;

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::Result;

pub use sqlite::SqliteHistoryStore;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    /// The human asking questions
    User,
    /// The assistant
    Bot,
}

impl MessageRole {
    /// Storage tag for this role
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }
}

/// External chat-history collaborator
pub trait ChatHistoryStore: Send + Sync {
    /// Create a new session for a user, returning its id
    fn create_session(&self, user_id: &str) -> Result<String>;

    /// Append one message to a session
    fn append(&self, session_id: &str, role: MessageRole, text: &str) -> Result<()>;

    /// Load up to `limit` most recent rendered `"Q: …\nA: …"` turns,
    /// oldest first. Turns are assembled by pairing consecutive user and
    /// bot messages; unpaired leftovers are dropped.
    fn load_recent(&self, session_id: &str, limit: usize) -> Result<Vec<String>>;
}

/// Pair raw `(role, text)` rows, oldest first, into rendered Q/A turns and
/// keep the trailing `limit`.
pub(crate) fn render_turns(rows: &[(String, String)], limit: usize) -> Vec<String> {
    let mut turns = Vec::new();
    let mut pending_question: Option<&str> = None;

    for (role, text) in rows {
        match role.as_str() {
            "user" => pending_question = Some(text),
            "bot" | "chatbot" => {
                if let Some(question) = pending_question.take() {
                    turns.push(format!("Q: {}\nA: {}", question, text));
                }
            }
            _ => {}
        }
    }

    let start = turns.len().saturating_sub(limit);
    turns.split_off(start)
}

/// In-process history store for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryHistoryStore {
    sessions: Mutex<HashMap<String, Vec<(String, String)>>>,
    next_id: Mutex<u64>,
}

impl MemoryHistoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChatHistoryStore for MemoryHistoryStore {
    fn create_session(&self, _user_id: &str) -> Result<String> {
        let mut next = self.next_id.lock();
        *next += 1;
        let id = next.to_string();
        self.sessions.lock().insert(id.clone(), Vec::new());
        Ok(id)
    }

    fn append(&self, session_id: &str, role: MessageRole, text: &str) -> Result<()> {
        self.sessions
            .lock()
            .entry(session_id.to_string())
            .or_default()
            .push((role.as_str().to_string(), text.to_string()));
        Ok(())
    }

    fn load_recent(&self, session_id: &str, limit: usize) -> Result<Vec<String>> {
        let sessions = self.sessions.lock();
        let rows = sessions.get(session_id).cloned().unwrap_or_default();
        Ok(render_turns(&rows, limit))
    }
}
