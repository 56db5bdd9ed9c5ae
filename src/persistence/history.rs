use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use super::{ensure_data_dir, get_data_dir, migrations::run_migrations};
use crate::session::store::ConversationStore;
use crate::session::types::{Message, MessageRole, ToolCall};

/// SQLite-backed conversation store. Each run writes into one named session;
/// resuming a session replays its rows into the in-memory mirror so
/// `context()` stays cheap.
pub struct SqliteStore {
    conn: Connection,
    session_id: i64,
    messages: Vec<Message>,
}

impl SqliteStore {
    /// Opens the default database under the user data directory.
    pub fn open_default(session_name: &str) -> Result<Self> {
        ensure_data_dir()?;
        let db_path = get_data_dir().join("history.db");
        let conn = Connection::open(&db_path)?;
        Self::with_connection(conn, session_name)
    }

    /// Opens a specific database file. Tests use an in-memory connection.
    pub fn with_connection(mut conn: Connection, session_name: &str) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        run_migrations(&mut conn)?;

        let session_id = Self::resume_or_create(&conn, session_name)?;
        let messages = Self::load_messages(&conn, session_id)?;

        Ok(Self {
            conn,
            session_id,
            messages,
        })
    }

    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    fn resume_or_create(conn: &Connection, name: &str) -> Result<i64> {
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM sessions WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        conn.execute("INSERT INTO sessions (name) VALUES (?1)", params![name])?;
        Ok(conn.last_insert_rowid())
    }

    fn load_messages(conn: &Connection, session_id: i64) -> Result<Vec<Message>> {
        let mut stmt = conn.prepare(
            "SELECT role, content, tool_calls, tool_call_id
             FROM messages WHERE session_id = ?1 ORDER BY created_at ASC, rowid ASC",
        )?;

        let rows = stmt.query_map(params![session_id], |row| {
            let role: String = row.get(0)?;
            let content: String = row.get(1)?;
            let tool_calls_json: Option<String> = row.get(2)?;
            let tool_call_id: Option<String> = row.get(3)?;
            Ok((role, content, tool_calls_json, tool_call_id))
        })?;

        let mut messages = Vec::new();
        for row in rows {
            let (role, content, tool_calls_json, tool_call_id) = row?;
            let role = match role.as_str() {
                "system" => MessageRole::System,
                "assistant" => MessageRole::Assistant,
                "tool" => MessageRole::Tool,
                _ => MessageRole::User,
            };
            let tool_calls: Vec<ToolCall> = match tool_calls_json {
                Some(json) => serde_json::from_str(&json)?,
                None => Vec::new(),
            };
            messages.push(Message {
                role,
                content,
                tool_calls,
                tool_call_id,
            });
        }
        Ok(messages)
    }

    fn insert(&mut self, message: Message) -> Result<()> {
        let tool_calls_json = if message.tool_calls.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&message.tool_calls)?)
        };

        self.conn.execute(
            "INSERT INTO messages (id, session_id, role, content, tool_calls, tool_call_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                cuid2::create_id(),
                self.session_id,
                message.role.as_str(),
                &message.content,
                tool_calls_json,
                message.tool_call_id.as_deref(),
            ],
        )?;
        self.conn.execute(
            "UPDATE sessions SET updated_at = strftime('%s', 'now') WHERE id = ?1",
            params![self.session_id],
        )?;

        self.messages.push(message);
        Ok(())
    }
}

impl ConversationStore for SqliteStore {
    fn add_user_message(&mut self, text: &str) -> Result<()> {
        self.insert(Message::user(text))
    }

    fn add_assistant_message(&mut self, text: &str, tool_calls: &[ToolCall]) -> Result<()> {
        self.insert(Message::assistant_with_calls(text, tool_calls.to_vec()))
    }

    fn add_tool_message(&mut self, text: &str, tool_call_id: &str) -> Result<()> {
        self.insert(Message::tool(text, tool_call_id))
    }

    fn context(&self) -> Vec<Message> {
        self.messages.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_store(name: &str) -> SqliteStore {
        SqliteStore::with_connection(Connection::open_in_memory().unwrap(), name).unwrap()
    }

    #[test]
    fn test_appends_and_reads_back() {
        let mut store = memory_store("test");
        store.add_user_message("hello").unwrap();
        store
            .add_assistant_message(
                "calling",
                &[ToolCall {
                    id: "call_1".to_string(),
                    name: "list".to_string(),
                    arguments: "{}".to_string(),
                }],
            )
            .unwrap();
        store.add_tool_message("2 files", "call_1").unwrap();

        let context = store.context();
        assert_eq!(context.len(), 3);
        assert_eq!(context[1].tool_calls[0].name, "list");
        assert_eq!(context[2].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_resume_replays_history() {
        let path = std::env::temp_dir().join("taskforge_resume_test.db");
        let _ = std::fs::remove_file(&path);

        {
            let conn = Connection::open(&path).unwrap();
            let mut store = SqliteStore::with_connection(conn, "resumed").unwrap();
            store.add_user_message("first run").unwrap();
            store.add_assistant_message("ack", &[]).unwrap();
        }

        let conn = Connection::open(&path).unwrap();
        let store = SqliteStore::with_connection(conn, "resumed").unwrap();
        let context = store.context();
        assert_eq!(context.len(), 2);
        assert_eq!(context[0].content, "first run");
        assert_eq!(context[1].role, MessageRole::Assistant);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_distinct_sessions_are_isolated() {
        let path = std::env::temp_dir().join("taskforge_sessions_test.db");
        let _ = std::fs::remove_file(&path);

        {
            let conn = Connection::open(&path).unwrap();
            let mut store = SqliteStore::with_connection(conn, "one").unwrap();
            store.add_user_message("for session one").unwrap();
        }

        let conn = Connection::open(&path).unwrap();
        let store = SqliteStore::with_connection(conn, "two").unwrap();
        assert!(store.context().is_empty());

        let _ = std::fs::remove_file(&path);
    }
}
