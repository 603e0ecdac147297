//! Persistent store (component C). Durable state for contacts, chats, and
//! messages; a full-text index kept consistent via triggers; and a small
//! key/value scratch space for the session manager. Backed by `rusqlite`
//! against a single embedded SQLite file opened in WAL mode.

mod chats;
mod contacts;
mod messages;
mod search;
mod sync_state;

pub use chats::ChatRow;
pub use contacts::ContactRow;
pub use messages::MessageRow;
pub use search::SearchResult;

use crate::error::{Error, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns the one physical connection to `app.db`. SQLite's own WAL-mode
/// concurrency (single writer, many readers) is the real guarantee;
/// the mutex here only serialises our own in-process callers so a single
/// `rusqlite::Connection` can be shared across async handlers.
pub struct Store {
    conn: Mutex<Connection>,
    fts_available: AtomicBool,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Fatal(format!("failed to create data dir: {e}")))?;
            set_dir_mode_0700(parent);
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::Fatal(format!("failed to open store at {path:?}: {e}")))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| Error::Fatal(format!("failed to set busy timeout: {e}")))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| Error::Fatal(format!("failed to set pragmas: {e}")))?;

        let store = Store {
            conn: Mutex::new(conn),
            fts_available: AtomicBool::new(false),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS contacts (
                address      TEXT PRIMARY KEY,
                name         TEXT NOT NULL DEFAULT '',
                push_name    TEXT NOT NULL DEFAULT '',
                number       TEXT NOT NULL DEFAULT '',
                is_group     INTEGER NOT NULL DEFAULT 0,
                updated_at   INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chats (
                address               TEXT PRIMARY KEY,
                name                  TEXT NOT NULL DEFAULT '',
                is_group              INTEGER NOT NULL DEFAULT 0,
                unread_count          INTEGER NOT NULL DEFAULT 0,
                last_message_preview  TEXT,
                last_message_ts       INTEGER,
                updated_at            INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS messages (
                id              TEXT PRIMARY KEY,
                chat_address    TEXT NOT NULL,
                sender_address  TEXT NOT NULL DEFAULT '',
                sender_name     TEXT NOT NULL DEFAULT '',
                from_me         INTEGER NOT NULL DEFAULT 0,
                body            TEXT NOT NULL DEFAULT '',
                timestamp       INTEGER NOT NULL,
                has_media       INTEGER NOT NULL DEFAULT 0,
                media_kind      TEXT,
                raw_encoded     BLOB
            );
            CREATE INDEX IF NOT EXISTS idx_messages_chat_ts
                ON messages (chat_address, timestamp DESC);

            CREATE TABLE IF NOT EXISTS sync_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )
        .map_err(|e| Error::Fatal(format!("failed to run migrations: {e}")))?;

        self.init_fts(&conn);
        Ok(())
    }

    /// Creates the FTS5 index and its sync triggers if the SQLite build
    /// supports FTS5; tolerates a build that doesn't (I6). If the table
    /// already exists but is empty while `messages` is not, rebuilds it
    /// once — handles upgrades where the index postdates the data.
    fn init_fts(&self, conn: &Connection) {
        let created = conn
            .execute_batch(
                "
                CREATE VIRTUAL TABLE IF NOT EXISTS messages_fts USING fts5(
                    body, content='messages', content_rowid='rowid'
                );

                CREATE TRIGGER IF NOT EXISTS messages_fts_ai AFTER INSERT ON messages BEGIN
                    INSERT INTO messages_fts(rowid, body) VALUES (new.rowid, new.body);
                END;
                CREATE TRIGGER IF NOT EXISTS messages_fts_ad AFTER DELETE ON messages BEGIN
                    INSERT INTO messages_fts(messages_fts, rowid, body) VALUES ('delete', old.rowid, old.body);
                END;
                CREATE TRIGGER IF NOT EXISTS messages_fts_au AFTER UPDATE ON messages BEGIN
                    INSERT INTO messages_fts(messages_fts, rowid, body) VALUES ('delete', old.rowid, old.body);
                    INSERT INTO messages_fts(rowid, body) VALUES (new.rowid, new.body);
                END;
                ",
            )
            .is_ok();

        if !created {
            tracing::warn!("FTS5 unavailable in this SQLite build; search will be disabled");
            self.fts_available.store(false, Ordering::SeqCst);
            return;
        }
        self.fts_available.store(true, Ordering::SeqCst);

        let fts_rows: i64 = conn
            .query_row("SELECT count(*) FROM messages_fts", [], |r| r.get(0))
            .unwrap_or(0);
        let message_rows: i64 = conn
            .query_row("SELECT count(*) FROM messages", [], |r| r.get(0))
            .unwrap_or(0);
        if fts_rows == 0 && message_rows > 0 {
            tracing::info!(message_rows, "rebuilding empty FTS index");
            let _ = conn.execute_batch("INSERT INTO messages_fts(messages_fts) VALUES ('rebuild');");
        }
    }

    pub fn fts_available(&self) -> bool {
        self.fts_available.load(Ordering::SeqCst)
    }
}

#[cfg(unix)]
fn set_dir_mode_0700(dir: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(metadata) = std::fs::metadata(dir) {
        let mut perms = metadata.permissions();
        perms.set_mode(0o700);
        let _ = std::fs::set_permissions(dir, perms);
    }
}

#[cfg(not(unix))]
fn set_dir_mode_0700(_dir: &Path) {}

#[cfg(test)]
pub(crate) fn test_store() -> Store {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.keep().join("app.db");
    Store::open(&path).unwrap()
}
