use super::Store;
use crate::error::Result;
use rusqlite::{OptionalExtension, params};

impl Store {
    /// Arbitrary key/value scratch space used by the session manager to
    /// persist connection timestamps (`last_connected_at`,
    /// `last_disconnected_at`).
    pub fn set_sync_state(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO sync_state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_sync_state(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let value = conn
            .query_row("SELECT value FROM sync_state WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn get_sync_state_i64(&self, key: &str) -> Result<Option<i64>> {
        Ok(self.get_sync_state(key)?.and_then(|v| v.parse().ok()))
    }

    pub fn set_sync_state_i64(&self, key: &str, value: i64) -> Result<()> {
        self.set_sync_state(key, &value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_store;

    #[test]
    fn sync_state_round_trips_and_overwrites() {
        let store = test_store();
        assert_eq!(store.get_sync_state("last_connected_at").unwrap(), None);

        store.set_sync_state_i64("last_connected_at", 100).unwrap();
        assert_eq!(store.get_sync_state_i64("last_connected_at").unwrap(), Some(100));

        store.set_sync_state_i64("last_connected_at", 200).unwrap();
        assert_eq!(store.get_sync_state_i64("last_connected_at").unwrap(), Some(200));
    }
}
