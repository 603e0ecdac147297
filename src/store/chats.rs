use super::Store;
use crate::address::string_to_api;
use crate::error::Result;
use rusqlite::params;

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRow {
    pub id: String,
    pub name: String,
    pub is_group: bool,
    pub unread_count: i64,
    pub last_message: Option<String>,
    pub last_message_timestamp: Option<i64>,
    pub message_count: i64,
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

impl Store {
    /// Insert-or-update a chat. `name` is merged under I4. `preview`/`ts`
    /// are applied together under I3: only when `ts` is present and
    /// strictly greater than the existing `last_message_ts`.
    pub fn upsert_chat(
        &self,
        address: &str,
        name: &str,
        is_group: bool,
        preview: Option<&str>,
        ts: Option<i64>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let existing: Option<(String, Option<i64>)> = conn
            .query_row(
                "SELECT name, last_message_ts FROM chats WHERE address = ?1",
                [address],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .ok();

        let merged_name = match &existing {
            Some((existing_name, _)) if !existing_name.is_empty() && name.is_empty() => {
                existing_name.clone()
            }
            _ => name.to_string(),
        };

        let should_update_preview = match (ts, existing.as_ref().and_then(|(_, t)| *t)) {
            (Some(new_ts), Some(existing_ts)) => new_ts > existing_ts,
            (Some(_), None) => true,
            (None, _) => false,
        };

        conn.execute(
            "INSERT INTO chats (address, name, is_group, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(address) DO UPDATE SET
                name = ?2, is_group = ?3, updated_at = ?4",
            params![address, merged_name, is_group, now()],
        )?;

        if should_update_preview {
            conn.execute(
                "UPDATE chats SET last_message_preview = ?2, last_message_ts = ?3 WHERE address = ?1",
                params![address, preview.map(|p| cap_preview(p)), ts],
            )?;
        }
        Ok(())
    }

    /// Same I3-guarded preview/ts update, used by the session manager after
    /// a message is upserted.
    pub fn update_chat_last_message(&self, address: &str, preview: &str, ts: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE chats SET last_message_preview = ?2, last_message_ts = ?3
             WHERE address = ?1 AND (last_message_ts IS NULL OR ?3 > last_message_ts)",
            params![address, cap_preview(preview), ts],
        )?;
        Ok(())
    }

    pub fn get_chats(&self) -> Result<Vec<ChatRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT address, name, is_group, unread_count, last_message_preview, last_message_ts,
                    (SELECT count(*) FROM messages m WHERE m.chat_address = c.address) AS message_count
             FROM chats c
             WHERE address NOT LIKE '%@lid' AND address NOT LIKE '%@broadcast'
             ORDER BY last_message_ts IS NULL, last_message_ts DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let address: String = row.get(0)?;
                Ok(ChatRow {
                    id: string_to_api(&address),
                    name: row.get(1)?,
                    is_group: row.get(2)?,
                    unread_count: row.get(3)?,
                    last_message: row.get(4)?,
                    last_message_timestamp: row.get(5)?,
                    message_count: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn increment_unread(&self, address: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE chats SET unread_count = unread_count + 1 WHERE address = ?1",
            [address],
        )?;
        Ok(())
    }

    pub fn set_unread(&self, address: &str, count: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE chats SET unread_count = ?2 WHERE address = ?1",
            params![address, count],
        )?;
        Ok(())
    }

    pub fn mark_read(&self, address: &str) -> Result<()> {
        self.set_unread(address, 0)
    }

    pub fn reset_all_unread(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("UPDATE chats SET unread_count = 0", [])?;
        Ok(())
    }

    /// Deletes a chat and its messages in a single transaction.
    pub fn delete_chat(&self, address: &str) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM messages WHERE chat_address = ?1", [address])?;
        tx.execute("DELETE FROM chats WHERE address = ?1", [address])?;
        tx.commit()?;
        Ok(())
    }
}

fn cap_preview(preview: &str) -> String {
    preview.chars().take(100).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_store;

    #[test]
    fn last_message_timestamp_is_monotonic() {
        let store = test_store();
        store
            .upsert_chat("1@s.whatsapp.net", "Alice", false, Some("first"), Some(100))
            .unwrap();
        store
            .upsert_chat("1@s.whatsapp.net", "Alice", false, Some("older"), Some(50))
            .unwrap();

        let chats = store.get_chats().unwrap();
        assert_eq!(chats[0].last_message.as_deref(), Some("first"));
        assert_eq!(chats[0].last_message_timestamp, Some(100));
    }

    #[test]
    fn upsert_chat_with_nil_ts_never_touches_last_message() {
        let store = test_store();
        store
            .upsert_chat("1@s.whatsapp.net", "Alice", false, Some("first"), Some(100))
            .unwrap();
        store.upsert_chat("1@s.whatsapp.net", "Alice", false, None, None).unwrap();

        let chats = store.get_chats().unwrap();
        assert_eq!(chats[0].last_message_timestamp, Some(100));
    }

    #[test]
    fn preview_is_capped_at_100_chars() {
        let store = test_store();
        let long = "x".repeat(200);
        store
            .upsert_chat("1@s.whatsapp.net", "Alice", false, Some(&long), Some(1))
            .unwrap();
        let chats = store.get_chats().unwrap();
        assert_eq!(chats[0].last_message.as_ref().unwrap().len(), 100);
    }

    #[test]
    fn mark_read_is_idempotent() {
        let store = test_store();
        store.upsert_chat("1@s.whatsapp.net", "Alice", false, None, None).unwrap();
        store.increment_unread("1@s.whatsapp.net").unwrap();
        store.mark_read("1@s.whatsapp.net").unwrap();
        store.mark_read("1@s.whatsapp.net").unwrap();

        let chats = store.get_chats().unwrap();
        assert_eq!(chats[0].unread_count, 0);
    }

    #[test]
    fn delete_chat_removes_messages_and_chat_transactionally() {
        let store = test_store();
        store.upsert_chat("1@s.whatsapp.net", "Alice", false, None, None).unwrap();
        store
            .upsert_message("true_1@c.us_A", "1@s.whatsapp.net", "", "", true, "hi", 1, false, None, None)
            .unwrap();

        store.delete_chat("1@s.whatsapp.net").unwrap();

        assert!(store.get_chats().unwrap().is_empty());
        assert!(store.get_messages("1@s.whatsapp.net", 10, None).unwrap().is_empty());
    }

    #[test]
    fn chats_ordered_by_timestamp_desc_nulls_last() {
        let store = test_store();
        store.upsert_chat("1@s.whatsapp.net", "A", false, Some("a"), Some(10)).unwrap();
        store.upsert_chat("2@s.whatsapp.net", "B", false, None, None).unwrap();
        store.upsert_chat("3@s.whatsapp.net", "C", false, Some("c"), Some(20)).unwrap();

        let chats = store.get_chats().unwrap();
        let ids: Vec<_> = chats.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec!["3@c.us", "1@c.us", "2@c.us"]);
    }
}
