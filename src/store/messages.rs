use super::Store;
use crate::error::{Error, Result};
use rusqlite::{OptionalExtension, params};

#[derive(Debug, Clone, PartialEq)]
pub struct MessageRow {
    pub id: String,
    pub chat_address: String,
    pub sender_address: String,
    pub sender_name: String,
    pub from_me: bool,
    pub body: String,
    pub timestamp: i64,
    pub has_media: bool,
    pub media_kind: Option<String>,
}

pub struct OldestMessage {
    pub raw_id: String,
    pub from_me: bool,
    pub timestamp: i64,
}

fn merge_non_empty(existing: &str, incoming: &str) -> String {
    if incoming.is_empty() { existing.to_string() } else { incoming.to_string() }
}

impl Store {
    /// Insert-or-update a message keyed by its serialised message key. On
    /// conflict, `body` and `sender_name` merge under I4; `has_media`,
    /// `media_kind`, and `raw_encoded` are always rewritten, since they are
    /// the definitive copy used for later on-demand media download (I5).
    #[allow(clippy::too_many_arguments)]
    pub fn upsert_message(
        &self,
        key: &str,
        chat_address: &str,
        sender_address: &str,
        sender_name: &str,
        from_me: bool,
        body: &str,
        timestamp: i64,
        has_media: bool,
        media_kind: Option<&str>,
        raw_encoded: Option<&[u8]>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let existing: Option<(String, String)> = conn
            .query_row(
                "SELECT body, sender_name FROM messages WHERE id = ?1",
                [key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (merged_body, merged_sender_name) = match existing {
            Some((existing_body, existing_sender_name)) => (
                merge_non_empty(&existing_body, body),
                merge_non_empty(&existing_sender_name, sender_name),
            ),
            None => (body.to_string(), sender_name.to_string()),
        };

        conn.execute(
            "INSERT INTO messages
                (id, chat_address, sender_address, sender_name, from_me, body, timestamp,
                 has_media, media_kind, raw_encoded)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                sender_address = excluded.sender_address,
                body = ?6,
                timestamp = excluded.timestamp,
                from_me = excluded.from_me,
                has_media = excluded.has_media,
                media_kind = excluded.media_kind,
                raw_encoded = excluded.raw_encoded",
            params![
                key,
                chat_address,
                sender_address,
                merged_sender_name,
                from_me,
                merged_body,
                timestamp,
                has_media,
                media_kind,
                raw_encoded,
            ],
        )?;

        // sender_name merge above bypassed the ON CONFLICT clause's excluded
        // value (which would have been the raw incoming value); patch it in.
        conn.execute(
            "UPDATE messages SET sender_name = ?2 WHERE id = ?1",
            params![key, merged_sender_name],
        )?;
        Ok(())
    }

    /// Updates `sender_name` only if it is currently empty. Used by the
    /// sender-name backfill pass (§4.4.7).
    pub fn backfill_sender_name(&self, key: &str, sender_name: &str) -> Result<bool> {
        if sender_name.is_empty() {
            return Ok(false);
        }
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE messages SET sender_name = ?2 WHERE id = ?1 AND sender_name = ''",
            params![key, sender_name],
        )?;
        Ok(updated > 0)
    }

    /// Descending by timestamp; `before_ts` is an inclusive upper bound on
    /// `timestamp` when non-zero.
    pub fn get_messages(
        &self,
        chat_address: &str,
        limit: i64,
        before_ts: Option<i64>,
    ) -> Result<Vec<MessageRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, chat_address, sender_address, sender_name, from_me, body, timestamp,
                    has_media, media_kind
             FROM messages
             WHERE chat_address = ?1 AND (?2 = 0 OR timestamp <= ?2)
             ORDER BY timestamp DESC
             LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(params![chat_address, before_ts.unwrap_or(0), limit], |row| {
                Ok(MessageRow {
                    id: row.get(0)?,
                    chat_address: row.get(1)?,
                    sender_address: row.get(2)?,
                    sender_name: row.get(3)?,
                    from_me: row.get(4)?,
                    body: row.get(5)?,
                    timestamp: row.get(6)?,
                    has_media: row.get(7)?,
                    media_kind: row.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_raw_encoded(&self, key: &str) -> Result<Vec<u8>> {
        let conn = self.conn.lock().unwrap();
        let raw: Option<Vec<u8>> = conn
            .query_row("SELECT raw_encoded FROM messages WHERE id = ?1", [key], |row| row.get(0))
            .optional()?;
        match raw {
            Some(bytes) if !bytes.is_empty() => Ok(bytes),
            _ => Err(Error::NotFound(format!("no stored media for message {key}"))),
        }
    }

    pub fn get_oldest_message(&self, chat_address: &str) -> Result<Option<OldestMessage>> {
        let conn = self.conn.lock().unwrap();
        let row: Option<(String, bool, i64)> = conn
            .query_row(
                "SELECT id, from_me, timestamp FROM messages
                 WHERE chat_address = ?1 ORDER BY timestamp ASC LIMIT 1",
                [chat_address],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        Ok(row.map(|(id, from_me, timestamp)| {
            let raw_id = crate::address::MessageKey::parse(&id)
                .map(|k| k.raw_id)
                .unwrap_or(id);
            OldestMessage { raw_id, from_me, timestamp }
        }))
    }

    /// Distinct `(chatAddress, senderAddress)` pairs for group chats where the
    /// sender is a `LID` address and `senderName` is still empty, capped at
    /// `limit`. Feeds the sender-name backfill pass (§4.4.7).
    pub fn group_lid_senders_missing_name(&self, limit: i64) -> Result<Vec<(String, String)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT m.chat_address, m.sender_address
             FROM messages m
             JOIN chats c ON c.address = m.chat_address
             WHERE m.sender_name = '' AND m.sender_address LIKE '%@lid' AND c.is_group = 1
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([limit], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Message ids in a chat from a given sender whose `senderName` is still
    /// empty, a helper for the sender-name backfill pass (§4.4.7).
    pub fn messages_for_backfill(&self, chat_address: &str, sender_address: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id FROM messages WHERE chat_address = ?1 AND sender_address = ?2 AND sender_name = ''",
        )?;
        let rows = stmt
            .query_map(params![chat_address, sender_address], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn message_count(&self, chat_address: &str) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT count(*) FROM messages WHERE chat_address = ?1",
            [chat_address],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_store;

    fn key(raw: &str) -> String {
        format!("true_1@c.us_{raw}")
    }

    #[test]
    fn upsert_message_merges_body_and_sender_name_under_i4() {
        let store = test_store();
        let k = key("A");
        store
            .upsert_message(&k, "1@s.whatsapp.net", "1@s.whatsapp.net", "Alice", true, "hello", 1, false, None, None)
            .unwrap();
        store
            .upsert_message(&k, "1@s.whatsapp.net", "1@s.whatsapp.net", "", true, "", 2, false, None, None)
            .unwrap();

        let rows = store.get_messages("1@s.whatsapp.net", 10, None).unwrap();
        assert_eq!(rows[0].body, "hello");
        assert_eq!(rows[0].sender_name, "Alice");
        assert_eq!(rows[0].timestamp, 2);
    }

    #[test]
    fn upsert_message_always_rewrites_media_fields() {
        let store = test_store();
        let k = key("A");
        store
            .upsert_message(&k, "1@s.whatsapp.net", "", "", true, "", 1, true, Some("image"), Some(b"first"))
            .unwrap();
        store
            .upsert_message(&k, "1@s.whatsapp.net", "", "", true, "", 2, true, Some("video"), Some(b"second"))
            .unwrap();

        let raw = store.get_raw_encoded(&k).unwrap();
        assert_eq!(raw, b"second");
    }

    #[test]
    fn get_messages_respects_before_ts_upper_bound() {
        let store = test_store();
        store
            .upsert_message(&key("A"), "1@s.whatsapp.net", "", "", true, "a", 100, false, None, None)
            .unwrap();
        store
            .upsert_message(&key("B"), "1@s.whatsapp.net", "", "", true, "b", 200, false, None, None)
            .unwrap();

        let rows = store.get_messages("1@s.whatsapp.net", 10, Some(100)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].body, "a");
    }

    #[test]
    fn get_messages_orders_descending_by_timestamp() {
        let store = test_store();
        store
            .upsert_message(&key("A"), "1@s.whatsapp.net", "", "", true, "a", 100, false, None, None)
            .unwrap();
        store
            .upsert_message(&key("B"), "1@s.whatsapp.net", "", "", true, "b", 200, false, None, None)
            .unwrap();

        let rows = store.get_messages("1@s.whatsapp.net", 10, None).unwrap();
        assert_eq!(rows[0].body, "b");
        assert_eq!(rows[1].body, "a");
    }

    #[test]
    fn get_raw_encoded_errors_when_absent() {
        let store = test_store();
        store
            .upsert_message(&key("A"), "1@s.whatsapp.net", "", "", true, "a", 1, false, None, None)
            .unwrap();
        assert!(store.get_raw_encoded(&key("A")).is_err());
        assert!(matches!(store.get_raw_encoded(&key("missing")), Err(Error::NotFound(_))));
    }

    #[test]
    fn oldest_message_returns_minimum_timestamp_row() {
        let store = test_store();
        store
            .upsert_message(&key("A"), "1@s.whatsapp.net", "", "", true, "a", 300, false, None, None)
            .unwrap();
        store
            .upsert_message(&key("B"), "1@s.whatsapp.net", "", "", true, "b", 100, false, None, None)
            .unwrap();
        store
            .upsert_message(&key("C"), "1@s.whatsapp.net", "", "", true, "c", 200, false, None, None)
            .unwrap();

        let oldest = store.get_oldest_message("1@s.whatsapp.net").unwrap().unwrap();
        assert_eq!(oldest.raw_id, "B");
        assert_eq!(oldest.timestamp, 100);
    }

    #[test]
    fn group_lid_senders_missing_name_filters_non_group_and_named_rows() {
        let store = test_store();
        store.upsert_chat("1@g.us", "Group", true, None, None).unwrap();
        store.upsert_chat("2@s.whatsapp.net", "Dm", false, None, None).unwrap();

        store
            .upsert_message("true_1@g.us_A", "1@g.us", "111@lid", "", true, "a", 1, false, None, None)
            .unwrap();
        store
            .upsert_message("true_1@g.us_B", "1@g.us", "222@lid", "Known", true, "b", 2, false, None, None)
            .unwrap();
        store
            .upsert_message("true_2@c.us_C", "2@s.whatsapp.net", "333@lid", "", true, "c", 3, false, None, None)
            .unwrap();

        let pairs = store.group_lid_senders_missing_name(100).unwrap();
        assert_eq!(pairs, vec![("1@g.us".to_string(), "111@lid".to_string())]);
    }

    #[test]
    fn backfill_sender_name_only_updates_empty_rows() {
        let store = test_store();
        store
            .upsert_message(&key("A"), "1@s.whatsapp.net", "", "Alice", true, "a", 1, false, None, None)
            .unwrap();
        assert!(!store.backfill_sender_name(&key("A"), "Bob").unwrap());

        store
            .upsert_message(&key("B"), "1@s.whatsapp.net", "", "", true, "b", 2, false, None, None)
            .unwrap();
        assert!(store.backfill_sender_name(&key("B"), "Bob").unwrap());
    }
}
