use super::Store;
use crate::address::string_to_api;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub message_id: String,
    pub chat_address: String,
    pub chat_name: String,
    pub sender_name: String,
    pub body: String,
    pub timestamp: i64,
}

impl Store {
    /// Full-text search over message bodies, joined back to messages and to
    /// chats/contacts to attach a display chat name. Ordered by FTS5's
    /// `rank`. Fails with `SearchUnavailable` if this build has no FTS5
    /// index (I6).
    pub fn search_messages(&self, query: &str, limit: i64) -> Result<Vec<SearchResult>> {
        if !self.fts_available() {
            return Err(Error::SearchUnavailable(
                "full-text search index not available in this build".to_string(),
            ));
        }

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT m.id, m.chat_address, m.sender_name, m.body, m.timestamp,
                    COALESCE(ct.name, ct.push_name, c.name, '') AS chat_name
             FROM messages_fts f
             JOIN messages m ON m.rowid = f.rowid
             LEFT JOIN chats c ON c.address = m.chat_address
             LEFT JOIN contacts ct ON ct.address = m.chat_address
             WHERE messages_fts MATCH ?1
             ORDER BY rank
             LIMIT ?2",
        )?;

        let rows = stmt
            .query_map(rusqlite::params![query, limit], |row| {
                let chat_address: String = row.get(1)?;
                let mut chat_name: String = row.get(5)?;
                if chat_name.is_empty() {
                    chat_name = crate::address::extract_number(&chat_address);
                }
                Ok(SearchResult {
                    message_id: row.get(0)?,
                    chat_address: chat_address.clone(),
                    chat_name,
                    sender_name: row.get(2)?,
                    body: row.get(3)?,
                    timestamp: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// API-form chat jid for a search result, exposed separately so callers
/// don't need to reach into `store` internals for the I1 boundary
/// conversion.
impl SearchResult {
    pub fn chat_jid(&self) -> String {
        string_to_api(&self.chat_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_store;

    #[test]
    fn search_finds_inserted_body_by_token() {
        let store = test_store();
        store.upsert_chat("1@s.whatsapp.net", "Alice", false, None, None).unwrap();
        store.upsert_chat("2@s.whatsapp.net", "Bob", false, None, None).unwrap();
        store
            .upsert_message("true_1@c.us_A", "1@s.whatsapp.net", "", "", true, "hello world", 1, false, None, None)
            .unwrap();
        store
            .upsert_message("true_2@c.us_B", "2@s.whatsapp.net", "", "", true, "goodbye", 2, false, None, None)
            .unwrap();

        let results = store.search_messages("hello", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].body, "hello world");
        assert_eq!(results[0].chat_jid(), "1@c.us");
    }

    #[test]
    fn search_index_stays_consistent_after_update_and_delete() {
        let store = test_store();
        store.upsert_chat("1@s.whatsapp.net", "Alice", false, None, None).unwrap();
        let key = "true_1@c.us_A";
        store
            .upsert_message(key, "1@s.whatsapp.net", "", "", true, "first body", 1, false, None, None)
            .unwrap();
        assert_eq!(store.search_messages("first", 10).unwrap().len(), 1);

        store
            .upsert_message(key, "1@s.whatsapp.net", "", "", true, "", 2, false, None, None)
            .unwrap();
        assert_eq!(store.search_messages("first", 10).unwrap().len(), 1);

        store.delete_chat("1@s.whatsapp.net").unwrap();
        assert_eq!(store.search_messages("first", 10).unwrap().len(), 0);
    }
}
