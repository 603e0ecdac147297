use super::Store;
use crate::address::{extract_number, string_to_api};
use crate::error::Result;
use rusqlite::{OptionalExtension, params};

#[derive(Debug, Clone, PartialEq)]
pub struct ContactRow {
    pub id: String,
    pub name: String,
    pub number: String,
    pub is_group: bool,
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Keeps the existing value when the incoming one is empty (I4).
fn merge_non_empty(existing: &str, incoming: &str) -> String {
    if incoming.is_empty() {
        existing.to_string()
    } else {
        incoming.to_string()
    }
}

impl Store {
    /// Insert-or-update a contact. `name`, `push_name`, and `number` are
    /// merged under I4; `is_group` and `updated_at` are always overwritten.
    /// `address` is the internal-form address (I1).
    pub fn upsert_contact(
        &self,
        address: &str,
        name: &str,
        push_name: &str,
        number: &str,
        is_group: bool,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let existing: Option<(String, String, String)> = conn
            .query_row(
                "SELECT name, push_name, number FROM contacts WHERE address = ?1",
                [address],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let (merged_name, merged_push, merged_number) = match existing {
            Some((existing_name, existing_push, existing_number)) => (
                merge_non_empty(&existing_name, name),
                merge_non_empty(&existing_push, push_name),
                merge_non_empty(&existing_number, number),
            ),
            None => (name.to_string(), push_name.to_string(), number.to_string()),
        };

        conn.execute(
            "INSERT INTO contacts (address, name, push_name, number, is_group, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(address) DO UPDATE SET
                name = excluded.name,
                push_name = excluded.push_name,
                number = excluded.number,
                is_group = excluded.is_group,
                updated_at = excluded.updated_at",
            params![address, merged_name, merged_push, merged_number, is_group, now()],
        )?;
        Ok(())
    }

    /// Updates only `push_name`. No-op if `name` is empty.
    pub fn update_push_name(&self, address: &str, name: &str) -> Result<()> {
        if name.is_empty() {
            return Ok(());
        }
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO contacts (address, push_name, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(address) DO UPDATE SET push_name = ?2, updated_at = ?3",
            params![address, name, now()],
        )?;
        Ok(())
    }

    pub fn get_contact_name(&self, address: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let name: Option<String> = conn
            .query_row(
                "SELECT name FROM contacts WHERE address = ?1 AND name != ''",
                [address],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name)
    }

    /// All chats not in `LID`/`BROADCAST`, left-joined to the optional
    /// contact row, with a display name computed as the first non-empty of
    /// `{contact.name, contact.push_name, chat.name, extract_number(address)}`.
    /// Ordered by display name, case-insensitive.
    pub fn get_contacts(&self) -> Result<Vec<ContactRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT c.address, c.name AS chat_name, c.is_group,
                    ct.name AS contact_name, ct.push_name, ct.number
             FROM chats c
             LEFT JOIN contacts ct ON ct.address = c.address
             WHERE c.address NOT LIKE '%@lid' AND c.address NOT LIKE '%@broadcast'",
        )?;

        let mut rows = stmt
            .query_map([], |row| {
                let address: String = row.get(0)?;
                let chat_name: String = row.get(1)?;
                let is_group: bool = row.get(2)?;
                let contact_name: Option<String> = row.get(3)?;
                let push_name: Option<String> = row.get(4)?;
                let number: Option<String> = row.get(5)?;

                let display_name = [
                    contact_name.unwrap_or_default(),
                    push_name.unwrap_or_default(),
                    chat_name,
                    extract_number(&address),
                ]
                .into_iter()
                .find(|s| !s.is_empty())
                .unwrap_or_default();

                Ok(ContactRow {
                    id: string_to_api(&address),
                    name: display_name,
                    number: number.unwrap_or_default(),
                    is_group,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_store;

    #[test]
    fn upsert_contact_preserves_non_empty_fields_on_empty_update() {
        let store = test_store();
        store
            .upsert_contact("1@s.whatsapp.net", "Alice", "ali", "1", false)
            .unwrap();
        store.upsert_contact("1@s.whatsapp.net", "", "", "", false).unwrap();

        let conn = store.conn.lock().unwrap();
        let (name, push, number): (String, String, String) = conn
            .query_row(
                "SELECT name, push_name, number FROM contacts WHERE address = ?1",
                ["1@s.whatsapp.net"],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!(name, "Alice");
        assert_eq!(push, "ali");
        assert_eq!(number, "1");
    }

    #[test]
    fn upsert_contact_overwrites_non_empty_with_non_empty() {
        let store = test_store();
        store.upsert_contact("1@s.whatsapp.net", "Alice", "", "", false).unwrap();
        store.upsert_contact("1@s.whatsapp.net", "Alicia", "", "", false).unwrap();

        let conn = store.conn.lock().unwrap();
        let name: String = conn
            .query_row(
                "SELECT name FROM contacts WHERE address = ?1",
                ["1@s.whatsapp.net"],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(name, "Alicia");
    }

    #[test]
    fn update_push_name_is_noop_for_empty_name() {
        let store = test_store();
        store.update_push_name("1@s.whatsapp.net", "").unwrap();
        let conn = store.conn.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT count(*) FROM contacts", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn contacts_filters_lid_and_broadcast_chats() {
        let store = test_store();
        store
            .upsert_chat("1@s.whatsapp.net", "Alice", false, None, None)
            .unwrap();
        store.upsert_chat("2@lid", "Hidden", false, None, None).unwrap();
        store
            .upsert_chat("status@broadcast", "Status", false, None, None)
            .unwrap();

        let contacts = store.get_contacts().unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].id, "1@c.us");
    }

    #[test]
    fn contacts_display_name_cascade_falls_back_to_number() {
        let store = test_store();
        store
            .upsert_chat("10000000001@s.whatsapp.net", "", false, None, None)
            .unwrap();
        let contacts = store.get_contacts().unwrap();
        assert_eq!(contacts[0].name, "10000000001");
    }
}
