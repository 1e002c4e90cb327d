use std::collections::HashMap;

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::Database;
use crate::models::MessageRow;
use crate::queries::placeholders;

const MESSAGE_COLUMNS: &str = "m.id, m.content, m.author_id, m.parent_id, m.timestamp";

/// Everything needed to persist a new message.
pub struct NewMessage<'a> {
    pub id: &'a str,
    pub content: &'a str,
    pub author_id: &'a str,
    pub participants: &'a [String],
    pub parent_id: Option<&'a str>,
    pub timestamp: &'a str,
}

impl Database {
    pub fn insert_message(&self, msg: &NewMessage<'_>) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (id, content, author_id, parent_id, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![msg.id, msg.content, msg.author_id, msg.parent_id, msg.timestamp],
            )?;
            for (position, user_id) in msg.participants.iter().enumerate() {
                tx.execute(
                    "INSERT INTO message_participants (message_id, user_id, position) VALUES (?1, ?2, ?3)",
                    params![msg.id, user_id, position as i64],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM messages m WHERE m.id = ?1", MESSAGE_COLUMNS);
            let row = conn.query_row(&sql, [id], message_from_row).optional()?;
            with_participants(conn, row)
        })
    }

    /// Messages without a parent that `user_id` authored or is named on,
    /// in insertion order.
    pub fn find_thread_heads(&self, user_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM messages m
                 WHERE m.parent_id IS NULL
                   AND (m.author_id = ?1
                        OR EXISTS (SELECT 1 FROM message_participants p
                                   WHERE p.message_id = m.id AND p.user_id = ?1))
                 ORDER BY m.seq ASC",
                MESSAGE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt
                .query_map([user_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            attach_participants(conn, &mut rows)?;
            Ok(rows)
        })
    }

    /// The reply to `parent_id`. Should several exist, the oldest wins.
    pub fn find_child(&self, parent_id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM messages m WHERE m.parent_id = ?1 ORDER BY m.seq ASC LIMIT 1",
                MESSAGE_COLUMNS
            );
            let row = conn.query_row(&sql, [parent_id], message_from_row).optional()?;
            with_participants(conn, row)
        })
    }

    /// Replaces content and timestamp. Returns the updated row, or `None` if
    /// no message has that id.
    pub fn update_message_content(
        &self,
        id: &str,
        content: &str,
        timestamp: &str,
    ) -> Result<Option<MessageRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE messages SET content = ?2, timestamp = ?3 WHERE id = ?1",
                params![id, content, timestamp],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let sql = format!("SELECT {} FROM messages m WHERE m.id = ?1", MESSAGE_COLUMNS);
            let row = tx.query_row(&sql, [id], message_from_row).optional()?;
            let row = with_participants(&tx, row)?;
            tx.commit()?;
            Ok(row)
        })
    }

    /// Removes a single message. Replies keep their `parent_id`.
    pub fn delete_message(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            Ok(removed > 0)
        })
    }
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        content: row.get(1)?,
        author_id: row.get(2)?,
        parent_id: row.get(3)?,
        timestamp: row.get(4)?,
        participants: Vec::new(),
    })
}

fn with_participants(conn: &Connection, row: Option<MessageRow>) -> Result<Option<MessageRow>> {
    let Some(row) = row else {
        return Ok(None);
    };
    let mut rows = vec![row];
    attach_participants(conn, &mut rows)?;
    Ok(rows.pop())
}

/// Batch-load participant lists for `rows` in one query.
fn attach_participants(conn: &Connection, rows: &mut [MessageRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    let sql = format!(
        "SELECT message_id, user_id FROM message_participants
         WHERE message_id IN ({})
         ORDER BY message_id, position ASC",
        placeholders(ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let pairs = stmt
        .query_map(rusqlite::params_from_iter(&ids), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut by_message: HashMap<String, Vec<String>> = HashMap::new();
    for (message_id, user_id) in pairs {
        by_message.entry(message_id).or_default().push(user_id);
    }
    for row in rows.iter_mut() {
        row.participants = by_message.remove(&row.id).unwrap_or_default();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn post(db: &Database, author: &str, participants: &[String], parent: Option<&str>) -> String {
        let id = Uuid::new_v4().to_string();
        db.insert_message(&NewMessage {
            id: &id,
            content: "hello",
            author_id: author,
            participants,
            parent_id: parent,
            timestamp: "2024-01-01T00:00:00Z",
        })
        .unwrap();
        id
    }

    #[test]
    fn heads_cover_author_and_participant_in_insertion_order() {
        let db = Database::open_in_memory().unwrap();
        let alice = Uuid::new_v4().to_string();
        let bob = Uuid::new_v4().to_string();
        let carol = Uuid::new_v4().to_string();

        let h1 = post(&db, &alice, &[], None);
        let h2 = post(&db, &bob, &[alice.clone()], None);
        let _reply = post(&db, &alice, &[], Some(&h1));
        let _other = post(&db, &carol, &[], None);

        let heads: Vec<String> = db
            .find_thread_heads(&alice)
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(heads, vec![h1, h2.clone()]);

        let bob_heads = db.find_thread_heads(&bob).unwrap();
        assert_eq!(bob_heads.len(), 1);
        assert_eq!(bob_heads[0].id, h2);
        assert_eq!(bob_heads[0].participants, vec![alice]);
    }

    #[test]
    fn find_child_prefers_oldest_reply() {
        let db = Database::open_in_memory().unwrap();
        let author = Uuid::new_v4().to_string();
        let head = post(&db, &author, &[], None);
        let first = post(&db, &author, &[], Some(&head));
        let _second = post(&db, &author, &[], Some(&head));

        let child = db.find_child(&head).unwrap().unwrap();
        assert_eq!(child.id, first);
        assert_eq!(child.parent_id.as_deref(), Some(head.as_str()));
        assert!(db.find_child(&first).unwrap().is_none());
    }

    #[test]
    fn delete_leaves_reply_dangling() {
        let db = Database::open_in_memory().unwrap();
        let author = Uuid::new_v4().to_string();
        let head = post(&db, &author, &[author.clone()], None);
        let reply = post(&db, &author, &[], Some(&head));

        assert!(db.delete_message(&head).unwrap());
        assert!(db.get_message(&head).unwrap().is_none());

        let orphan = db.get_message(&reply).unwrap().unwrap();
        assert_eq!(orphan.parent_id.as_deref(), Some(head.as_str()));
        assert!(db.find_thread_heads(&author).unwrap().is_empty());
    }

    #[test]
    fn update_touches_only_content_and_timestamp() {
        let db = Database::open_in_memory().unwrap();
        let author = Uuid::new_v4().to_string();
        let friend = Uuid::new_v4().to_string();
        let head = post(&db, &author, &[friend.clone()], None);

        let row = db
            .update_message_content(&head, "edited", "2024-02-02T00:00:00Z")
            .unwrap()
            .unwrap();
        assert_eq!(row.content, "edited");
        assert_eq!(row.timestamp, "2024-02-02T00:00:00Z");
        assert_eq!(row.author_id, author);
        assert_eq!(row.participants, vec![friend]);
        assert!(row.parent_id.is_none());

        assert!(db.update_message_content("missing", "x", "t").unwrap().is_none());
    }
}
