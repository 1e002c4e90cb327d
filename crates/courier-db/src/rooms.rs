use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

use crate::Database;
use crate::models::RoomRow;

impl Database {
    pub fn list_rooms(&self) -> Result<Vec<RoomRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM rooms ORDER BY created_at ASC, rowid ASC")?;
            let heads = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            heads
                .into_iter()
                .map(|(id, name)| -> Result<RoomRow> {
                    let messages = room_message_ids(conn, &id)?;
                    Ok(RoomRow { id, name, messages })
                })
                .collect()
        })
    }

    pub fn get_room(&self, id: &str) -> Result<Option<RoomRow>> {
        self.with_conn(|conn| query_room(conn, id))
    }

    pub fn create_room(&self, id: &str, name: &str, messages: &[String]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("INSERT INTO rooms (id, name) VALUES (?1, ?2)", [id, name])?;
            for (position, message_id) in messages.iter().enumerate() {
                tx.execute(
                    "INSERT OR IGNORE INTO room_messages (room_id, message_id, position) VALUES (?1, ?2, ?3)",
                    rusqlite::params![id, message_id, position as i64],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Returns the renamed room, or `None` if it does not exist.
    pub fn rename_room(&self, id: &str, name: &str) -> Result<Option<RoomRow>> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("UPDATE rooms SET name = ?2 WHERE id = ?1", [id, name])?;
            if changed == 0 {
                return Ok(None);
            }
            query_room(conn, id)
        })
    }

    pub fn delete_room(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute("DELETE FROM rooms WHERE id = ?1", [id])?;
            Ok(removed > 0)
        })
    }
}

fn query_room(conn: &Connection, id: &str) -> Result<Option<RoomRow>> {
    let name: Option<String> = conn
        .query_row("SELECT name FROM rooms WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;

    match name {
        Some(name) => Ok(Some(RoomRow {
            id: id.to_string(),
            name,
            messages: room_message_ids(conn, id)?,
        })),
        None => Ok(None),
    }
}

fn room_message_ids(conn: &Connection, room_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT message_id FROM room_messages WHERE room_id = ?1 ORDER BY position ASC",
    )?;
    let ids = stmt
        .query_map([room_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn room_lifecycle() {
        let db = Database::open_in_memory().unwrap();
        let id = Uuid::new_v4().to_string();
        let pinned = vec![Uuid::new_v4().to_string(), Uuid::new_v4().to_string()];
        db.create_room(&id, "lobby", &pinned).unwrap();

        let room = db.get_room(&id).unwrap().unwrap();
        assert_eq!(room.name, "lobby");
        assert_eq!(room.messages, pinned);

        let renamed = db.rename_room(&id, "hall").unwrap().unwrap();
        assert_eq!(renamed.name, "hall");
        assert_eq!(db.list_rooms().unwrap().len(), 1);

        assert!(db.delete_room(&id).unwrap());
        assert!(db.get_room(&id).unwrap().is_none());
        assert!(db.rename_room(&id, "gone").unwrap().is_none());
    }
}
