use anyhow::Result;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};

use crate::Database;
use crate::models::UserRow;

const USER_COLUMNS: &str = "id, first_name, last_name, email, password, created_at";

/// Fields a profile edit may change; `None` leaves the column untouched.
#[derive(Debug, Default)]
pub struct UserChanges<'a> {
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub email: Option<&'a str>,
}

impl Database {
    // -- Users --

    /// Returns `false` when the email is already registered.
    pub fn create_user(
        &self,
        id: &str,
        first_name: &str,
        last_name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, first_name, last_name, email, password) VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, first_name, last_name, email, password_hash),
            );
            match inserted {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation => {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Batch-fetch users by id. Unknown ids are skipped; order is unspecified.
    pub fn get_users_by_ids(&self, ids: &[String]) -> Result<Vec<UserRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM users WHERE id IN ({})",
                USER_COLUMNS,
                placeholders(ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(ids), user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_users(&self, offset: u32, limit: u32) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM users ORDER BY last_name ASC, first_name ASC LIMIT ?1 OFFSET ?2",
                USER_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![limit, offset], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Case-insensitive substring match on first name, last name or email.
    pub fn search_users(&self, query: &str, offset: u32, limit: u32) -> Result<Vec<UserRow>> {
        let pattern = format!("%{}%", escape_like(query));

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM users
                 WHERE first_name LIKE ?1 ESCAPE '\\'
                    OR last_name LIKE ?1 ESCAPE '\\'
                    OR email LIKE ?1 ESCAPE '\\'
                 ORDER BY last_name ASC, first_name ASC
                 LIMIT ?2 OFFSET ?3",
                USER_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![pattern, limit, offset], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Applies the given changes and returns the updated row, or `None` if
    /// the user does not exist.
    pub fn update_user(&self, id: &str, changes: &UserChanges<'_>) -> Result<Option<UserRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE users SET
                    first_name = COALESCE(?2, first_name),
                    last_name  = COALESCE(?3, last_name),
                    email      = COALESCE(?4, email)
                 WHERE id = ?1",
                params![id, changes.first_name, changes.last_name, changes.email],
            )?;
            let row = query_user(&tx, "id", id)?;
            tx.commit()?;
            Ok(row)
        })
    }

    /// Removes the user. Contact links in both directions go with it.
    pub fn delete_user(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(removed > 0)
        })
    }

    // -- Contacts --

    pub fn get_contact_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT contact_id FROM contacts WHERE user_id = ?1 ORDER BY position ASC",
            )?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(ids)
        })
    }

    /// Contacts of `user_id`, in the order they were added.
    pub fn get_contacts(&self, user_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.first_name, u.last_name, u.email, u.password, u.created_at
                 FROM contacts c
                 JOIN users u ON u.id = c.contact_id
                 WHERE c.user_id = ?1
                 ORDER BY c.position ASC",
            )?;
            let rows = stmt
                .query_map([user_id], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn is_contact(&self, user_id: &str, contact_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM contacts WHERE user_id = ?1 AND contact_id = ?2",
                    [user_id, contact_id],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Appends `contact_id` to the user's list. Returns false if already listed.
    pub fn add_contact(&self, user_id: &str, contact_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO contacts (user_id, contact_id, position)
                 VALUES (?1, ?2, (SELECT COALESCE(MAX(position), 0) + 1 FROM contacts WHERE user_id = ?1))",
                [user_id, contact_id],
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn remove_contact(&self, user_id: &str, contact_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM contacts WHERE user_id = ?1 AND contact_id = ?2",
                [user_id, contact_id],
            )?;
            Ok(removed > 0)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], user_from_row).optional()?;
    Ok(row)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        password: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// `?1, ?2, ... ?n` for an `IN (...)` clause.
pub(crate) fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{}", i)).collect::<Vec<_>>().join(", ")
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
