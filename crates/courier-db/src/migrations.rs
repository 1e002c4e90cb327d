use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                first_name  TEXT NOT NULL,
                last_name   TEXT NOT NULL,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE contacts (
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                contact_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                position    INTEGER NOT NULL,
                PRIMARY KEY (user_id, contact_id)
            );

            CREATE TABLE rooms (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE room_messages (
                room_id     TEXT NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
                message_id  TEXT NOT NULL,
                position    INTEGER NOT NULL,
                PRIMARY KEY (room_id, message_id)
            );

            -- author_id and parent_id carry no foreign key: a deleted author or
            -- parent leaves the reference dangling instead of blocking the delete.
            CREATE TABLE messages (
                seq         INTEGER PRIMARY KEY AUTOINCREMENT,
                id          TEXT NOT NULL UNIQUE,
                content     TEXT NOT NULL,
                author_id   TEXT NOT NULL,
                parent_id   TEXT,
                timestamp   TEXT NOT NULL
            );

            CREATE INDEX idx_messages_parent ON messages(parent_id, seq);
            CREATE INDEX idx_messages_author ON messages(author_id, parent_id);

            CREATE TABLE message_participants (
                message_id  TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL,
                position    INTEGER NOT NULL,
                PRIMARY KEY (message_id, user_id)
            );

            CREATE INDEX idx_participants_user ON message_participants(user_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
