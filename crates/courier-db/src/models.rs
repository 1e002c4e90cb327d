//! Database row types. These map directly to SQLite rows and keep ids as
//! strings; conversion into `courier-types` models happens here so the API
//! layer only ever sees parsed values.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use courier_types::models::{Message, Profile, Room, UserSummary};

pub struct UserRow {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub content: String,
    pub author_id: String,
    pub parent_id: Option<String>,
    pub timestamp: String,
    pub participants: Vec<String>,
}

pub struct RoomRow {
    pub id: String,
    pub name: String,
    pub messages: Vec<String>,
}

impl UserRow {
    pub fn summary(&self) -> Result<UserSummary> {
        Ok(UserSummary {
            id: parse_id(&self.id)?,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
        })
    }

    pub fn profile(&self, friends: &[String]) -> Result<Profile> {
        Ok(Profile {
            id: parse_id(&self.id)?,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            friends: friends.iter().map(|f| parse_id(f)).collect::<Result<_>>()?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl TryFrom<MessageRow> for Message {
    type Error = anyhow::Error;

    fn try_from(row: MessageRow) -> Result<Self> {
        let id = parse_id(&row.id)?;
        Ok(Message {
            id,
            author_id: parse_id(&row.author_id)
                .with_context(|| format!("author of message {}", row.id))?,
            participant_ids: row
                .participants
                .iter()
                .map(|p| parse_id(p))
                .collect::<Result<_>>()
                .with_context(|| format!("participants of message {}", row.id))?,
            timestamp: parse_timestamp(&row.timestamp)?,
            parent_id: row.parent_id.as_deref().map(parse_id).transpose()?,
            content: row.content,
        })
    }
}

impl TryFrom<RoomRow> for Room {
    type Error = anyhow::Error;

    fn try_from(row: RoomRow) -> Result<Self> {
        Ok(Room {
            id: parse_id(&row.id)?,
            messages: row.messages.iter().map(|m| parse_id(m)).collect::<Result<_>>()?,
            name: row.name,
        })
    }
}

pub fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("corrupt id '{}'", raw))
}

/// Accepts RFC 3339 as written by the application, or SQLite's
/// `datetime('now')` format which has no timezone and is UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .with_context(|| format!("corrupt timestamp '{}'", raw))
}
