//! The persistence contract the thread builder and access rules run against,
//! and its SQLite implementation.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use courier_db::Database;
use courier_db::messages::NewMessage;
use courier_types::models::{Message, UserSummary};

/// A message about to be stored. The store assigns nothing; the caller picks
/// the id and timestamp.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub id: Uuid,
    pub content: String,
    pub author_id: Uuid,
    pub participant_ids: Vec<Uuid>,
    pub parent_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

pub trait MessageStore: Send + Sync {
    /// Parentless messages that `user_id` authored or is a participant of,
    /// in store enumeration order.
    fn find_heads(&self, user_id: Uuid) -> impl Future<Output = Result<Vec<Message>>> + Send;

    /// The reply whose `parent_id` is `parent_id`, if any.
    fn find_child(&self, parent_id: Uuid) -> impl Future<Output = Result<Option<Message>>> + Send;

    fn find_message(&self, id: Uuid) -> impl Future<Output = Result<Option<Message>>> + Send;

    fn create_message(&self, draft: MessageDraft) -> impl Future<Output = Result<Message>> + Send;

    /// `None` when no message has that id.
    fn update_message_content(
        &self,
        id: Uuid,
        content: String,
        timestamp: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<Message>>> + Send;

    /// `false` when no message has that id.
    fn delete_message(&self, id: Uuid) -> impl Future<Output = Result<bool>> + Send;

    /// Summaries for whichever of `ids` exist. Order is unspecified.
    fn user_summaries(&self, ids: Vec<Uuid>) -> impl Future<Output = Result<Vec<UserSummary>>> + Send;
}

/// `MessageStore` over the shared SQLite database. Every call runs on the
/// blocking pool, so dropping the returned future abandons the caller's work
/// at the next await point.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Database>,
}

impl SqliteStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

/// Run a blocking database call off the async runtime.
pub(crate) async fn blocking<F, T>(db: &Arc<Database>, f: F) -> Result<T>
where
    F: FnOnce(&Database) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| anyhow!("spawn_blocking join error: {}", e))?
}

impl MessageStore for SqliteStore {
    async fn find_heads(&self, user_id: Uuid) -> Result<Vec<Message>> {
        let uid = user_id.to_string();
        let rows = blocking(&self.db, move |db| db.find_thread_heads(&uid)).await?;
        rows.into_iter().map(Message::try_from).collect()
    }

    async fn find_child(&self, parent_id: Uuid) -> Result<Option<Message>> {
        let pid = parent_id.to_string();
        let row = blocking(&self.db, move |db| db.find_child(&pid)).await?;
        row.map(Message::try_from).transpose()
    }

    async fn find_message(&self, id: Uuid) -> Result<Option<Message>> {
        let mid = id.to_string();
        let row = blocking(&self.db, move |db| db.get_message(&mid)).await?;
        row.map(Message::try_from).transpose()
    }

    async fn create_message(&self, draft: MessageDraft) -> Result<Message> {
        let id = draft.id.to_string();
        let author_id = draft.author_id.to_string();
        let participants: Vec<String> = draft.participant_ids.iter().map(Uuid::to_string).collect();
        let parent_id = draft.parent_id.map(|p| p.to_string());
        let timestamp = draft.timestamp.to_rfc3339();
        let content = draft.content.clone();

        blocking(&self.db, move |db| {
            db.insert_message(&NewMessage {
                id: &id,
                content: &content,
                author_id: &author_id,
                participants: &participants,
                parent_id: parent_id.as_deref(),
                timestamp: &timestamp,
            })
        })
        .await?;

        Ok(Message {
            id: draft.id,
            content: draft.content,
            author_id: draft.author_id,
            participant_ids: draft.participant_ids,
            timestamp: draft.timestamp,
            parent_id: draft.parent_id,
        })
    }

    async fn update_message_content(
        &self,
        id: Uuid,
        content: String,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<Message>> {
        let mid = id.to_string();
        let ts = timestamp.to_rfc3339();
        let row = blocking(&self.db, move |db| db.update_message_content(&mid, &content, &ts)).await?;
        row.map(Message::try_from).transpose()
    }

    async fn delete_message(&self, id: Uuid) -> Result<bool> {
        let mid = id.to_string();
        blocking(&self.db, move |db| db.delete_message(&mid)).await
    }

    async fn user_summaries(&self, ids: Vec<Uuid>) -> Result<Vec<UserSummary>> {
        let ids: Vec<String> = ids.iter().map(Uuid::to_string).collect();
        let rows = blocking(&self.db, move |db| db.get_users_by_ids(&ids)).await?;
        rows.iter().map(|r| r.summary()).collect()
    }
}
