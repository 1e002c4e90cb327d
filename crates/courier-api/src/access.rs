//! Per-message read, edit and delete rules.
//!
//! Visibility is uniform across the single-message and thread paths: a user
//! may read a message when they authored it, or when they are the author or a
//! participant of the head of the thread it belongs to. Participants named on
//! a reply gain nothing from that alone. Only the author may edit or delete.
//! Deleting never touches replies; they keep pointing at the removed id.

use std::collections::HashSet;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use courier_types::models::Message;

use crate::error::ApiError;
use crate::store::{MessageDraft, MessageStore};
use crate::threads::ThreadBuilder;

pub struct MessageAccess<'a, S> {
    store: &'a S,
    max_depth: usize,
}

impl<'a, S: MessageStore> MessageAccess<'a, S> {
    pub fn new(store: &'a S, max_depth: usize) -> Self {
        Self {
            store,
            max_depth: max_depth.max(1),
        }
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Message, ApiError> {
        let message = self
            .store
            .find_message(id)
            .await?
            .ok_or_else(|| ApiError::not_found("No message found with id"))?;

        if !self.can_view(user_id, &message).await? {
            return Err(ApiError::forbidden("Not authorized, message not visible to user"));
        }
        Ok(message)
    }

    /// The full thread rooted at `head_id`.
    pub async fn thread(&self, user_id: Uuid, head_id: Uuid) -> Result<Vec<Message>, ApiError> {
        let head = self.get(user_id, head_id).await?;
        if !head.is_head() {
            return Err(ApiError::validation("Message is not a thread head"));
        }
        let thread = ThreadBuilder::new(self.store, self.max_depth)
            .walk(head)
            .await
            .map_err(|e| ApiError::Internal(e.into()))?;
        Ok(thread)
    }

    pub async fn create(
        &self,
        author_id: Uuid,
        content: &str,
        participant_ids: Vec<Uuid>,
        parent_id: Option<Uuid>,
    ) -> Result<Message, ApiError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ApiError::validation("Message has no content"));
        }

        if let Some(pid) = parent_id {
            let parent = self
                .store
                .find_message(pid)
                .await?
                .ok_or_else(|| ApiError::not_found("No parent message found"))?;
            if !self.can_view(author_id, &parent).await? {
                return Err(ApiError::forbidden("Not authorized to reply to this message"));
            }
        }

        if !participant_ids.is_empty() {
            let found = self.store.user_summaries(participant_ids.clone()).await?;
            if found.len() != participant_ids.len() {
                return Err(ApiError::not_found("No participant found"));
            }
        }

        let message = self
            .store
            .create_message(MessageDraft {
                id: Uuid::new_v4(),
                content: content.to_string(),
                author_id,
                participant_ids,
                parent_id,
                timestamp: Utc::now(),
            })
            .await?;

        info!("User {} posted message {}", author_id, message.id);
        Ok(message)
    }

    /// Replace the content and refresh the timestamp. Author, parent and
    /// participants are untouched.
    pub async fn edit(&self, user_id: Uuid, id: Uuid, content: &str) -> Result<Message, ApiError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ApiError::validation("Message has no content"));
        }

        let message = self
            .store
            .find_message(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Message not found"))?;

        if message.author_id != user_id {
            return Err(ApiError::forbidden(
                "Cannot alter message when author and user ids do not match",
            ));
        }

        self.store
            .update_message_content(id, content.to_string(), Utc::now())
            .await?
            .ok_or_else(|| ApiError::not_found("Message not found"))
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<Uuid, ApiError> {
        let message = self
            .store
            .find_message(id)
            .await?
            .ok_or_else(|| ApiError::not_found("No message found"))?;

        if message.author_id != user_id {
            return Err(ApiError::forbidden(
                "Cannot delete message when author and user ids do not match",
            ));
        }

        if !self.store.delete_message(id).await? {
            return Err(ApiError::not_found("No message found"));
        }
        info!("User {} deleted message {}", user_id, id);
        Ok(id)
    }

    /// The author, or someone involved with the topmost ancestor that still
    /// exists.
    async fn can_view(&self, user_id: Uuid, message: &Message) -> Result<bool, ApiError> {
        if message.author_id == user_id {
            return Ok(true);
        }

        let mut seen = HashSet::from([message.id]);
        let mut top = message.clone();
        while let Some(parent_id) = top.parent_id {
            if seen.len() > self.max_depth || !seen.insert(parent_id) {
                warn!("Gave up climbing from message {} at {}", message.id, top.id);
                return Ok(false);
            }
            match self.store.find_message(parent_id).await? {
                Some(parent) => top = parent,
                None => break,
            }
        }
        Ok(top.involves(user_id))
    }
}
