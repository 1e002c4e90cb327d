//! Thread reconstruction.
//!
//! Messages link to their parent through `parent_id`; a message without one
//! heads a thread. Building the threads a user can see is a two step affair:
//! find every head the user authored or is a participant of, then follow each
//! head's chain of replies one lookup at a time until a message has no reply.
//!
//! The walk is bounded by a maximum length and a visited set so that corrupt
//! data (a cycle, or a runaway chain) fails the request instead of hanging it.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::{debug, error, warn};
use uuid::Uuid;

use courier_types::api::{MessageResponse, Thread};
use courier_types::models::{Message, UserSummary};

use crate::store::MessageStore;

pub const DEFAULT_MAX_THREAD_DEPTH: usize = 10_000;

#[derive(Debug, Error)]
pub enum ThreadError {
    #[error("message store failure: {0:#}")]
    Store(#[from] anyhow::Error),

    #[error("reply chain from {head} loops back to {repeated}")]
    Cycle { head: Uuid, repeated: Uuid },

    #[error("reply chain from {head} exceeds {limit} messages")]
    DepthExceeded { head: Uuid, limit: usize },
}

pub struct ThreadBuilder<'a, S> {
    store: &'a S,
    max_depth: usize,
}

impl<'a, S: MessageStore> ThreadBuilder<'a, S> {
    pub fn new(store: &'a S, max_depth: usize) -> Self {
        Self {
            store,
            max_depth: max_depth.max(1),
        }
    }

    /// Every thread visible to `user_id`, in head discovery order, each
    /// ordered root first.
    pub async fn build(&self, user_id: Uuid) -> Result<Vec<Vec<Message>>, ThreadError> {
        let heads = self.store.find_heads(user_id).await?;
        debug!("Found {} thread heads for user {}", heads.len(), user_id);

        let mut threads = Vec::with_capacity(heads.len());
        for head in heads {
            threads.push(self.walk(head).await?);
        }
        Ok(threads)
    }

    /// Follow replies from `head` until a message has none.
    pub async fn walk(&self, head: Message) -> Result<Vec<Message>, ThreadError> {
        let head_id = head.id;
        let mut seen = HashSet::from([head_id]);
        let mut thread = vec![head];

        loop {
            let last = thread[thread.len() - 1].id;
            let Some(child) = self.store.find_child(last).await? else {
                break;
            };

            if !seen.insert(child.id) {
                error!("Reply cycle detected: thread {} revisits {}", head_id, child.id);
                return Err(ThreadError::Cycle {
                    head: head_id,
                    repeated: child.id,
                });
            }
            if thread.len() >= self.max_depth {
                warn!("Thread {} exceeds depth limit {}", head_id, self.max_depth);
                return Err(ThreadError::DepthExceeded {
                    head: head_id,
                    limit: self.max_depth,
                });
            }
            thread.push(child);
        }

        debug!("Thread {} has {} messages", head_id, thread.len());
        Ok(thread)
    }
}

/// Resolve authors and participants for a set of threads with a single
/// identity lookup.
pub async fn enrich_threads<S: MessageStore>(
    store: &S,
    threads: Vec<Vec<Message>>,
) -> anyhow::Result<Vec<Thread>> {
    let directory = directory_for(store, threads.iter().flatten()).await?;
    Ok(threads
        .into_iter()
        .map(|thread| thread.into_iter().map(|m| to_response(m, &directory)).collect())
        .collect())
}

pub async fn enrich_message<S: MessageStore>(store: &S, message: Message) -> anyhow::Result<MessageResponse> {
    let directory = directory_for(store, std::iter::once(&message)).await?;
    Ok(to_response(message, &directory))
}

async fn directory_for<'m, S: MessageStore>(
    store: &S,
    messages: impl Iterator<Item = &'m Message>,
) -> anyhow::Result<HashMap<Uuid, UserSummary>> {
    let ids: HashSet<Uuid> = messages.flat_map(Message::identity_ids).collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let summaries = store.user_summaries(ids.into_iter().collect()).await?;
    Ok(summaries.into_iter().map(|s| (s.id, s)).collect())
}

fn to_response(message: Message, directory: &HashMap<Uuid, UserSummary>) -> MessageResponse {
    MessageResponse {
        author: directory.get(&message.author_id).cloned(),
        participants: message
            .participant_ids
            .iter()
            .filter_map(|id| directory.get(id).cloned())
            .collect(),
        id: message.id,
        content: message.content,
        timestamp: message.timestamp,
        parent_id: message.parent_id,
    }
}
