use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::MessageResponse;

/// Events published to the dispatcher after a message write commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum MessageEvent {
    /// A message was posted
    MessageCreate { message: MessageResponse },

    /// A message's content was edited by its author
    MessageUpdate { message: MessageResponse },

    /// A message was removed. Replies to it are left in place.
    MessageDelete { id: Uuid },
}

impl MessageEvent {
    pub fn message_id(&self) -> Uuid {
        match self {
            Self::MessageCreate { message } | Self::MessageUpdate { message } => message.id,
            Self::MessageDelete { id } => *id,
        }
    }
}
