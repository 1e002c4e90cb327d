use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public view of a user. Never carries the password hash or contact list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// The caller's own account as returned by register/login, contacts resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub friends: Vec<UserSummary>,
}

/// The caller's own profile, contacts as bare ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub friends: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A stored message. `parent_id == None` marks a thread head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub content: String,
    pub author_id: Uuid,
    pub participant_ids: Vec<Uuid>,
    pub timestamp: DateTime<Utc>,
    pub parent_id: Option<Uuid>,
}

impl Message {
    pub fn is_head(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Author or named participant.
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.author_id == user_id || self.participant_ids.contains(&user_id)
    }

    /// Every identity referenced by this message, author first.
    pub fn identity_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        std::iter::once(self.author_id).chain(self.participant_ids.iter().copied())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub messages: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(author_id: Uuid, participant_ids: Vec<Uuid>) -> Message {
        Message {
            id: Uuid::new_v4(),
            content: "hi".into(),
            author_id,
            participant_ids,
            timestamp: Utc::now(),
            parent_id: None,
        }
    }

    #[test]
    fn involves_author_and_participants_only() {
        let author = Uuid::new_v4();
        let friend = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let msg = message(author, vec![friend]);

        assert!(msg.involves(author));
        assert!(msg.involves(friend));
        assert!(!msg.involves(stranger));
    }

    #[test]
    fn identity_ids_lists_author_first() {
        let author = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let ids: Vec<Uuid> = message(author, vec![a, b]).identity_ids().collect();
        assert_eq!(ids, vec![author, a, b]);
    }

    #[test]
    fn summary_serializes_camel_case_without_secrets() {
        let summary = UserSummary {
            id: Uuid::nil(),
            first_name: "Debbie".into(),
            last_name: "Downer".into(),
            email: "debbie@example.com".into(),
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["firstName"], "Debbie");
        assert_eq!(json["lastName"], "Downer");
        assert!(json.get("password").is_none());
        assert!(json.get("friends").is_none());
    }
}
