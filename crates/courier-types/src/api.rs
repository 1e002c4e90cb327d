use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Account, Profile, Room, UserSummary};

// -- JWT Claims --

/// JWT claims issued at register/login and checked by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

// -- Envelope --

/// Write requests carry their payload under `data`.
#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> Default for DataEnvelope<T> {
    fn default() -> Self {
        Self { data: None }
    }
}

// -- Auth --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: Account,
    pub token: String,
}

// -- Messages --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateMessageRequest {
    pub content: Option<String>,
    /// Missing and `null` both mean nobody besides the author.
    pub participants: Option<Vec<String>>,
    pub parent_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditMessageRequest {
    pub content: Option<String>,
}

/// A message with its author and participants resolved to summaries.
/// `author` is `None` once the author's account has been deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: Uuid,
    pub content: String,
    pub author: Option<UserSummary>,
    pub participants: Vec<UserSummary>,
    pub timestamp: DateTime<Utc>,
    pub parent_id: Option<Uuid>,
}

/// Root first, most recent reply last.
pub type Thread = Vec<MessageResponse>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ThreadsResponse {
    pub messages: Vec<Thread>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ThreadResponse {
    pub thread: Thread,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SingleMessageResponse {
    pub message: MessageResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub id: Uuid,
}

// -- Contacts --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddContactRequest {
    pub contact_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactsResponse {
    pub contacts: Vec<UserSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactResponse {
    pub contact: UserSummary,
}

// -- Rooms --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoomRequest {
    pub name: Option<String>,
    /// Only honoured on create.
    pub messages: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoomsResponse {
    pub rooms: Vec<Room>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoomResponse {
    pub room: Room,
}

// -- Profile --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EditProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: Profile,
}

// -- Users --

/// Paging parameters arrive as raw strings so that a malformed value
/// surfaces as a validation message instead of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub query: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsersResponse {
    pub users: Vec<UserSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: UserSummary,
}
