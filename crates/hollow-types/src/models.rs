use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public projection of a user. The password hash never leaves the store layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: Uuid,
    pub email: String,
    /// Data URL, `data:<mime>;base64,<payload>`.
    pub avatar: String,
}

/// A box: the named container messages are posted under.
///
/// Called `TopicBox` here so it never shadows `std::boxed::Box`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicBox {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A message as seen by one particular viewer.
///
/// The liker set itself is never exposed; `is_liked` answers the only question
/// a client may ask of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub id: Uuid,
    pub box_id: Uuid,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_email: Option<String>,
    pub is_anonymous: bool,
    pub like_count: i64,
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
}
