use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{MessageView, TopicBox, UserPublic};

// -- JWT Claims --

/// Identity token claims. `sub` is the user id; `iat`/`exp` are unix seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

// -- Common --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Returned by every endpoint that creates a document.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub message: String,
    pub id: Uuid,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserPublic,
}

// -- Boxes --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBoxRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BoxDetailResponse {
    #[serde(rename = "box")]
    pub topic_box: TopicBox,
    pub messages: Vec<MessageView>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateMessageRequest {
    pub content: String,
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeResponse {
    pub message: String,
    pub is_liked: bool,
    pub like_count: i64,
}

// -- Users --

#[derive(Debug, Serialize, Deserialize)]
pub struct AvatarResponse {
    pub message: String,
    pub avatar: String,
}
