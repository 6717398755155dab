//! Row types and typed query/update values.
//!
//! Rows map directly to SQLite rows and stay distinct from the hollow-types
//! wire models to keep the DB layer independent. Ids and timestamps are the
//! stored text; callers parse them.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub avatar: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct BoxRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner_id: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub box_id: String,
    pub sender_id: Option<String>,
    /// Resolved through the sender; `None` for anonymous or unknown senders.
    pub sender_email: Option<String>,
    pub content: String,
    pub is_anonymous: bool,
    pub like_count: i64,
    pub liked_by: Vec<String>,
    pub created_at: String,
}

impl MessageRow {
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.liked_by.iter().any(|id| id == user_id)
    }
}

// -- Inserts --

pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub avatar: &'a str,
}

pub struct NewBox<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub owner_id: &'a str,
}

pub struct NewMessage<'a> {
    pub box_id: &'a str,
    /// `None` for anonymous posts.
    pub sender_id: Option<&'a str>,
    pub content: &'a str,
    pub is_anonymous: bool,
}

// -- Filters --

#[derive(Debug, Clone, Copy)]
pub enum UserFilter<'a> {
    ById(&'a str),
    ByEmail(&'a str),
}

#[derive(Debug, Clone, Copy)]
pub enum MessageFilter<'a> {
    ById(&'a str),
    ByBox(&'a str),
}

// -- Updates --

/// A combined liker-set and counter mutation, applied atomically.
#[derive(Debug, Clone, Copy)]
pub enum MessageUpdate<'a> {
    /// Add the user to the liker set and bump the count if they were not in it.
    AddLiker(&'a str),
    /// Remove the user from the liker set and drop the count if they were in it.
    RemoveLiker(&'a str),
}

#[derive(Debug, Clone, Copy)]
pub enum UserUpdate<'a> {
    SetAvatar(&'a str),
}
