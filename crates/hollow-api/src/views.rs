//! Row → wire model conversions.
//!
//! Corrupt stored ids or timestamps are logged and replaced with defaults
//! rather than failing the whole listing.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use hollow_db::{BoxRow, MessageRow};
use hollow_types::models::{MessageView, TopicBox};

use crate::error::AppError;
use crate::middleware::AuthUser;

/// Parse a path identifier, naming the entity in the 400 message.
pub fn parse_id(raw: &str, entity: &str) -> Result<Uuid, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("Invalid {} ID", entity)))
}

fn stored_uuid(raw: &str, field: &str, row_id: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on row '{}': {}", field, raw, row_id, e);
        Uuid::default()
    })
}

fn stored_timestamp(raw: &str, row_id: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by SQLite's datetime('now') carry no timezone.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on row '{}': {}", raw, row_id, e);
            DateTime::default()
        })
}

pub fn topic_box(row: BoxRow) -> TopicBox {
    TopicBox {
        id: stored_uuid(&row.id, "id", &row.id),
        owner_id: stored_uuid(&row.owner_id, "owner_id", &row.id),
        created_at: stored_timestamp(&row.created_at, &row.id),
        updated_at: stored_timestamp(&row.updated_at, &row.id),
        name: row.name,
        description: row.description,
    }
}

/// Project a message for `viewer`. Anonymous messages never carry a sender,
/// and `is_liked` is only ever true for a signed-in viewer.
pub fn message_view(row: MessageRow, viewer: Option<AuthUser>) -> MessageView {
    let is_liked = viewer
        .map(|v| row.is_liked_by(&v.user_id.to_string()))
        .unwrap_or(false);
    let sender_email = if row.is_anonymous { None } else { row.sender_email };

    MessageView {
        id: stored_uuid(&row.id, "id", &row.id),
        box_id: stored_uuid(&row.box_id, "box_id", &row.id),
        created_at: stored_timestamp(&row.created_at, &row.id),
        content: row.content,
        sender_email,
        is_anonymous: row.is_anonymous,
        like_count: row.like_count,
        is_liked,
    }
}
