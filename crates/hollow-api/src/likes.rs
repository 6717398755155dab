use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::debug;
use uuid::Uuid;

use hollow_db::{Database, MessageFilter, MessageUpdate};
use hollow_types::api::LikeResponse;

use crate::auth::AppState;
use crate::error::{AppError, blocking};
use crate::middleware::AuthUser;
use crate::views::parse_id;

/// Membership state after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeOutcome {
    pub is_liked: bool,
    pub like_count: i64,
}

/// Flip `user_id`'s like on `message_id`.
///
/// Reads the liker set, then issues one combined set/counter update in the
/// opposite direction. The read and the update are separate store calls, so
/// the same user firing twice concurrently may see the same starting state;
/// the combined update still keeps the count equal to the set's cardinality.
pub fn toggle(db: &Database, message_id: Uuid, user_id: Uuid) -> Result<LikeOutcome, AppError> {
    let mid = message_id.to_string();
    let uid = user_id.to_string();

    let message = db
        .find_message(MessageFilter::ById(&mid))
        .map_err(|e| AppError::store("Failed to load message", e))?
        .ok_or_else(message_not_found)?;

    let was_liked = message.is_liked_by(&uid);
    let update = if was_liked {
        MessageUpdate::RemoveLiker(&uid)
    } else {
        MessageUpdate::AddLiker(&uid)
    };

    let updated = db
        .update_message(&mid, update)
        .map_err(|e| AppError::store("Failed to update like status", e))?
        // Deleted between the read and the update.
        .ok_or_else(message_not_found)?;

    Ok(LikeOutcome {
        is_liked: !was_liked,
        like_count: updated.like_count,
    })
}

fn message_not_found() -> AppError {
    AppError::NotFound("Message not found".into())
}

pub async fn toggle_like(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let message_id = parse_id(&message_id, "message")?;

    let db = state.clone();
    let outcome = blocking(move || toggle(&db.db, message_id, user.user_id)).await?;

    debug!(%message_id, user_id = %user.user_id, is_liked = outcome.is_liked, "Like toggled");

    Ok(Json(LikeResponse {
        message: "Like status updated successfully".into(),
        is_liked: outcome.is_liked,
        like_count: outcome.like_count,
    }))
}
