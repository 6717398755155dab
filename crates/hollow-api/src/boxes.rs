use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use hollow_db::{MessageFilter, NewBox, NewMessage};
use hollow_types::api::{BoxDetailResponse, CreateBoxRequest, CreateMessageRequest, CreatedResponse};
use hollow_types::models::{MessageView, TopicBox};

use crate::auth::AppState;
use crate::error::{AppError, blocking};
use crate::middleware::{AuthUser, Viewer};
use crate::views::{self, parse_id};

const MAX_BOX_NAME_LEN: usize = 100;
const MAX_BOX_DESCRIPTION_LEN: usize = 500;
const MAX_MESSAGE_LEN: usize = 2000;

pub async fn create_box(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateBoxRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;

    let name = req.name.trim().to_string();
    if name.is_empty() || name.chars().count() > MAX_BOX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Box name must be 1-{} characters",
            MAX_BOX_NAME_LEN
        )));
    }
    if req.description.chars().count() > MAX_BOX_DESCRIPTION_LEN {
        return Err(AppError::Validation(format!(
            "Box description must be at most {} characters",
            MAX_BOX_DESCRIPTION_LEN
        )));
    }

    let db = state.clone();
    let owner_id = user.user_id.to_string();
    let description = req.description;
    let box_id = blocking(move || {
        db.db
            .insert_box(&NewBox {
                name: &name,
                description: &description,
                owner_id: &owner_id,
            })
            .map_err(|e| AppError::store("Failed to create box", e))
    })
    .await?;

    info!(%box_id, owner_id = %user.user_id, "Box created");

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Box created successfully".into(),
            id: box_id,
        }),
    ))
}

pub async fn list_boxes(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let rows = blocking(move || {
        state
            .db
            .find_boxes()
            .map_err(|e| AppError::store("Failed to fetch boxes", e))
    })
    .await?;

    let boxes: Vec<TopicBox> = rows.into_iter().map(views::topic_box).collect();
    Ok(Json(boxes))
}

pub async fn get_box(
    State(state): State<AppState>,
    Path(box_id): Path<String>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, AppError> {
    let box_id = parse_id(&box_id, "box")?.to_string();

    let (box_row, message_rows) = blocking(move || {
        let box_row = state
            .db
            .find_box(&box_id)
            .map_err(|e| AppError::store("Failed to fetch box", e))?
            .ok_or_else(|| AppError::NotFound("Box not found".into()))?;

        let message_rows = state
            .db
            .find_messages(MessageFilter::ByBox(&box_id))
            .map_err(|e| AppError::store("Failed to fetch messages", e))?;

        Ok((box_row, message_rows))
    })
    .await?;

    let messages: Vec<MessageView> = message_rows
        .into_iter()
        .map(|row| views::message_view(row, viewer.0))
        .collect();

    Ok(Json(BoxDetailResponse {
        topic_box: views::topic_box(box_row),
        messages,
    }))
}

/// Post into a box. The sender is recorded only for a signed-in caller who
/// did not ask for anonymity.
pub async fn create_message(
    State(state): State<AppState>,
    Path(box_id): Path<String>,
    Extension(viewer): Extension<Viewer>,
    payload: Result<Json<CreateMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let box_id = parse_id(&box_id, "box")?.to_string();
    let Json(req) = payload?;

    if req.content.trim().is_empty() || req.content.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::Validation(format!(
            "Message content must be 1-{} characters",
            MAX_MESSAGE_LEN
        )));
    }

    let sender_id = match viewer.0 {
        Some(user) if !req.is_anonymous => Some(user.user_id.to_string()),
        _ => None,
    };
    // Without a resolvable sender the message is anonymous whatever was asked.
    let is_anonymous = sender_id.is_none();

    let message_id = blocking(move || {
        state
            .db
            .find_box(&box_id)
            .map_err(|e| AppError::store("Failed to fetch box", e))?
            .ok_or_else(|| AppError::NotFound("Box not found".into()))?;

        state
            .db
            .insert_message(&NewMessage {
                box_id: &box_id,
                sender_id: sender_id.as_deref(),
                content: &req.content,
                is_anonymous,
            })
            .map_err(|e| AppError::store("Failed to create message", e))
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Message created successfully".into(),
            id: message_id,
        }),
    ))
}
