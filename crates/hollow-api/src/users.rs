use std::path::Path as FsPath;

use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use tracing::{error, info};

use hollow_db::{UserFilter, UserUpdate};
use hollow_types::api::AvatarResponse;

use crate::auth::AppState;
use crate::error::{AppError, blocking};
use crate::middleware::AuthUser;
use crate::views::parse_id;

/// 2 MB upload limit for avatars
pub const MAX_AVATAR_SIZE: usize = 2 * 1024 * 1024;

/// GET /api/users/{user_id}/avatar — raw image bytes with their stored MIME type.
pub async fn get_avatar(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_id(&user_id, "user")?.to_string();

    let user = blocking(move || {
        state
            .db
            .find_user(UserFilter::ById(&user_id))
            .map_err(|e| AppError::store("Failed to fetch user", e))
    })
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let (mime, bytes) = decode_data_url(&user.avatar).ok_or_else(|| {
        error!("Corrupt avatar on user '{}'", user.id);
        AppError::Internal("Failed to decode avatar".into())
    })?;

    Ok(([(header::CONTENT_TYPE, mime)], bytes))
}

/// POST /api/users/avatar — multipart field `avatar`, stored as a data URL.
pub async fn upload_avatar(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("avatar") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await?;
        upload = Some((file_name, data));
        break;
    }

    let (file_name, data) = upload.ok_or_else(|| AppError::Validation("No file uploaded".into()))?;
    let mime = image_content_type(&file_name)
        .ok_or_else(|| AppError::Validation("Only image files are allowed".into()))?;
    if data.is_empty() {
        return Err(AppError::Validation("No file uploaded".into()));
    }
    if data.len() > MAX_AVATAR_SIZE {
        return Err(AppError::Validation(format!(
            "Avatar must be at most {} bytes",
            MAX_AVATAR_SIZE
        )));
    }

    let avatar = format!("data:{};base64,{}", mime, B64.encode(&data));

    let db = state.clone();
    let uid = user.user_id.to_string();
    let stored = avatar.clone();
    let matched = blocking(move || {
        db.db
            .update_user(&uid, UserUpdate::SetAvatar(&stored))
            .map_err(|e| AppError::store("Failed to update avatar", e))
    })
    .await?;
    if !matched {
        return Err(AppError::NotFound("User not found".into()));
    }

    info!(user_id = %user.user_id, size = data.len(), "Avatar updated");

    Ok(Json(AvatarResponse {
        message: "Avatar uploaded successfully".into(),
        avatar,
    }))
}

/// Content type for an accepted image extension; `None` for anything else.
fn image_content_type(file_name: &str) -> Option<&'static str> {
    let ext = FsPath::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// Split `data:<mime>;base64,<payload>` into its MIME type and decoded bytes.
fn decode_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let (mime, payload) = url.strip_prefix("data:")?.split_once(";base64,")?;
    let bytes = B64.decode(payload).ok()?;
    Some((mime.to_string(), bytes))
}
