use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};

use crate::auth::{self, AppState};
use crate::middleware::{optional_auth, require_auth};
use crate::users::MAX_AVATAR_SIZE;
use crate::{boxes, likes, users};

/// Multipart framing on top of the avatar bytes.
const AVATAR_BODY_OVERHEAD: usize = 64 * 1024;

/// Full API router. Transport layers (CORS, tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/boxes", get(boxes::list_boxes))
        .route("/api/users/{user_id}/avatar", get(users::get_avatar));

    // Work anonymously, but see the caller when a valid token is sent.
    let viewer_routes = Router::new()
        .route("/api/boxes/{box_id}", get(boxes::get_box))
        .route("/api/boxes/{box_id}/messages", post(boxes::create_message))
        .route_layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    let protected_routes = Router::new()
        .route("/api/boxes", post(boxes::create_box))
        .route("/api/messages/{message_id}/like", post(likes::toggle_like))
        .route(
            "/api/users/avatar",
            post(users::upload_avatar)
                .layer(DefaultBodyLimit::max(MAX_AVATAR_SIZE + AVATAR_BODY_OVERHEAD)),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(viewer_routes)
        .merge(protected_routes)
        .with_state(state)
}
