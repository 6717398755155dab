use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use hollow_types::api::ErrorResponse;

use crate::auth::AppState;
use crate::token::{TokenError, TokenService};

/// Identity bound to a request by [`require_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// Identity bound by [`optional_auth`]: `None` for anonymous callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Viewer(pub Option<AuthUser>);

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization header is required")]
    MissingCredential,

    #[error("Invalid token format")]
    MalformedCredential,

    #[error(transparent)]
    Token(#[from] TokenError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// The value must be exactly two space-separated parts, the first of which is
/// the literal scheme `Bearer`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?
        .to_str()
        .map_err(|_| AuthError::MalformedCredential)?;

    if value.is_empty() {
        return Err(AuthError::MissingCredential);
    }

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::MalformedCredential),
    }
}

pub fn authenticate(tokens: &TokenService, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
    let token = bearer_token(headers)?;
    let user_id = tokens.validate(token)?;
    Ok(AuthUser { user_id })
}

/// Reject the request with 401 unless it carries a valid bearer token.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = authenticate(&state.tokens, req.headers()).inspect_err(|e| {
        warn!("Rejected {} {}: {}", req.method(), req.uri().path(), e);
    })?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Bind the caller's identity when a valid token is present; otherwise let the
/// request through as anonymous.
pub async fn optional_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let viewer = Viewer(authenticate(&state.tokens, req.headers()).ok());
    req.extensions_mut().insert(viewer);
    next.run(req).await
}
