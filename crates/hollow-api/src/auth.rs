use std::sync::Arc;

use axum::{Json, extract::State, extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse};
use tracing::{error, info, warn};
use uuid::Uuid;

use hollow_db::{Database, NewUser, UserFilter, is_unique_violation};
use hollow_types::api::{CreatedResponse, LoginRequest, LoginResponse, RegisterRequest};
use hollow_types::models::UserPublic;

use crate::error::{AppError, blocking};
use crate::password::CredentialHasher;
use crate::token::TokenService;

pub type AppState = Arc<AppStateInner>;

/// Process-wide state, built once at startup and shared read-only.
pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenService,
    pub hasher: CredentialHasher,
}

pub const MIN_PASSWORD_LEN: usize = 6;
const MAX_EMAIL_LEN: usize = 254;

/// 1x1 transparent PNG given to every new account.
pub const DEFAULT_AVATAR: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;

    let email = req.email.trim().to_string();
    if !is_valid_email(&email) {
        return Err(AppError::Validation("Invalid email address".into()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    // Check-then-insert; the UNIQUE index catches whatever slips between the two.
    let db = state.clone();
    let lookup = email.clone();
    let existing = blocking(move || {
        db.db
            .find_user(UserFilter::ByEmail(&lookup))
            .map_err(|e| AppError::store("Failed to check email", e))
    })
    .await?;
    if existing.is_some() {
        return Err(email_taken());
    }

    let hasher = state.hasher.clone();
    let password = req.password;
    let password_hash = blocking(move || hasher.hash(&password).map_err(AppError::from)).await?;

    let db = state.clone();
    let new_email = email.clone();
    let user_id = blocking(move || {
        db.db
            .insert_user(&NewUser {
                email: &new_email,
                password_hash: &password_hash,
                avatar: DEFAULT_AVATAR,
            })
            .map_err(|e| {
                if is_unique_violation(&e) {
                    email_taken()
                } else {
                    AppError::store("Failed to create user", e)
                }
            })
    })
    .await?;

    info!(%user_id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "User registered successfully".into(),
            id: user_id,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let email = req.email.trim().to_string();

    let db = state.clone();
    let user = blocking(move || {
        db.db
            .find_user(UserFilter::ByEmail(&email))
            .map_err(|e| AppError::store("Failed to load user", e))
    })
    .await?;

    // Unknown emails still pay for a full hash so both failures look alike.
    let hasher = state.hasher.clone();
    let password = req.password;
    let digest = user.as_ref().map(|u| u.password.clone());
    let verified = blocking(move || {
        let checked = match digest {
            Some(digest) => hasher.verify(&password, &digest),
            None => hasher.verify_decoy(&password),
        };
        checked.map_err(AppError::from)
    })
    .await?;

    let user = match user {
        Some(user) if verified => user,
        Some(user) => {
            warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(AppError::invalid_credentials());
        }
        None => {
            warn!("Login failed: unknown email");
            return Err(AppError::invalid_credentials());
        }
    };

    let user_id: Uuid = user.id.parse().map_err(|e| {
        error!("Corrupt user id '{}': {}", user.id, e);
        AppError::Internal("Failed to generate token".into())
    })?;

    let token = state.tokens.issue(user_id).map_err(|e| {
        error!("Token issuance failed: {}", e);
        AppError::Internal("Failed to generate token".into())
    })?;

    Ok(Json(LoginResponse {
        token,
        user: UserPublic {
            id: user_id,
            email: user.email,
            avatar: user.avatar,
        },
    }))
}

fn email_taken() -> AppError {
    AppError::Validation("Email already exists".into())
}

/// Shape check only: one `@`, non-empty local part, dotted domain.
fn is_valid_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.split('.').count() >= 2
                && domain.split('.').all(|label| !label.is_empty())
        }
        None => false,
    }
}
