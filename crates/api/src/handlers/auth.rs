//! Handlers for the `/auth` resource (register, login, logout, password, me).

use std::borrow::Cow;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
use warden_core::credentials::{validate_password_strength, validate_username};
use warden_core::error::CoreError;
use warden_core::types::{DbId, Timestamp};
use warden_db::models::user::{CreateUser, User, UserResponse};
use warden_db::repositories::UserRepo;

use crate::auth::password::{hash_password_async, verify_password_async};
use crate::error::{AppError, AppResult, EMAIL_IN_USE, USERNAME_TAKEN};
use crate::middleware::auth::AuthUser;
use crate::middleware::client::ClientFingerprint;
use crate::response::DataResponse;
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid username or password";
const ACCOUNT_DEACTIVATED: &str = "Account is deactivated";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(custom(function = "username_rules"))]
    pub username: String,
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,
    #[validate(custom(function = "password_rules"))]
    pub password: String,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Request body for `PUT /auth/password`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(custom(function = "password_rules"))]
    pub new_password: String,
    #[validate(must_match(other = "new_password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

/// Returned by register and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub id: DbId,
    pub username: String,
    pub email: String,
    /// Session token to present as `Authorization: Bearer <token>`.
    pub token: String,
    pub is_active: bool,
    pub created_at: Timestamp,
}

impl AuthResponse {
    fn new(user: &User, token: String) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            token,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

/// Returned by logout.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: &'static str,
}

/// Returned by a successful password change.
#[derive(Debug, Serialize)]
pub struct PasswordChangedResponse {
    pub message: &'static str,
    /// Replacement session token for the calling device.
    pub token: String,
}

// ---------------------------------------------------------------------------
// Field rules
// ---------------------------------------------------------------------------

fn core_rule(code: &'static str, result: Result<(), CoreError>) -> Result<(), ValidationError> {
    result.map_err(|e| {
        let message = match e {
            CoreError::Validation(msg) => msg,
            other => other.to_string(),
        };
        ValidationError::new(code).with_message(Cow::Owned(message))
    })
}

fn username_rules(username: &str) -> Result<(), ValidationError> {
    core_rule("username", validate_username(username))
}

fn password_rules(password: &str) -> Result<(), ValidationError> {
    core_rule("password", validate_password_strength(password))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Create an account and issue its first session for the calling device.
pub async fn register(
    State(state): State<AppState>,
    ClientFingerprint(client): ClientFingerprint,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<AuthResponse>>)> {
    input.validate()?;

    if let Some(existing) =
        UserRepo::find_by_username_or_email(&state.pool, &input.username, &input.email).await?
    {
        let message = if existing.email.eq_ignore_ascii_case(&input.email) {
            EMAIL_IN_USE
        } else {
            USERNAME_TAKEN
        };
        return Err(AppError::Core(CoreError::Conflict(message.into())));
    }

    let password_hash = hash_password_async(input.password).await?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username: input.username,
            email: input.email,
            password_hash,
        },
    )
    .await?;

    let token = state.sessions.create_or_refresh(user.id, &client).await?;
    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: AuthResponse::new(&user, token),
        }),
    ))
}

/// POST /api/v1/auth/login
///
/// Authenticate with username + password. Repeated logins from the same
/// device return the same token.
pub async fn login(
    State(state): State<AppState>,
    ClientFingerprint(client): ClientFingerprint,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<DataResponse<AuthResponse>>> {
    input.validate()?;

    // 1. Find user by username.
    let user = UserRepo::find_by_username(&state.pool, &input.username)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized(INVALID_CREDENTIALS.into())))?;

    // 2. Verify password.
    if !verify_password_async(input.password, user.password_hash.clone()).await? {
        return Err(AppError::Core(CoreError::Unauthorized(
            INVALID_CREDENTIALS.into(),
        )));
    }

    // 3. Check if the account is active.
    if !user.is_active {
        return Err(AppError::Core(CoreError::Unauthorized(
            ACCOUNT_DEACTIVATED.into(),
        )));
    }

    // 4. Drop this user's dead sessions before matching.
    state.sessions.purge_expired_for_user(user.id).await;

    // 5. Reuse or issue a session for this device.
    UserRepo::record_successful_login(&state.pool, user.id).await?;
    let token = state.sessions.create_or_refresh(user.id, &client).await?;
    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(DataResponse {
        data: AuthResponse::new(&user, token),
    }))
}

/// DELETE /api/v1/auth/logout
///
/// Delete the presented session. Other devices stay logged in.
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<LogoutResponse>>> {
    state
        .sessions
        .logout(auth.user.id, &auth.session.token)
        .await?;

    Ok(Json(DataResponse {
        data: LogoutResponse {
            success: true,
            message: "Logout successful",
        },
    }))
}

/// PUT /api/v1/auth/password
///
/// Change the password, revoke every session of the account and issue a new
/// one for the calling device.
pub async fn update_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ClientFingerprint(client): ClientFingerprint,
    Json(input): Json<UpdatePasswordRequest>,
) -> AppResult<Json<DataResponse<PasswordChangedResponse>>> {
    input.validate()?;
    let user_id = auth.user.id;

    let current_valid =
        verify_password_async(input.current_password.clone(), auth.user.password_hash.clone())
            .await?;
    if !current_valid {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Current password is incorrect".into(),
        )));
    }

    if input.new_password == input.current_password {
        return Err(AppError::BadRequest(
            "New password must be different from the current password".into(),
        ));
    }

    let password_hash = hash_password_async(input.new_password).await?;
    if !UserRepo::update_password(&state.pool, user_id, &password_hash).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: user_id,
        }));
    }

    // Revoke first so the replacement session survives.
    state.sessions.invalidate_all(user_id).await?;
    let token = state.sessions.create_or_refresh(user_id, &client).await?;
    tracing::info!(user_id, "Password changed, sessions rotated");

    Ok(Json(DataResponse {
        data: PasswordChangedResponse {
            message: "Password updated successfully",
            token,
        },
    }))
}

/// GET /api/v1/auth/me
pub async fn me(auth: AuthUser) -> Json<DataResponse<UserResponse>> {
    Json(DataResponse {
        data: UserResponse::from(&auth.user),
    })
}
