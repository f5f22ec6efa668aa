//! Handlers for the `/auth` resource (register, login, me).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use servicedesk_core::error::CoreError;
use servicedesk_core::notifications::KIND_APPROVAL;
use servicedesk_core::roles::{validate_role, ROLE_ADMIN, ROLE_CUSTOMER};
use servicedesk_db::models::user::{CreateUser, UserResponse};
use servicedesk_db::repositories::UserRepo;
use servicedesk_events::bus::AUTH_LOGIN;
use servicedesk_events::{InAppNotice, Notice, PlatformEvent};
use validator::Validate;

use crate::auth::jwt::issue_access_token;
use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 200, message = "must not be empty"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,
    pub phone: Option<String>,
    /// `customer` (default) or `staff`.
    pub role: Option<String>,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful authentication response.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Self-registration for customers and staff. Staff accounts start
/// unapproved and every admin is told about them.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let role = input
        .role
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(ROLE_CUSTOMER)
        .to_ascii_lowercase();
    validate_role(&role).map_err(AppError::BadRequest)?;
    if role == ROLE_ADMIN {
        return Err(AppError::Core(CoreError::Forbidden(
            "Admin accounts cannot be self-registered".into(),
        )));
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let is_approved = role == ROLE_CUSTOMER && state.config.auto_approve_customers;
    let create = CreateUser {
        name: input.name.trim().to_string(),
        email: input.email.trim().to_ascii_lowercase(),
        phone: input.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
        password_hash,
        role: role.clone(),
        is_approved,
    };
    let user = UserRepo::create(&state.pool, &create).await?;

    tracing::info!(user_id = user.id, role = %user.role, is_approved, "User registered");

    if !is_approved {
        for admin in UserRepo::list(&state.pool, Some(ROLE_ADMIN)).await? {
            let notice = InAppNotice::new(
                KIND_APPROVAL,
                "Account awaiting approval",
                format!("{} ({}) registered as {role}", user.name, user.email),
            );
            state.notifier.notify(Notice::to(&admin).in_app(notice)).await;
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UserResponse::from(user),
        }),
    ))
}

/// POST /api/v1/auth/login
///
/// Authenticate with email + password. Returns an access token.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<DataResponse<AuthResponse>>> {
    let invalid = || {
        AppError::Core(CoreError::Unauthorized(
            "Invalid email or password".into(),
        ))
    };

    let user = UserRepo::find_by_email(&state.pool, input.email.trim())
        .await?
        .ok_or_else(invalid)?;

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        return Err(invalid());
    }

    let issued = issue_access_token(user.id, &user.role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    state.event_bus.publish(
        PlatformEvent::new(AUTH_LOGIN)
            .with_source("user", user.id)
            .with_actor(user.id),
    );

    Ok(Json(DataResponse {
        data: AuthResponse {
            access_token: issued.token,
            token_type: "Bearer",
            expires_in: issued.expires_in,
            user: UserResponse::from(user),
        },
    }))
}

/// GET /api/v1/auth/me
///
/// Return the authenticated user's profile.
pub async fn me(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;
    Ok(Json(DataResponse {
        data: UserResponse::from(user),
    }))
}
