//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose account does
//! not meet the requirement. Approval is read from the database on every
//! request so an admin's decision takes effect without a new token.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use servicedesk_core::error::CoreError;
use servicedesk_core::roles::{ROLE_ADMIN, ROLE_STAFF};
use servicedesk_db::repositories::UserRepo;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Message returned to users whose account has not been approved yet.
pub const PENDING_APPROVAL_MESSAGE: &str = "Account is pending approval";

/// Requires an approved account. Admins always pass.
///
/// ```ignore
/// async fn approved_only(RequireApproved(user): RequireApproved) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireApproved(pub AuthUser);

impl FromRequestParts<AppState> for RequireApproved {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        ensure_approved(state, &user).await?;
        Ok(RequireApproved(user))
    }
}

/// Requires an approved `staff` user or an `admin`. Rejects with 403 otherwise.
pub struct RequireStaff(pub AuthUser);

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_ADMIN && user.role != ROLE_STAFF {
            return Err(AppError::Core(CoreError::Forbidden(
                "Staff or Admin role required".into(),
            )));
        }
        ensure_approved(state, &user).await?;
        Ok(RequireStaff(user))
    }
}

/// Requires the `admin` role. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn admin_only(RequireAdmin(user): RequireAdmin) -> AppResult<Json<()>> {
///     // user is guaranteed to be an admin here
///     Ok(Json(()))
/// }
/// ```
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_ADMIN {
            return Err(AppError::Core(CoreError::Forbidden(
                "Admin role required".into(),
            )));
        }
        Ok(RequireAdmin(user))
    }
}

async fn ensure_approved(state: &AppState, user: &AuthUser) -> Result<(), AppError> {
    if user.is_admin() {
        return Ok(());
    }
    let row = UserRepo::find_by_id(&state.pool, user.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;
    if !row.is_approved {
        return Err(AppError::Core(CoreError::Forbidden(
            PENDING_APPROVAL_MESSAGE.into(),
        )));
    }
    Ok(())
}
