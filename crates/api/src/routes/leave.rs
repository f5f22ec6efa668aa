//! Route definitions for leave requests and balances.

use axum::routing::{get, patch};
use axum::Router;

use crate::handlers::leave;
use crate::state::AppState;

/// Routes mounted at `/leave-requests`.
///
/// ```text
/// GET    /                          -> list_leave_requests
/// POST   /                          -> create_leave_request
/// PATCH  /{id}                      -> review_leave_request (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(leave::list_leave_requests).post(leave::create_leave_request),
        )
        .route("/{id}", patch(leave::review_leave_request))
}

/// `GET /leave-balance`, merged at the API root.
pub fn balance_router() -> Router<AppState> {
    Router::new().route("/leave-balance", get(leave::leave_balance))
}
