//! Route definitions for `/tasks`.

use axum::routing::{get, patch};
use axum::Router;

use crate::handlers::task;
use crate::state::AppState;

/// Routes mounted at `/tasks`.
///
/// ```text
/// GET    /                          -> list_tasks (staff: own, admin: all)
/// POST   /                          -> create_task (admin)
/// PATCH  /{id}                      -> update_task
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(task::list_tasks).post(task::create_task))
        .route("/{id}", patch(task::update_task))
}
