//! Route definitions for the `/services` catalog.

use axum::routing::get;
use axum::Router;

use crate::handlers::service;
use crate::state::AppState;

/// Routes mounted at `/services`.
///
/// ```text
/// GET    /                          -> list_services
/// POST   /                          -> create_service (admin)
/// GET    /{id}                      -> get_service
/// PUT    /{id}                      -> update_service (admin)
/// DELETE /{id}                      -> delete_service (admin, cascades)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(service::list_services).post(service::create_service),
        )
        .route(
            "/{id}",
            get(service::get_service)
                .put(service::update_service)
                .delete(service::delete_service),
        )
}
