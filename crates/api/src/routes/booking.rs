//! Route definitions for the `/bookings` resource.

use axum::routing::{delete, get, patch, post};
use axum::Router;

use crate::handlers::booking;
use crate::state::AppState;

/// Routes mounted at `/bookings`.
///
/// ```text
/// GET    /                          -> list_bookings
/// POST   /                          -> create_booking (customer)
/// GET    /export                    -> export_bookings (admin, CSV)
/// GET    /{id}                      -> get_booking
/// PATCH  /{id}/status               -> update_status
/// POST   /{id}/assign               -> assign_staff (admin)
/// DELETE /{id}/staff/{staff_id}     -> remove_staff (admin)
/// GET    /{id}/assigned-staff       -> assigned_staff
/// GET    /{id}/chat                 -> get_booking_chat
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(booking::list_bookings).post(booking::create_booking),
        )
        .route("/export", get(booking::export_bookings))
        .route("/{id}", get(booking::get_booking))
        .route("/{id}/status", patch(booking::update_status))
        .route("/{id}/assign", post(booking::assign_staff))
        .route("/{id}/staff/{staff_id}", delete(booking::remove_staff))
        .route("/{id}/assigned-staff", get(booking::assigned_staff))
        .route("/{id}/chat", get(booking::get_booking_chat))
}
