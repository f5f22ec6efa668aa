//! Booking entity model, joined views and DTOs.

use serde::{Deserialize, Serialize};
use servicedesk_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `bookings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Booking {
    pub id: DbId,
    pub customer_id: DbId,
    pub service_id: DbId,
    pub status: String,
    /// Primary assignee; other assignees are known only through their tasks.
    pub assigned_staff_id: Option<DbId>,
    pub scheduled_date: Option<Timestamp>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A booking joined with the names the API and exports display.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BookingDetail {
    pub id: DbId,
    pub customer_id: DbId,
    pub service_id: DbId,
    pub status: String,
    pub assigned_staff_id: Option<DbId>,
    pub scheduled_date: Option<Timestamp>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub service_name: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub assigned_staff_name: Option<String>,
}

/// DTO for creating a booking on behalf of a customer.
#[derive(Debug, Deserialize)]
pub struct CreateBooking {
    pub customer_id: DbId,
    pub service_id: DbId,
    pub scheduled_date: Option<Timestamp>,
    pub notes: Option<String>,
}

/// One staff member attached to a booking.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AssignedStaff {
    pub staff_id: DbId,
    pub name: String,
    pub email: String,
    pub task_id: Option<DbId>,
    pub task_status: Option<String>,
    pub is_primary: bool,
}

/// One record of the bookings CSV export.
#[derive(Debug, Clone, FromRow)]
pub struct BookingExportRow {
    pub id: DbId,
    pub customer_name: String,
    pub customer_email: String,
    pub service_name: String,
    pub status: String,
    /// Task holders' names in assignment order, `; `-separated.
    pub assigned_staff: Option<String>,
    pub scheduled_date: Option<Timestamp>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
}

/// Visibility scope for booking lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct BookingScope {
    /// Restrict to bookings owned by this customer.
    pub customer_id: Option<DbId>,
    /// Restrict to bookings this staff member holds a task on or is primary for.
    pub staff_id: Option<DbId>,
}
