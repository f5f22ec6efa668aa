//! Repository for the `bookings` table.

use servicedesk_core::types::DbId;
use sqlx::PgPool;

use crate::models::booking::{
    AssignedStaff, Booking, BookingDetail, BookingExportRow, BookingScope, CreateBooking,
};
use crate::models::chat::Chat;

const COLUMNS: &str = "id, customer_id, service_id, status, assigned_staff_id, \
                       scheduled_date, notes, created_at, updated_at";

/// Column list for [`BookingDetail`] queries over `bookings b`.
const DETAIL_COLUMNS: &str = "b.id, b.customer_id, b.service_id, b.status, \
     b.assigned_staff_id, b.scheduled_date, b.notes, b.created_at, b.updated_at, \
     s.name AS service_name, c.name AS customer_name, c.email AS customer_email, \
     c.phone AS customer_phone, st.name AS assigned_staff_name";

const DETAIL_JOINS: &str = "FROM bookings b \
     JOIN services s ON s.id = b.service_id \
     JOIN users c ON c.id = b.customer_id \
     LEFT JOIN users st ON st.id = b.assigned_staff_id";

const CHAT_COLUMNS: &str = "id, booking_id, is_open, closed_at, created_at";

/// Provides CRUD operations for bookings.
pub struct BookingRepo;

impl BookingRepo {
    /// Insert a booking and its open chat in one transaction.
    pub async fn create_with_chat(
        pool: &PgPool,
        input: &CreateBooking,
    ) -> Result<(Booking, Chat), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let insert_booking = format!(
            "INSERT INTO bookings (customer_id, service_id, scheduled_date, notes)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        let booking = sqlx::query_as::<_, Booking>(&insert_booking)
            .bind(input.customer_id)
            .bind(input.service_id)
            .bind(input.scheduled_date)
            .bind(&input.notes)
            .fetch_one(&mut *tx)
            .await?;

        let insert_chat =
            format!("INSERT INTO chats (booking_id) VALUES ($1) RETURNING {CHAT_COLUMNS}");
        let chat = sqlx::query_as::<_, Chat>(&insert_chat)
            .bind(booking.id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((booking, chat))
    }

    /// Find a booking by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Booking>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM bookings WHERE id = $1");
        sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a booking with service, customer and primary staff names.
    pub async fn find_detail(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<BookingDetail>, sqlx::Error> {
        let query = format!("SELECT {DETAIL_COLUMNS} {DETAIL_JOINS} WHERE b.id = $1");
        sqlx::query_as::<_, BookingDetail>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List bookings visible in `scope`, newest first, optionally by status.
    pub async fn list_details(
        pool: &PgPool,
        scope: BookingScope,
        status: Option<&str>,
    ) -> Result<Vec<BookingDetail>, sqlx::Error> {
        let query = format!(
            "SELECT {DETAIL_COLUMNS} {DETAIL_JOINS}
             WHERE ($1::BIGINT IS NULL OR b.customer_id = $1)
               AND ($2::BIGINT IS NULL
                    OR b.assigned_staff_id = $2
                    OR EXISTS (SELECT 1 FROM tasks t WHERE t.booking_id = b.id AND t.staff_id = $2))
               AND ($3::TEXT IS NULL OR b.status = $3)
             ORDER BY b.created_at DESC, b.id DESC"
        );
        sqlx::query_as::<_, BookingDetail>(&query)
            .bind(scope.customer_id)
            .bind(scope.staff_id)
            .bind(status)
            .fetch_all(pool)
            .await
    }

    /// Set the booking status.
    ///
    /// Returns `None` if the booking does not exist or already has `status`,
    /// so of several concurrent writers of the same status exactly one sees
    /// the row.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        status: &str,
    ) -> Result<Option<Booking>, sqlx::Error> {
        let query = format!(
            "UPDATE bookings SET status = $2
             WHERE id = $1 AND status <> $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .bind(status)
            .fetch_optional(pool)
            .await
    }

    /// Set or clear the primary assignee.
    pub async fn set_primary_staff(
        pool: &PgPool,
        id: DbId,
        staff_id: Option<DbId>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE bookings SET assigned_staff_id = $2 WHERE id = $1")
            .bind(id)
            .bind(staff_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Whether `staff_id` holds a task on the booking or is its primary assignee.
    pub async fn is_assigned(
        pool: &PgPool,
        booking_id: DbId,
        staff_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                 SELECT 1 FROM bookings WHERE id = $1 AND assigned_staff_id = $2
                 UNION ALL
                 SELECT 1 FROM tasks WHERE booking_id = $1 AND staff_id = $2
             )",
        )
        .bind(booking_id)
        .bind(staff_id)
        .fetch_one(pool)
        .await
    }

    /// Staff attached to a booking: task holders in assignment order, then
    /// the primary assignee if they hold no task.
    pub async fn assigned_staff(
        pool: &PgPool,
        booking_id: DbId,
    ) -> Result<Vec<AssignedStaff>, sqlx::Error> {
        sqlx::query_as::<_, AssignedStaff>(
            "SELECT u.id AS staff_id, u.name, u.email, t.id AS task_id,
                    t.status AS task_status,
                    (b.assigned_staff_id IS NOT DISTINCT FROM u.id) AS is_primary
             FROM tasks t
             JOIN users u ON u.id = t.staff_id
             JOIN bookings b ON b.id = t.booking_id
             WHERE t.booking_id = $1
             UNION ALL
             SELECT u.id, u.name, u.email, NULL, NULL, true
             FROM bookings b
             JOIN users u ON u.id = b.assigned_staff_id
             WHERE b.id = $1
               AND NOT EXISTS (
                   SELECT 1 FROM tasks t WHERE t.booking_id = b.id AND t.staff_id = u.id
               )
             ORDER BY task_id NULLS LAST",
        )
        .bind(booking_id)
        .fetch_all(pool)
        .await
    }

    /// All bookings with display names for the CSV export, newest first.
    pub async fn list_for_export(pool: &PgPool) -> Result<Vec<BookingExportRow>, sqlx::Error> {
        sqlx::query_as::<_, BookingExportRow>(
            "SELECT b.id, c.name AS customer_name, c.email AS customer_email,
                    s.name AS service_name, b.status,
                    COALESCE(
                        (SELECT string_agg(u.name, '; ' ORDER BY t.created_at, t.id)
                         FROM tasks t JOIN users u ON u.id = t.staff_id
                         WHERE t.booking_id = b.id),
                        st.name
                    ) AS assigned_staff,
                    b.scheduled_date, b.notes, b.created_at
             FROM bookings b
             JOIN services s ON s.id = b.service_id
             JOIN users c ON c.id = b.customer_id
             LEFT JOIN users st ON st.id = b.assigned_staff_id
             ORDER BY b.created_at DESC, b.id DESC",
        )
        .fetch_all(pool)
        .await
    }
}
