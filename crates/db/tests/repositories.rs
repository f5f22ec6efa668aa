//! Repository behaviour against a migrated database.

use assert_matches::assert_matches;
use chrono::NaiveDate;
use servicedesk_db::models::booking::CreateBooking;
use servicedesk_db::models::leave_request::CreateLeaveRequest;
use servicedesk_db::models::message::CreateMessage;
use servicedesk_db::models::service::CreateService;
use servicedesk_db::models::user::{CreateUser, User};
use servicedesk_db::repositories::{
    BookingRepo, ChatRepo, LeaveRequestRepo, MessageRepo, ReviewOutcome, ServiceRepo,
    SettingRepo, TaskRepo, UserRepo,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn user(pool: &PgPool, name: &str, role: &str) -> User {
    let input = CreateUser {
        name: name.to_string(),
        email: format!("{name}@test.com"),
        phone: None,
        password_hash: "not-a-real-hash".to_string(),
        role: role.to_string(),
        is_approved: true,
    };
    UserRepo::create(pool, &input).await.unwrap()
}

/// A customer, a service and one booking; returns (customer, booking id, chat id).
async fn booking(pool: &PgPool) -> (User, i64, i64) {
    let customer = user(pool, "customer", "customer").await;
    let service = ServiceRepo::create(
        pool,
        &CreateService {
            name: "Network Setup".into(),
            description: None,
            price: 80.0,
            duration_minutes: None,
            is_active: None,
        },
    )
    .await
    .unwrap();

    let (booking, chat) = BookingRepo::create_with_chat(
        pool,
        &CreateBooking {
            customer_id: customer.id,
            service_id: service.id,
            scheduled_date: None,
            notes: None,
        },
    )
    .await
    .unwrap();
    (customer, booking.id, chat.id)
}

fn text_message(chat_id: i64, sender_id: i64, content: &str) -> CreateMessage {
    CreateMessage {
        chat_id,
        sender_id,
        content: content.to_string(),
        is_private: false,
        is_quotation: false,
        quotation_amount: None,
        attachment_url: None,
        attachment_type: None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_booking_starts_pending_with_open_chat(pool: PgPool) {
    let (_, booking_id, chat_id) = booking(&pool).await;

    let stored = BookingRepo::find_by_id(&pool, booking_id).await.unwrap().unwrap();
    assert_eq!(stored.status, "pending");
    assert!(stored.assigned_staff_id.is_none());

    let chat = ChatRepo::find_by_booking(&pool, booking_id).await.unwrap().unwrap();
    assert_eq!(chat.id, chat_id);
    assert!(chat.is_open);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_status_update_applies_once(pool: PgPool) {
    let (_, booking_id, _) = booking(&pool).await;

    let first = BookingRepo::update_status(&pool, booking_id, "completed")
        .await
        .unwrap();
    assert_eq!(first.unwrap().status, "completed");

    let second = BookingRepo::update_status(&pool, booking_id, "completed")
        .await
        .unwrap();
    assert!(second.is_none());

    let missing = BookingRepo::update_status(&pool, booking_id + 1000, "completed")
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_one_task_per_staff_and_booking(pool: PgPool) {
    let (_, booking_id, _) = booking(&pool).await;
    let staff = user(&pool, "staff", "staff").await;

    let first = TaskRepo::create_for_staff(&pool, booking_id, staff.id, "Fix it").await.unwrap();
    assert!(first.is_some());
    let second = TaskRepo::create_for_staff(&pool, booking_id, staff.id, "Fix it").await.unwrap();
    assert!(second.is_none());

    assert_eq!(TaskRepo::list_for_booking(&pool, booking_id).await.unwrap().len(), 1);
    assert!(BookingRepo::is_assigned(&pool, booking_id, staff.id).await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_closed_chat_accepts_no_messages(pool: PgPool) {
    let (customer, _, chat_id) = booking(&pool).await;

    let sent = MessageRepo::create_if_open(&pool, &text_message(chat_id, customer.id, "hi"))
        .await
        .unwrap();
    assert!(sent.is_some());

    let closed = ChatRepo::close(&pool, chat_id).await.unwrap().unwrap();
    assert!(closed.closed_at.is_some());
    assert!(ChatRepo::close(&pool, chat_id).await.unwrap().is_none());

    let rejected = MessageRepo::create_if_open(&pool, &text_message(chat_id, customer.id, "late"))
        .await
        .unwrap();
    assert!(rejected.is_none());
    assert_eq!(MessageRepo::list_for_chat(&pool, chat_id).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_bulk_delete_cascades_to_bookings(pool: PgPool) {
    let (customer, booking_id, chat_id) = booking(&pool).await;
    MessageRepo::create_if_open(&pool, &text_message(chat_id, customer.id, "hi"))
        .await
        .unwrap();

    let deleted = UserRepo::bulk_delete(&pool, &[customer.id]).await.unwrap();
    assert_eq!(deleted, 1);
    assert!(BookingRepo::find_by_id(&pool, booking_id).await.unwrap().is_none());
    assert!(ChatRepo::find_by_id(&pool, chat_id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_unique_email_is_case_insensitive_on_lookup(pool: PgPool) {
    user(&pool, "Jane", "customer").await;
    let found = UserRepo::find_by_email(&pool, "JANE@TEST.COM").await.unwrap();
    assert!(found.is_some());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_leave_review_respects_quota(pool: PgPool) {
    let staff = user(&pool, "staff", "staff").await;
    let create = |days: i32| CreateLeaveRequest {
        user_id: staff.id,
        leave_type: "annual".into(),
        start_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
        days,
        reason: "Rest".into(),
    };

    let big = LeaveRequestRepo::create(&pool, &create(10)).await.unwrap();
    let second = LeaveRequestRepo::create(&pool, &create(5)).await.unwrap();

    let outcome = LeaveRequestRepo::review(&pool, big.id, "approved", staff.id, 10).await.unwrap();
    assert_matches!(outcome, ReviewOutcome::Reviewed(r) if r.status == "approved");

    let outcome = LeaveRequestRepo::review(&pool, second.id, "approved", staff.id, 5).await.unwrap();
    assert_matches!(outcome, ReviewOutcome::InsufficientQuota);

    let outcome = LeaveRequestRepo::review(&pool, big.id, "rejected", staff.id, 0).await.unwrap();
    assert_matches!(outcome, ReviewOutcome::AlreadyReviewed);

    let refreshed = UserRepo::find_by_id(&pool, staff.id).await.unwrap().unwrap();
    assert_eq!(refreshed.leave_quota_used, 10);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_settings_upsert_replaces_values(pool: PgPool) {
    let key = "notifications.smtp_host".to_string();
    SettingRepo::upsert_many(&pool, &[(key.clone(), "a.example.com".into())]).await.unwrap();
    SettingRepo::upsert_many(&pool, &[(key.clone(), "b.example.com".into())]).await.unwrap();

    let stored = SettingRepo::list_by_prefix(&pool, "notifications.").await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].key, key);
    assert_eq!(stored[0].value, "b.example.com");
}
