//! Booking lifecycle over HTTP: creation, assignment, auto-transitions,
//! staff removal and CSV export.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::Router;
use common::{
    body_json, body_text, delete_auth, get_auth, patch_json_auth, post_json_auth,
    RecordingChannel,
};
use servicedesk_core::notifications::{KIND_BOOKING, KIND_TASK};
use servicedesk_db::models::user::User;
use servicedesk_db::repositories::{ChatRepo, NotificationRepo, TaskRepo};
use servicedesk_events::NotificationChannel;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Fixture {
    admin: User,
    customer: User,
    staff_one: User,
    staff_two: User,
    booking_id: i64,
    chat_id: i64,
}

/// An admin, a customer with one pending booking, and two approved staff.
async fn setup(pool: &PgPool) -> Fixture {
    let admin = common::create_admin(pool).await;
    let customer = common::create_customer(pool, "Jane Doe").await;
    let staff_one = common::create_staff(pool, "Sam One").await;
    let staff_two = common::create_staff(pool, "Sam Two").await;
    let service = common::create_service(pool, "Network Setup").await;

    let app = common::build_test_app(pool.clone());
    let body = serde_json::json!({ "service_id": service.id, "notes": "Office wifi" });
    let response = post_json_auth(app, "/api/v1/bookings", &common::token_for(&customer), body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;

    Fixture {
        admin,
        customer,
        staff_one,
        staff_two,
        booking_id: json["data"]["booking"]["id"].as_i64().unwrap(),
        chat_id: json["data"]["chat"]["id"].as_i64().unwrap(),
    }
}

async fn assign(pool: &PgPool, f: &Fixture, staff_ids: &[i64]) -> serde_json::Value {
    let app = common::build_test_app(pool.clone());
    let body = serde_json::json!({ "staff_ids": staff_ids, "description": "Fix the wifi" });
    let response = post_json_auth(
        app,
        &format!("/api/v1/bookings/{}/assign", f.booking_id),
        &common::token_for(&f.admin),
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

async fn booking_status(pool: &PgPool, f: &Fixture) -> String {
    let app = common::build_test_app(pool.clone());
    let response = get_auth(
        app,
        &format!("/api/v1/bookings/{}", f.booking_id),
        &common::token_for(&f.admin),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    json["data"]["booking"]["status"].as_str().unwrap().to_string()
}

async fn complete_task(pool: &PgPool, staff: &User, task_id: i64) {
    let app = common::build_test_app(pool.clone());
    let body = serde_json::json!({ "status": "completed" });
    let response = task_update(app, staff, task_id, body).await;
    assert_eq!(response.status(), StatusCode::OK);
}

async fn task_update(
    app: Router,
    staff: &User,
    task_id: i64,
    body: serde_json::Value,
) -> axum::response::Response {
    let uri = format!("/api/v1/tasks/{task_id}");
    patch_json_auth(app, &uri, &common::token_for(staff), body).await
}

/// In-app notices telling the customer their booking completed.
async fn completion_notices(pool: &PgPool, f: &Fixture) -> usize {
    NotificationRepo::list_for_user(pool, f.customer.id, false, 100, 0)
        .await
        .unwrap()
        .iter()
        .filter(|n| n.kind == KIND_BOOKING && n.message.ends_with("is now completed"))
        .count()
}

/// Task id held by `staff` on the fixture booking.
async fn task_of(pool: &PgPool, f: &Fixture, staff: &User) -> i64 {
    TaskRepo::list_for_booking(pool, f.booking_id)
        .await
        .unwrap()
        .iter()
        .find(|t| t.staff_id == staff.id)
        .map(|t| t.id)
        .expect("staff member should hold a task")
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_create_booking_opens_one_chat(pool: PgPool) {
    let f = setup(&pool).await;

    let chat = ChatRepo::find_by_booking(&pool, f.booking_id)
        .await
        .unwrap()
        .expect("booking should have a chat");
    assert_eq!(chat.id, f.chat_id);
    assert!(chat.is_open);
    assert_eq!(booking_status(&pool, &f).await, "pending");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_staff_cannot_create_booking(pool: PgPool) {
    let staff = common::create_staff(&pool, "Sam One").await;
    let service = common::create_service(&pool, "Network Setup").await;
    let app = common::build_test_app(pool);

    let body = serde_json::json!({ "service_id": service.id });
    let response = post_json_auth(app, "/api/v1/bookings", &common::token_for(&staff), body).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_booking_unknown_service_is_404(pool: PgPool) {
    let customer = common::create_customer(&pool, "Jane Doe").await;
    let app = common::build_test_app(pool);

    let body = serde_json::json!({ "service_id": 999_999 });
    let response =
        post_json_auth(app, "/api/v1/bookings", &common::token_for(&customer), body).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_customer_only_sees_own_bookings(pool: PgPool) {
    let f = setup(&pool).await;
    let other = common::create_customer(&pool, "Other Customer").await;

    let app = common::build_test_app(pool.clone());
    let response = get_auth(app, "/api/v1/bookings", &common::token_for(&other)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 0);

    let app = common::build_test_app(pool);
    let response = get_auth(
        app,
        &format!("/api/v1/bookings/{}", f.booking_id),
        &common::token_for(&other),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_worked_example(pool: PgPool) {
    let f = setup(&pool).await;

    // Assign S1, S2: two tasks, S1 primary, both notified.
    let json = assign(&pool, &f, &[f.staff_one.id, f.staff_two.id]).await;
    assert_eq!(json["data"]["created"].as_array().unwrap().len(), 2);
    assert_eq!(json["data"]["primary_staff_id"], f.staff_one.id);

    for staff in [&f.staff_one, &f.staff_two] {
        let notes = NotificationRepo::list_for_user(&pool, staff.id, false, 50, 0)
            .await
            .unwrap();
        assert!(notes.iter().any(|n| n.kind == KIND_TASK && n.booking_id == Some(f.booking_id)));
    }

    // S1 replies: booking moves to in_progress.
    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        &format!("/api/v1/chats/{}/messages", f.chat_id),
        &common::token_for(&f.staff_one),
        serde_json::json!({ "content": "On my way" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(booking_status(&pool, &f).await, "in_progress");

    // Both tasks completed: booking completed and chat closed.
    let tasks = TaskRepo::list_for_booking(&pool, f.booking_id).await.unwrap();
    assert_eq!(tasks.len(), 2);
    for task in &tasks {
        let staff = if task.staff_id == f.staff_one.id {
            &f.staff_one
        } else {
            &f.staff_two
        };
        complete_task(&pool, staff, task.id).await;
    }

    assert_eq!(booking_status(&pool, &f).await, "completed");
    let chat = ChatRepo::find_by_id(&pool, f.chat_id).await.unwrap().unwrap();
    assert!(!chat.is_open);
    assert!(chat.closed_at.is_some());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_overlapping_assignment_creates_one_task_per_staff(pool: PgPool) {
    let f = setup(&pool).await;

    assign(&pool, &f, &[f.staff_one.id]).await;
    let json = assign(&pool, &f, &[f.staff_one.id, f.staff_two.id]).await;

    assert_eq!(json["data"]["created"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"]["already_assigned"], serde_json::json!([f.staff_one.id]));

    let tasks = TaskRepo::list_for_booking(&pool, f.booking_id).await.unwrap();
    assert_eq!(tasks.len(), 2);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_assigning_a_customer_is_rejected(pool: PgPool) {
    let f = setup(&pool).await;
    let app = common::build_test_app(pool);

    let body = serde_json::json!({ "staff_ids": [f.customer.id] });
    let response = post_json_auth(
        app,
        &format!("/api/v1/bookings/{}/assign", f.booking_id),
        &common::token_for(&f.admin),
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_removing_primary_promotes_then_clears(pool: PgPool) {
    let f = setup(&pool).await;
    assign(&pool, &f, &[f.staff_one.id, f.staff_two.id]).await;
    let token = common::token_for(&f.admin);

    let app = common::build_test_app(pool.clone());
    let response = delete_auth(
        app,
        &format!("/api/v1/bookings/{}/staff/{}", f.booking_id, f.staff_one.id),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["tasks_removed"], 1);
    assert_eq!(json["data"]["primary_staff_id"], f.staff_two.id);

    let app = common::build_test_app(pool.clone());
    let response = delete_auth(
        app,
        &format!("/api/v1/bookings/{}/staff/{}", f.booking_id, f.staff_two.id),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["data"]["primary_staff_id"].is_null());

    // Removing someone who is no longer assigned.
    let app = common::build_test_app(pool);
    let response = delete_auth(
        app,
        &format!("/api/v1/bookings/{}/staff/{}", f.booking_id, f.staff_two.id),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_assigned_staff_lists_primary(pool: PgPool) {
    let f = setup(&pool).await;
    assign(&pool, &f, &[f.staff_one.id, f.staff_two.id]).await;

    let app = common::build_test_app(pool);
    let response = get_auth(
        app,
        &format!("/api/v1/bookings/{}/assigned-staff", f.booking_id),
        &common::token_for(&f.customer),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let staff = json["data"].as_array().unwrap();
    assert_eq!(staff.len(), 2);
    let primaries: Vec<_> = staff.iter().filter(|s| s["is_primary"] == true).collect();
    assert_eq!(primaries.len(), 1);
    assert_eq!(primaries[0]["staff_id"], f.staff_one.id);
}

// ---------------------------------------------------------------------------
// Status changes
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_completing_booking_closes_chat(pool: PgPool) {
    let f = setup(&pool).await;
    let app = common::build_test_app(pool.clone());

    let response = patch_json_auth(
        app,
        &format!("/api/v1/bookings/{}/status", f.booking_id),
        &common::token_for(&f.admin),
        serde_json::json!({ "status": "completed" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let chat = ChatRepo::find_by_id(&pool, f.chat_id).await.unwrap().unwrap();
    assert!(!chat.is_open);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_customer_may_only_cancel(pool: PgPool) {
    let f = setup(&pool).await;
    let token = common::token_for(&f.customer);

    let app = common::build_test_app(pool.clone());
    let response = patch_json_auth(
        app,
        &format!("/api/v1/bookings/{}/status", f.booking_id),
        &token,
        serde_json::json!({ "status": "completed" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let app = common::build_test_app(pool.clone());
    let response = patch_json_auth(
        app,
        &format!("/api/v1/bookings/{}/status", f.booking_id),
        &token,
        serde_json::json!({ "status": "cancelled" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(booking_status(&pool, &f).await, "cancelled");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_invalid_status_is_bad_request(pool: PgPool) {
    let f = setup(&pool).await;
    let app = common::build_test_app(pool);

    let response = patch_json_auth(
        app,
        &format!("/api/v1/bookings/{}/status", f.booking_id),
        &common::token_for(&f.admin),
        serde_json::json!({ "status": "archived" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("Invalid booking status"));
}

// ---------------------------------------------------------------------------
// Task completion
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_repeated_task_completion_completes_booking_once(pool: PgPool) {
    let f = setup(&pool).await;
    assign(&pool, &f, &[f.staff_one.id, f.staff_two.id]).await;
    let channel = Arc::new(RecordingChannel::default());
    let channels: Vec<Arc<dyn NotificationChannel>> = vec![channel.clone()];
    let state = common::test_state_with_channels(pool.clone(), channels);

    let one = task_of(&pool, &f, &f.staff_one).await;
    let two = task_of(&pool, &f, &f.staff_two).await;
    for (staff, task_id) in [(&f.staff_one, one), (&f.staff_two, two), (&f.staff_one, one)] {
        let app = common::build_test_app_with_state(state.clone());
        let response =
            task_update(app, staff, task_id, serde_json::json!({ "status": "completed" })).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(booking_status(&pool, &f).await, "completed");
    assert_eq!(completion_notices(&pool, &f).await, 1);

    channel.wait_for(f.customer.id, 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let expected = format!("Booking #{} is now completed", f.booking_id);
    let sent: Vec<String> = channel
        .subjects_for(f.customer.id)
        .into_iter()
        .filter(|s| *s == expected)
        .collect();
    assert_eq!(sent.len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_attachment_update_keeps_reopened_booking_open(pool: PgPool) {
    let f = setup(&pool).await;
    assign(&pool, &f, &[f.staff_one.id]).await;
    let task_id = task_of(&pool, &f, &f.staff_one).await;

    complete_task(&pool, &f.staff_one, task_id).await;
    assert_eq!(booking_status(&pool, &f).await, "completed");

    // Admin reopens the booking; the task itself stays completed.
    let app = common::build_test_app(pool.clone());
    let response = patch_json_auth(
        app,
        &format!("/api/v1/bookings/{}/status", f.booking_id),
        &common::token_for(&f.admin),
        serde_json::json!({ "status": "in_progress" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let app = common::build_test_app(pool.clone());
    let body = serde_json::json!({ "attachments": ["https://cdn.example.com/after.png"] });
    let response = task_update(app, &f.staff_one, task_id, body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "completed");

    assert_eq!(booking_status(&pool, &f).await, "in_progress");
    assert_eq!(completion_notices(&pool, &f).await, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_concurrent_last_completions_complete_booking_once(pool: PgPool) {
    let f = setup(&pool).await;
    assign(&pool, &f, &[f.staff_one.id, f.staff_two.id]).await;
    let one = task_of(&pool, &f, &f.staff_one).await;
    let two = task_of(&pool, &f, &f.staff_two).await;
    let body = serde_json::json!({ "status": "completed" });

    let (first, second) = tokio::join!(
        task_update(common::build_test_app(pool.clone()), &f.staff_one, one, body.clone()),
        task_update(common::build_test_app(pool.clone()), &f.staff_two, two, body),
    );
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);

    assert_eq!(booking_status(&pool, &f).await, "completed");
    assert_eq!(completion_notices(&pool, &f).await, 1);
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_export_is_csv_attachment(pool: PgPool) {
    let f = setup(&pool).await;
    let app = common::build_test_app(pool);

    let response = get_auth(app, "/api/v1/bookings/export", &common::token_for(&f.admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/csv; charset=utf-8");
    assert!(response.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .contains("bookings.csv"));

    let csv = body_text(response).await;
    let lines: Vec<&str> = csv.split("\r\n").filter(|l| !l.is_empty()).collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("id,customer_name"));
    assert!(lines[1].contains("Jane Doe"));
    assert!(lines[1].contains("Network Setup"));
}
