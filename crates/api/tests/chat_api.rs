//! Chat messaging, privacy, closure and transcript export.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use axum::http::StatusCode;
use common::{body_json, body_text, get_auth, post_json_auth, RecordingChannel};
use servicedesk_api::access::load_chat_context;
use servicedesk_api::error::AppError;
use servicedesk_api::lifecycle;
use servicedesk_api::middleware::auth::AuthUser;
use servicedesk_core::chat::MessageDraft;
use servicedesk_core::error::CoreError;
use servicedesk_core::lifecycle::CHAT_CLOSED_MESSAGE;
use servicedesk_core::notifications::KIND_MESSAGE;
use servicedesk_db::models::user::User;
use servicedesk_db::repositories::{ChatRepo, MessageRepo, NotificationRepo};
use servicedesk_events::{Delivery, NotificationChannel, RealtimeEvent, Topic};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Fixture {
    admin: User,
    customer: User,
    staff: User,
    booking_id: i64,
    chat_id: i64,
}

/// A booking whose chat has one assigned staff member.
async fn setup(pool: &PgPool) -> Fixture {
    let admin = common::create_admin(pool).await;
    let customer = common::create_customer(pool, "Jane Doe").await;
    let staff = common::create_staff(pool, "Sam Staff").await;
    let service = common::create_service(pool, "Laptop Repair").await;

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        "/api/v1/bookings",
        &common::token_for(&customer),
        serde_json::json!({ "service_id": service.id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let booking_id = json["data"]["booking"]["id"].as_i64().unwrap();
    let chat_id = json["data"]["chat"]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        &format!("/api/v1/bookings/{booking_id}/assign"),
        &common::token_for(&admin),
        serde_json::json!({ "staff_ids": [staff.id] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    Fixture {
        admin,
        customer,
        staff,
        booking_id,
        chat_id,
    }
}

async fn post(pool: &PgPool, chat_id: i64, user: &User, body: serde_json::Value) -> axum::response::Response {
    let app = common::build_test_app(pool.clone());
    post_json_auth(
        app,
        &format!("/api/v1/chats/{chat_id}/messages"),
        &common::token_for(user),
        body,
    )
    .await
}

fn text_draft(content: &str) -> MessageDraft {
    MessageDraft {
        content: content.into(),
        is_private: false,
        is_quotation: false,
        quotation_amount: None,
        attachment_url: None,
        attachment_type: None,
    }
}

fn auth_user(user: &User) -> AuthUser {
    AuthUser {
        user_id: user.id,
        role: user.role.clone(),
    }
}

// ---------------------------------------------------------------------------
// Privacy
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_customer_never_reads_private_messages(pool: PgPool) {
    let f = setup(&pool).await;

    let response = post(
        &pool,
        f.chat_id,
        &f.staff,
        serde_json::json!({ "content": "Warranty expired", "is_private": true }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = post(&pool, f.chat_id, &f.staff, serde_json::json!({ "content": "Hello!" })).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let app = common::build_test_app(pool.clone());
    let uri = format!("/api/v1/chats/{}/messages", f.chat_id);
    let response = get_auth(app, &uri, &common::token_for(&f.customer)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let messages = json["data"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["content"], "Hello!");
    assert_eq!(messages[0]["sender"]["role"], "staff");

    let app = common::build_test_app(pool);
    let response = get_auth(app, &uri, &common::token_for(&f.admin)).await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_customer_private_flag_is_ignored(pool: PgPool) {
    let f = setup(&pool).await;

    let response = post(
        &pool,
        f.chat_id,
        &f.customer,
        serde_json::json!({ "content": "Not secret", "is_private": true }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["data"]["is_private"], false);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_private_message_is_not_pushed_to_customer(pool: PgPool) {
    let f = setup(&pool).await;
    let state = common::test_state(pool.clone());

    let mut customer_rx = state.hub.add("customer-conn".into(), f.customer.id, "customer").await;
    let mut staff_rx = state.hub.add("staff-conn".into(), f.staff.id, "staff").await;
    state.hub.subscribe("customer-conn", Topic::Chat(f.chat_id)).await;
    state.hub.subscribe("staff-conn", Topic::Chat(f.chat_id)).await;

    let admin = auth_user(&f.admin);
    let ctx = load_chat_context(&pool, &admin, f.chat_id).await.unwrap();
    let draft = MessageDraft {
        content: "Internal note".into(),
        is_private: true,
        is_quotation: false,
        quotation_amount: None,
        attachment_url: None,
        attachment_type: None,
    };
    lifecycle::post_message(&state, &ctx, &admin, draft).await.unwrap();

    let mut staff_saw_message = false;
    while let Ok(delivery) = staff_rx.try_recv() {
        if matches!(delivery, Delivery::Event(RealtimeEvent::NewMessage { .. })) {
            staff_saw_message = true;
        }
    }
    assert!(staff_saw_message);

    while let Ok(delivery) = customer_rx.try_recv() {
        assert!(
            !matches!(delivery, Delivery::Event(RealtimeEvent::NewMessage { .. })),
            "customer must not receive a private message"
        );
    }
}

// ---------------------------------------------------------------------------
// Posting rules
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_customer_cannot_quote(pool: PgPool) {
    let f = setup(&pool).await;
    let response = post(
        &pool,
        f.chat_id,
        &f.customer,
        serde_json::json!({ "content": "My price", "is_quotation": true, "quotation_amount": 10.0 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_unassigned_staff_cannot_post(pool: PgPool) {
    let f = setup(&pool).await;
    let outsider = common::create_staff(&pool, "Other Staff").await;

    let response = post(&pool, f.chat_id, &outsider, serde_json::json!({ "content": "Hi" })).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_closed_chat_rejects_messages(pool: PgPool) {
    let f = setup(&pool).await;

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        &format!("/api/v1/chats/{}/close", f.chat_id),
        &common::token_for(&f.staff),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["is_open"], false);

    let response = post(&pool, f.chat_id, &f.customer, serde_json::json!({ "content": "Hello?" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "DOMAIN_RULE");
    assert!(MessageRepo::list_for_chat(&pool, f.chat_id).await.unwrap().is_empty());

    // Closing the chat completed the booking.
    let app = common::build_test_app(pool);
    let response = get_auth(
        app,
        &format!("/api/v1/bookings/{}", f.booking_id),
        &common::token_for(&f.admin),
    )
    .await;
    assert_eq!(body_json(response).await["data"]["booking"]["status"], "completed");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_closed_chat_is_a_domain_rule_error(pool: PgPool) {
    let f = setup(&pool).await;
    ChatRepo::close(&pool, f.chat_id).await.unwrap();

    let state = common::test_state(pool.clone());
    let customer = auth_user(&f.customer);
    let ctx = load_chat_context(&pool, &customer, f.chat_id).await.unwrap();

    let result = lifecycle::post_message(&state, &ctx, &customer, text_draft("Anyone?")).await;
    assert_matches!(
        result,
        Err(AppError::Core(CoreError::DomainRule(msg))) if msg == CHAT_CLOSED_MESSAGE
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_quotation_notifies_customer_in_app_and_externally(pool: PgPool) {
    let f = setup(&pool).await;
    let channel = Arc::new(RecordingChannel::default());
    let channels: Vec<Arc<dyn NotificationChannel>> = vec![channel.clone()];
    let app = common::build_test_app_with_state(common::test_state_with_channels(
        pool.clone(),
        channels,
    ));

    let response = post_json_auth(
        app,
        &format!("/api/v1/chats/{}/messages", f.chat_id),
        &common::token_for(&f.staff),
        serde_json::json!({
            "content": "Replacement screen",
            "is_quotation": true,
            "quotation_amount": 150.0,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let notes = NotificationRepo::list_for_user(&pool, f.customer.id, false, 50, 0)
        .await
        .unwrap();
    assert!(notes
        .iter()
        .any(|n| n.kind == KIND_MESSAGE && n.booking_id == Some(f.booking_id)));

    let subjects = channel.wait_for(f.customer.id, 1).await;
    let expected = format!("Quotation for booking #{}: 150.00", f.booking_id);
    assert!(subjects.contains(&expected), "subjects: {subjects:?}");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_message_is_kept_when_recipient_lookup_fails(pool: PgPool) {
    let f = setup(&pool).await;

    // Staff recipients are resolved from `tasks`; make that lookup fail.
    sqlx::query("ALTER TABLE tasks RENAME TO tasks_unavailable")
        .execute(&pool)
        .await
        .unwrap();

    let response = post(&pool, f.chat_id, &f.customer, serde_json::json!({ "content": "Hello?" })).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let messages = MessageRepo::list_for_chat(&pool, f.chat_id).await.unwrap();
    assert_eq!(messages.len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_customer_cannot_close_chat(pool: PgPool) {
    let f = setup(&pool).await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app,
        &format!("/api/v1/chats/{}/close", f.chat_id),
        &common::token_for(&f.customer),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_empty_transcript(pool: PgPool) {
    let f = setup(&pool).await;
    let app = common::build_test_app(pool);

    let response = get_auth(
        app,
        &format!("/api/v1/chats/{}/transcript", f.chat_id),
        &common::token_for(&f.customer),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/plain; charset=utf-8");
    let expected_name = format!("chat-transcript-booking-{}.txt", f.booking_id);
    assert!(response.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .contains(&expected_name));

    let text = body_text(response).await;
    assert!(text.starts_with("==================================================\nCHAT TRANSCRIPT\n"));
    assert!(text.contains("Service: Laptop Repair\n"));
    assert!(text.contains("Customer: Jane Doe\n"));
    assert!(text.contains("\n\nNo messages in this chat.\n\n"));
    assert!(text.ends_with("END OF TRANSCRIPT\n==================================================\n"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_transcript_hides_private_notes_from_customer(pool: PgPool) {
    let f = setup(&pool).await;
    post(
        &pool,
        f.chat_id,
        &f.staff,
        serde_json::json!({ "content": "Internal only", "is_private": true }),
    )
    .await;
    post(
        &pool,
        f.chat_id,
        &f.staff,
        serde_json::json!({ "content": "Quote attached", "is_quotation": true, "quotation_amount": 150 }),
    )
    .await;

    let uri = format!("/api/v1/chats/{}/transcript", f.chat_id);

    let app = common::build_test_app(pool.clone());
    let customer_text = body_text(get_auth(app, &uri, &common::token_for(&f.customer)).await).await;
    assert!(!customer_text.contains("Internal only"));
    assert!(customer_text.contains("Sam Staff (staff) [QUOTATION: 150.00]:\nQuote attached"));

    let app = common::build_test_app(pool);
    let staff_text = body_text(get_auth(app, &uri, &common::token_for(&f.staff)).await).await;
    assert!(staff_text.contains("[PRIVATE]:\nInternal only"));
}
