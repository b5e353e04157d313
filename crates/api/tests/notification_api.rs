//! HTTP-level integration tests for the `/notifications` resource.
//!
//! Every test runs against the full router over in-memory stores, with
//! recording push and mail transports standing in for FCM/APNs and SMTP.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, delete_auth, dispatch, get, get_auth, message_request,
    payment_request, post_auth, post_json_auth, put_json_auth, token_for,
};
use serde_json::json;
use voyage_events::PushMessage;

const GUEST: &str = "guest-1";

fn guest_token() -> String {
    token_for(GUEST, "user")
}

// ---------------------------------------------------------------------------
// Authentication and intake
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_requires_bearer_token() {
    let app = build_test_app();
    let response = get(app.app(), "/api/v1/notifications").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let app = build_test_app();
    let response = get_auth(app.app(), "/api/v1/notifications", "not-a-jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn blank_recipient_is_a_validation_error() {
    let app = build_test_app();
    let response = post_json_auth(
        app.app(),
        "/api/v1/notifications/dispatch",
        message_request("   "),
        &token_for("booking-service", "service"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn regular_users_cannot_dispatch() {
    let app = build_test_app();
    let response = post_json_auth(
        app.app(),
        "/api/v1/notifications/dispatch",
        message_request(GUEST),
        &guest_token(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "FORBIDDEN");
}

#[tokio::test]
async fn dispatch_stores_record_and_counts_it_unread() {
    let app = build_test_app();
    let record = dispatch(&app, message_request(GUEST)).await;

    assert_eq!(record["user_id"], GUEST);
    assert_eq!(record["type"], "message");
    assert_eq!(record["is_read"], false);
    assert_eq!(record["in_app_visible"], true);
    assert_eq!(record["data"]["sender_name"], "Ana");

    let response = get_auth(app.app(), "/api/v1/notifications", &guest_token()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let list = body_json(response).await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);
    assert_eq!(list["data"][0]["id"], record["id"]);

    let response = get_auth(
        app.app(),
        "/api/v1/notifications/unread-count",
        &guest_token(),
    )
    .await;
    let count = body_json(response).await;
    assert_eq!(count["data"]["count"], 1);
    assert_eq!(count["data"]["badge"], "1");
}

#[tokio::test]
async fn mismatched_payload_kind_is_a_validation_error() {
    let app = build_test_app();
    let mut request = message_request(GUEST);
    request["type"] = json!("review");

    let response = post_json_auth(
        app.app(),
        "/api/v1/notifications/dispatch",
        request,
        &token_for("svc", "service"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn queued_dispatch_is_published_on_the_bus() {
    let app = build_test_app();
    let mut receiver = app.state.event_bus.subscribe();

    let response = post_json_auth(
        app.app(),
        "/api/v1/notifications/dispatch?queue=true",
        message_request(GUEST),
        &token_for("messaging-service", "service"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["queued"], true);
    assert_eq!(json["data"]["receivers"], 1);

    let event = receiver.recv().await.unwrap();
    assert_eq!(event.request.user_id, GUEST);
    assert_eq!(event.source.as_deref(), Some("messaging-service"));
}

// ---------------------------------------------------------------------------
// Read state
// ---------------------------------------------------------------------------

#[tokio::test]
async fn mark_read_clears_the_badge() {
    let app = build_test_app();
    let record = dispatch(&app, message_request(GUEST)).await;
    let id = record["id"].as_str().unwrap();

    let response = post_auth(
        app.app(),
        &format!("/api/v1/notifications/{id}/read"),
        &guest_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["is_read"], true);
    assert!(json["data"]["read_at"].is_string());

    let response = get_auth(
        app.app(),
        "/api/v1/notifications/unread-count",
        &guest_token(),
    )
    .await;
    let count = body_json(response).await;
    assert_eq!(count["data"]["count"], 0);
    assert!(count["data"]["badge"].is_null());
}

#[tokio::test]
async fn mark_read_of_unknown_id_is_not_found() {
    let app = build_test_app();
    let response = post_auth(
        app.app(),
        "/api/v1/notifications/0190c3a0-0000-7000-8000-000000000000/read",
        &guest_token(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn other_users_cannot_touch_a_record() {
    let app = build_test_app();
    let record = dispatch(&app, message_request(GUEST)).await;
    let id = record["id"].as_str().unwrap();
    let intruder = token_for("guest-2", "user");

    let response = post_auth(
        app.app(),
        &format!("/api/v1/notifications/{id}/read"),
        &intruder,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = delete_auth(app.app(), &format!("/api/v1/notifications/{id}"), &intruder).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = token_for("ops", "admin");
    let response = post_auth(app.app(), &format!("/api/v1/notifications/{id}/read"), &admin).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn click_marks_read_and_keeps_first_click() {
    let app = build_test_app();
    let record = dispatch(&app, message_request(GUEST)).await;
    let uri = format!("/api/v1/notifications/{}/click", record["id"].as_str().unwrap());

    let first = body_json(post_auth(app.app(), &uri, &guest_token()).await).await;
    assert_eq!(first["data"]["is_read"], true);
    let clicked_at = first["data"]["clicked_at"].clone();
    assert!(clicked_at.is_string());

    let second = body_json(post_auth(app.app(), &uri, &guest_token()).await).await;
    assert_eq!(second["data"]["clicked_at"], clicked_at);
}

#[tokio::test]
async fn read_all_only_touches_the_callers_records() {
    let app = build_test_app();
    dispatch(&app, message_request(GUEST)).await;
    dispatch(&app, payment_request(GUEST)).await;
    dispatch(&app, message_request("guest-2")).await;

    let response = post_auth(app.app(), "/api/v1/notifications/read-all", &guest_token()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["marked_read"], 2);

    let other = body_json(
        get_auth(
            app.app(),
            "/api/v1/notifications/unread-count",
            &token_for("guest-2", "user"),
        )
        .await,
    )
    .await;
    assert_eq!(other["data"]["count"], 1);
}

#[tokio::test]
async fn delete_reports_whether_a_record_was_removed() {
    let app = build_test_app();
    let record = dispatch(&app, message_request(GUEST)).await;
    let uri = format!("/api/v1/notifications/{}", record["id"].as_str().unwrap());

    let first = body_json(delete_auth(app.app(), &uri, &guest_token()).await).await;
    assert_eq!(first["data"]["deleted"], true);

    let second = body_json(delete_auth(app.app(), &uri, &guest_token()).await).await;
    assert_eq!(second["data"]["deleted"], false);
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_filters_by_type_and_read_state() {
    let app = build_test_app();
    let message = dispatch(&app, message_request(GUEST)).await;
    dispatch(&app, payment_request(GUEST)).await;

    let response = get_auth(
        app.app(),
        "/api/v1/notifications?type=payment",
        &guest_token(),
    )
    .await;
    let payments = body_json(response).await;
    assert_eq!(payments["data"].as_array().unwrap().len(), 1);
    assert_eq!(payments["data"][0]["type"], "payment");

    post_auth(
        app.app(),
        &format!("/api/v1/notifications/{}/read", message["id"].as_str().unwrap()),
        &guest_token(),
    )
    .await;

    let unread = body_json(
        get_auth(app.app(), "/api/v1/notifications?read=false", &guest_token()).await,
    )
    .await;
    assert_eq!(unread["data"].as_array().unwrap().len(), 1);
    assert_eq!(unread["data"][0]["type"], "payment");

    let both = body_json(
        get_auth(
            app.app(),
            "/api/v1/notifications?type=payment,message&limit=1",
            &guest_token(),
        )
        .await,
    )
    .await;
    // Newest first.
    assert_eq!(both["data"].as_array().unwrap().len(), 1);
    assert_eq!(both["data"][0]["type"], "payment");
}

#[tokio::test]
async fn list_without_limit_matches_unread_count() {
    let app = build_test_app();
    for _ in 0..60 {
        dispatch(&app, message_request(GUEST)).await;
    }

    let unread = body_json(
        get_auth(app.app(), "/api/v1/notifications?read=false", &guest_token()).await,
    )
    .await;
    let count = body_json(
        get_auth(app.app(), "/api/v1/notifications/unread-count", &guest_token()).await,
    )
    .await;
    assert_eq!(unread["data"].as_array().unwrap().len(), 60);
    assert_eq!(count["data"]["count"], 60);

    let page = body_json(
        get_auth(
            app.app(),
            "/api/v1/notifications?limit=20&offset=50",
            &guest_token(),
        )
        .await,
    )
    .await;
    assert_eq!(page["data"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn date_type_and_read_filters_combine() {
    let app = build_test_app();
    let today = chrono::Utc::now().date_naive();
    let older = dispatch(&app, message_request(GUEST)).await;
    dispatch(&app, payment_request(GUEST)).await;
    let read = dispatch(&app, message_request(GUEST)).await;
    let newer = dispatch(&app, message_request(GUEST)).await;
    post_auth(
        app.app(),
        &format!("/api/v1/notifications/{}/read", read["id"].as_str().unwrap()),
        &guest_token(),
    )
    .await;

    let uri = format!(
        "/api/v1/notifications?type=message,review&read=false&start_date={today}&end_date={today}"
    );
    let listed = body_json(get_auth(app.app(), &uri, &guest_token()).await).await;
    let ids: Vec<&str> = listed["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, [newer["id"].as_str().unwrap(), older["id"].as_str().unwrap()]);

    let tomorrow = today.succ_opt().unwrap();
    let uri = format!("/api/v1/notifications?type=message&start_date={tomorrow}");
    let future = body_json(get_auth(app.app(), &uri, &guest_token()).await).await;
    assert!(future["data"].as_array().unwrap().is_empty());

    let yesterday = today.pred_opt().unwrap();
    let uri = format!("/api/v1/notifications?read=false&end_date={yesterday}");
    let past = body_json(get_auth(app.app(), &uri, &guest_token()).await).await;
    assert!(past["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_type_in_filter_is_rejected() {
    let app = build_test_app();
    let response = get_auth(
        app.app(),
        "/api/v1/notifications?type=message,spam",
        &guest_token(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn inverted_date_filter_is_rejected() {
    let app = build_test_app();
    let response = get_auth(
        app.app(),
        "/api/v1/notifications?start_date=2025-03-09&end_date=2025-03-01",
        &guest_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Settings and email preferences
// ---------------------------------------------------------------------------

#[tokio::test]
async fn settings_default_then_merge_then_reset() {
    let app = build_test_app();
    let uri = "/api/v1/notifications/settings";

    let defaults = body_json(get_auth(app.app(), uri, &guest_token()).await).await;
    assert_eq!(defaults["data"]["enable_push"], true);
    assert_eq!(defaults["data"]["categories"]["marketing"]["push"], false);

    let update = json!({
        "enable_email": false,
        "categories": { "review": { "push": false } }
    });
    let updated = body_json(put_json_auth(app.app(), uri, update, &guest_token()).await).await;
    assert_eq!(updated["data"]["enable_email"], false);
    assert_eq!(updated["data"]["enable_push"], true);
    assert_eq!(updated["data"]["categories"]["review"]["push"], false);
    assert_eq!(updated["data"]["categories"]["review"]["in_app"], true);

    let reset = body_json(
        post_auth(app.app(), "/api/v1/notifications/settings/reset", &guest_token()).await,
    )
    .await;
    assert_eq!(reset["data"], defaults["data"]);
}

#[tokio::test]
async fn muted_user_gets_hidden_record() {
    let app = build_test_app();
    put_json_auth(
        app.app(),
        "/api/v1/notifications/settings",
        json!({ "mute_all": true }),
        &guest_token(),
    )
    .await;

    let record = dispatch(&app, message_request(GUEST)).await;
    assert_eq!(record["in_app_visible"], false);

    let list = body_json(get_auth(app.app(), "/api/v1/notifications", &guest_token()).await).await;
    assert!(list["data"].as_array().unwrap().is_empty());
    assert!(app.push.sent().is_empty());
    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn email_goes_to_the_stored_address() {
    let app = build_test_app();
    let response = put_json_auth(
        app.app(),
        "/api/v1/notifications/email-preferences",
        json!({ "address": "guest@example.com" }),
        &guest_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let prefs = body_json(response).await;
    assert_eq!(prefs["data"]["address"], "guest@example.com");
    assert_eq!(prefs["data"]["categories"]["marketing"], false);

    dispatch(&app, payment_request(GUEST)).await;

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "guest@example.com");
    assert_eq!(sent[0].1.subject, "Payment received");
    assert!(sent[0].1.body.contains("123.45 EUR"));
}

#[tokio::test]
async fn invalid_email_address_is_rejected() {
    let app = build_test_app();
    let response = put_json_auth(
        app.app(),
        "/api/v1/notifications/email-preferences",
        json!({ "address": "not-an-address" }),
        &guest_token(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn padded_email_address_is_trimmed() {
    let app = build_test_app();
    let response = put_json_auth(
        app.app(),
        "/api/v1/notifications/email-preferences",
        json!({ "address": "  guest@example.com " }),
        &guest_token(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["address"], "guest@example.com");
}

// ---------------------------------------------------------------------------
// Delivery log
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delivery_outcomes_are_listed_for_the_owner() {
    let app = build_test_app();
    put_json_auth(
        app.app(),
        "/api/v1/notifications/email-preferences",
        json!({ "address": "guest@example.com" }),
        &guest_token(),
    )
    .await;
    post_json_auth(
        app.app(),
        "/api/v1/notifications/devices",
        json!({ "token": "web-token-1", "platform": "web" }),
        &guest_token(),
    )
    .await;

    let record = dispatch(&app, payment_request(GUEST)).await;
    let uri = format!(
        "/api/v1/notifications/{}/deliveries",
        record["id"].as_str().unwrap()
    );

    let response = get_auth(app.app(), &uri, &guest_token()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let outcomes = body_json(response).await;
    let mut channels: Vec<&str> = outcomes["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["channel"].as_str().unwrap())
        .collect();
    channels.sort_unstable();
    assert_eq!(channels, ["email", "push"]);
    assert!(outcomes["data"]
        .as_array()
        .unwrap()
        .iter()
        .all(|o| o["delivered"] == true));

    let response = get_auth(app.app(), &uri, &token_for("guest-2", "user")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

#[tokio::test]
async fn registered_ios_device_receives_apns_push() {
    let app = build_test_app();
    let devices_uri = "/api/v1/notifications/devices";

    let response = post_json_auth(
        app.app(),
        devices_uri,
        json!({ "token": "ios-token-1", "platform": "ios" }),
        &guest_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["data"]["platform"], "ios");

    let record = dispatch(&app, message_request(GUEST)).await;

    let sent = app.push.sent();
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        PushMessage::Apns(message) => {
            assert_eq!(message.token, "ios-token-1");
            assert_eq!(message.aps.badge, Some(1));
            assert_eq!(message.data["notificationId"], record["id"].as_str().unwrap());
        }
        other => panic!("expected an APNs payload, got {other:?}"),
    }

    let list = body_json(get_auth(app.app(), devices_uri, &guest_token()).await).await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);

    let removed = body_json(
        delete_auth(
            app.app(),
            "/api/v1/notifications/devices/ios-token-1",
            &guest_token(),
        )
        .await,
    )
    .await;
    assert_eq!(removed["data"]["deleted"], true);

    let list = body_json(get_auth(app.app(), devices_uri, &guest_token()).await).await;
    assert!(list["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn blank_device_token_is_rejected() {
    let app = build_test_app();
    let response = post_json_auth(
        app.app(),
        "/api/v1/notifications/devices",
        json!({ "token": "   ", "platform": "android" }),
        &guest_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn analytics_report_for_self() {
    let app = build_test_app();
    let record = dispatch(&app, message_request(GUEST)).await;
    dispatch(&app, payment_request(GUEST)).await;
    post_auth(
        app.app(),
        &format!("/api/v1/notifications/{}/read", record["id"].as_str().unwrap()),
        &guest_token(),
    )
    .await;

    let today = chrono::Utc::now().date_naive();
    let uri = format!("/api/v1/notifications/analytics?start_date={today}&end_date={today}");
    let response = get_auth(app.app(), &uri, &guest_token()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let report = body_json(response).await;
    let metrics = &report["data"]["metrics"];
    assert_eq!(metrics["total_sent"], 2);
    assert_eq!(metrics["total_read"], 1);
    assert_eq!(metrics["read_rate"], 50.0);
    assert_eq!(metrics["breakdown"]["message"]["read_rate"], 100.0);
    assert_eq!(report["data"]["top_performing"], "message");
    assert_eq!(report["data"]["trends"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn analytics_for_another_user_requires_admin() {
    let app = build_test_app();
    dispatch(&app, message_request("guest-2")).await;
    let today = chrono::Utc::now().date_naive();
    let uri = format!(
        "/api/v1/notifications/analytics?start_date={today}&end_date={today}&user_id=guest-2"
    );

    let response = get_auth(app.app(), &uri, &guest_token()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_auth(app.app(), &uri, &token_for("ops", "admin")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["metrics"]["total_sent"], 1);
}

#[tokio::test]
async fn analytics_rejects_inverted_range() {
    let app = build_test_app();
    let response = get_auth(
        app.app(),
        "/api/v1/notifications/analytics?start_date=2025-03-09&end_date=2025-03-01",
        &guest_token(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}
