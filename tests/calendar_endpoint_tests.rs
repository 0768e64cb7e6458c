// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar sync endpoint tests.
//!
//! Google's token and Calendar endpoints are served by a wiremock server;
//! the credential store is in memory.

use axum::http::{header, StatusCode};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, body_string_contains, header as header_eq, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

mod common;

use common::{
    body_json, create_test_app, google_event, request, seed_credential, stored_credential,
    EVENTS_PATH, TOKEN_PATH,
};

fn location(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect has a Location")
        .to_str()
        .unwrap()
        .to_string()
}

// ─── Authentication and dispatch ─────────────────────────────

#[tokio::test]
async fn test_actions_require_bearer_token() {
    let app = create_test_app().await;

    for action in ["auth-url", "events", "disconnect"] {
        let response = app
            .router
            .clone()
            .oneshot(request("GET", &format!("/calendar?action={}", action), None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "action {}", action);

        let body = body_json(response).await;
        assert!(body["error"].is_string());
        assert!(body.get("needsAuth").is_none());
    }
}

#[tokio::test]
async fn test_invalid_token_rejected() {
    let app = create_test_app().await;

    let response = app
        .router
        .oneshot(
            axum::http::Request::builder()
                .uri("/calendar?action=events")
                .header(header::AUTHORIZATION, "Bearer not-a-real-token")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_or_missing_action() {
    let app = create_test_app().await;

    for uri in ["/calendar?action=sync-everything", "/calendar"] {
        let response = app
            .router
            .clone()
            .oneshot(request("GET", uri, Some("u1"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri {}", uri);
        assert_eq!(body_json(response).await["error"], "Invalid action");
    }
}

#[tokio::test]
async fn test_unknown_action_without_token_is_unauthorized() {
    let app = create_test_app().await;

    let response = app
        .router
        .oneshot(request("GET", "/calendar?action=bogus", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_method_for_action() {
    let app = create_test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/calendar?action=create-event", Some("u1"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let response = app
        .router
        .oneshot(request("POST", "/calendar?action=events", Some("u1"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// ─── auth-url ────────────────────────────────────────────────

#[tokio::test]
async fn test_auth_url_carries_user_id_as_state() {
    let app = create_test_app().await;

    let response = app
        .router
        .oneshot(request("GET", "/calendar?action=auth-url", Some("u123"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let url = body["authUrl"].as_str().unwrap();

    assert!(url.contains("state=u123"));
    assert!(url.contains("access_type=offline"));
    assert!(url.contains("prompt=consent"));
    assert!(url.contains("response_type=code"));
    assert!(url.contains("client_id=test_client_id"));
    assert!(url.contains(
        "redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fcalendar%3Faction%3Dcallback"
    ));
}

// ─── callback ────────────────────────────────────────────────

#[tokio::test]
async fn test_callback_without_code_redirects_missing_params() {
    let app = create_test_app().await;

    let response = app
        .router
        .oneshot(request("GET", "/calendar?action=callback&state=u1", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        "http://localhost:5173/dashboard?calendar_error=missing_params"
    );
}

#[tokio::test]
async fn test_callback_forwards_consent_error() {
    let app = create_test_app().await;

    let response = app
        .router
        .oneshot(request(
            "GET",
            "/calendar?action=callback&error=access_denied&state=u1",
            None,
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        "http://localhost:5173/dashboard?calendar_error=access_denied"
    );
}

#[tokio::test]
async fn test_callback_stores_credential() {
    let app = create_test_app().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A1",
            "expires_in": 3599,
            "refresh_token": "R1",
            "scope": "https://www.googleapis.com/auth/calendar",
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&app.google)
        .await;

    let response = app
        .router
        .oneshot(request("GET", "/calendar?action=callback&code=abc&state=u1", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        "http://localhost:5173/dashboard?calendar_connected=true"
    );

    let credential = stored_credential(&app.db, "u1").await.unwrap();
    assert_eq!(credential.access_token, "A1");
    assert_eq!(credential.refresh_token, "R1");
    assert!(!credential.needs_refresh(chrono::Utc::now()));
}

#[tokio::test]
async fn test_callback_with_unusable_lifetime_reports_error() {
    let app = create_test_app().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A1",
            "expires_in": i64::MAX,
            "refresh_token": "R1"
        })))
        .mount(&app.google)
        .await;

    let response = app
        .router
        .oneshot(request("GET", "/calendar?action=callback&code=abc&state=u1", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(location(&response).starts_with(
        "http://localhost:5173/dashboard?calendar_error=Invalid%20token%20lifetime"
    ));
    assert!(stored_credential(&app.db, "u1").await.is_none());
}

#[tokio::test]
async fn test_callback_exchange_failure_reports_description() {
    let app = create_test_app().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Bad Request"
        })))
        .mount(&app.google)
        .await;

    let response = app
        .router
        .oneshot(request("GET", "/calendar?action=callback&code=stale&state=u1", None, None))
        .await
        .unwrap();

    assert_eq!(
        location(&response),
        "http://localhost:5173/dashboard?calendar_error=Bad%20Request"
    );
    assert!(stored_credential(&app.db, "u1").await.is_none());
}

#[tokio::test]
async fn test_callback_without_refresh_token() {
    let app = create_test_app().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A1",
            "expires_in": 3599
        })))
        .mount(&app.google)
        .await;

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/calendar?action=callback&code=abc&state=u1", None, None))
        .await
        .unwrap();
    assert_eq!(
        location(&response),
        "http://localhost:5173/dashboard?calendar_error=missing_refresh_token"
    );

    // A reconnect keeps the refresh token already on file.
    seed_credential(&app.db, "u2", "A0", -10).await;
    let response = app
        .router
        .oneshot(request("GET", "/calendar?action=callback&code=abc&state=u2", None, None))
        .await
        .unwrap();
    assert_eq!(
        location(&response),
        "http://localhost:5173/dashboard?calendar_connected=true"
    );
    let credential = stored_credential(&app.db, "u2").await.unwrap();
    assert_eq!(credential.access_token, "A1");
    assert_eq!(credential.refresh_token, "R1");
}

// ─── events ──────────────────────────────────────────────────

#[tokio::test]
async fn test_events_when_not_connected() {
    let app = create_test_app().await;

    let response = app
        .router
        .oneshot(request("GET", "/calendar?action=events", Some("u1"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Not connected");
    assert_eq!(body["needsAuth"], true);
}

#[tokio::test]
async fn test_events_empty_calendar_without_refresh() {
    let app = create_test_app().await;
    seed_credential(&app.db, "u1", "A1", 3600).await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&app.google)
        .await;

    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(header_eq("authorization", "Bearer A1"))
        .and(query_param("singleEvents", "true"))
        .and(query_param("orderBy", "startTime"))
        .and(query_param("maxResults", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "kind": "calendar#events" })))
        .expect(1)
        .mount(&app.google)
        .await;

    let response = app
        .router
        .oneshot(request("GET", "/calendar?action=events", Some("u1"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "events": [] }));
}

#[tokio::test]
async fn test_expired_token_refreshed_before_listing() {
    let app = create_test_app().await;
    seed_credential(&app.db, "u1", "A1", -10).await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=R1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A2",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&app.google)
        .await;

    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(header_eq("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                google_event("e1", "Open home - 5 Elm St", "2026-03-07T10:00:00+11:00", "2026-03-07T10:30:00+11:00"),
                { "id": "e2", "start": { "date": "2026-03-09" }, "end": { "date": "2026-03-10" } }
            ]
        })))
        .expect(1)
        .mount(&app.google)
        .await;

    let response = app
        .router
        .oneshot(request("GET", "/calendar?action=events", Some("u1"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let events = body["events"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["title"], "Open home - 5 Elm St");
    assert_eq!(events[0]["allDay"], false);
    assert_eq!(
        events[0]["externalLink"],
        "https://www.google.com/calendar/event?eid=e1"
    );
    assert_eq!(events[1]["title"], "(No title)");
    assert_eq!(events[1]["allDay"], true);
    assert_eq!(events[1]["start"], "2026-03-09");

    let credential = stored_credential(&app.db, "u1").await.unwrap();
    assert_eq!(credential.access_token, "A2");
    assert_eq!(credential.refresh_token, "R1");
    assert!(!credential.needs_refresh(chrono::Utc::now()));
}

#[tokio::test]
async fn test_token_inside_refresh_margin_is_refreshed() {
    let app = create_test_app().await;
    seed_credential(&app.db, "u1", "A1", 30).await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A2",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&app.google)
        .await;

    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(header_eq("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(1)
        .mount(&app.google)
        .await;

    let response = app
        .router
        .oneshot(request("GET", "/calendar?action=events", Some("u1"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rejected_token_refreshed_and_retried_once() {
    let app = create_test_app().await;
    seed_credential(&app.db, "u1", "A1", 3600).await;

    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(header_eq("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "code": 401, "message": "Invalid Credentials" }
        })))
        .expect(1)
        .mount(&app.google)
        .await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A2",
            "expires_in": 3599,
            "refresh_token": "R2"
        })))
        .expect(1)
        .mount(&app.google)
        .await;

    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(header_eq("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(1)
        .mount(&app.google)
        .await;

    let response = app
        .router
        .oneshot(request("GET", "/calendar?action=events", Some("u1"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let credential = stored_credential(&app.db, "u1").await.unwrap();
    assert_eq!(credential.access_token, "A2");
    assert_eq!(credential.refresh_token, "R2");
}

#[tokio::test]
async fn test_second_rejection_requires_reauth() {
    let app = create_test_app().await;
    seed_credential(&app.db, "u1", "A1", 3600).await;

    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&app.google)
        .await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A2",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&app.google)
        .await;

    let response = app
        .router
        .oneshot(request("GET", "/calendar?action=events", Some("u1"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["needsAuth"], true);
}

#[tokio::test]
async fn test_revoked_refresh_token_requires_reauth() {
    let app = create_test_app().await;
    seed_credential(&app.db, "u1", "A1", -120).await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .expect(1)
        .mount(&app.google)
        .await;

    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(0)
        .mount(&app.google)
        .await;

    let response = app
        .router
        .oneshot(request("GET", "/calendar?action=events", Some("u1"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["needsAuth"], true);

    // The credential survives so a transient misdiagnosis is recoverable.
    let credential = stored_credential(&app.db, "u1").await.unwrap();
    assert_eq!(credential.access_token, "A1");
    assert_eq!(credential.refresh_token, "R1");
}

#[tokio::test]
async fn test_refresh_with_unusable_lifetime_is_rejected() {
    let app = create_test_app().await;
    seed_credential(&app.db, "u1", "A1", -120).await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A2",
            "expires_in": i64::MAX
        })))
        .expect(1)
        .mount(&app.google)
        .await;

    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(0)
        .mount(&app.google)
        .await;

    let response = app
        .router
        .oneshot(request("GET", "/calendar?action=events", Some("u1"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().starts_with("Invalid token lifetime"));

    let credential = stored_credential(&app.db, "u1").await.unwrap();
    assert_eq!(credential.access_token, "A1");
}

#[tokio::test]
async fn test_provider_error_message_passed_through() {
    let app = create_test_app().await;
    seed_credential(&app.db, "u1", "A1", 3600).await;

    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "Calendar usage limits exceeded." }
        })))
        .mount(&app.google)
        .await;

    let response = app
        .router
        .oneshot(request("GET", "/calendar?action=events", Some("u1"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Calendar usage limits exceeded." })
    );
}

// ─── create-event ────────────────────────────────────────────

#[tokio::test]
async fn test_create_event_defaults_end_to_one_hour() {
    let app = create_test_app().await;
    seed_credential(&app.db, "u1", "A1", 3600).await;

    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .and(header_eq("authorization", "Bearer A1"))
        .and(body_partial_json(json!({
            "summary": "Inspection - 12 Oak St",
            "start": { "dateTime": "2026-03-02T09:00:00", "timeZone": "Australia/Sydney" },
            "end": { "dateTime": "2026-03-02T10:00:00", "timeZone": "Australia/Sydney" },
            "location": "12 Oak St"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(google_event(
            "new1",
            "Inspection - 12 Oak St",
            "2026-03-02T09:00:00+11:00",
            "2026-03-02T10:00:00+11:00",
        )))
        .expect(1)
        .mount(&app.google)
        .await;

    let response = app
        .router
        .oneshot(request(
            "POST",
            "/calendar?action=create-event",
            Some("u1"),
            Some(json!({
                "summary": "Inspection - 12 Oak St",
                "start": "2026-03-02T09:00:00",
                "location": "12 Oak St"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["event"]["id"], "new1");
    assert_eq!(body["event"]["end"], "2026-03-02T10:00:00+11:00");
}

#[tokio::test]
async fn test_create_event_rejects_end_before_start() {
    let app = create_test_app().await;
    seed_credential(&app.db, "u1", "A1", 3600).await;

    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.google)
        .await;

    let response = app
        .router
        .oneshot(request(
            "POST",
            "/calendar?action=create-event",
            Some("u1"),
            Some(json!({
                "summary": "Settlement",
                "start": "2026-03-02T10:00:00+11:00",
                "end": "2026-03-02T09:00:00+11:00"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_event_missing_fields() {
    let app = create_test_app().await;
    seed_credential(&app.db, "u1", "A1", 3600).await;

    let response = app
        .router
        .oneshot(request(
            "POST",
            "/calendar?action=create-event",
            Some("u1"),
            Some(json!({ "start": "2026-03-02T10:00:00+11:00" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Missing required fields" })
    );
}

// ─── disconnect ──────────────────────────────────────────────

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let app = create_test_app().await;
    seed_credential(&app.db, "u1", "A1", 3600).await;

    for method_name in ["POST", "GET"] {
        let response = app
            .router
            .clone()
            .oneshot(request(method_name, "/calendar?action=disconnect", Some("u1"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "success": true }));
    }

    assert!(stored_credential(&app.db, "u1").await.is_none());

    let response = app
        .router
        .oneshot(request("GET", "/calendar?action=events", Some("u1"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["needsAuth"], true);
}

// ─── Ambient ─────────────────────────────────────────────────

#[tokio::test]
async fn test_health_is_public() {
    let app = create_test_app().await;

    let response = app
        .router
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-store");
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_cors_preflight_allows_frontend() {
    let app = create_test_app().await;

    let response = app
        .router
        .oneshot(
            axum::http::Request::builder()
                .method("OPTIONS")
                .uri("/calendar?action=events")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:5173"
    );
}

#[tokio::test]
async fn test_cors_rejects_lookalike_origin() {
    let app = create_test_app().await;

    let response = app
        .router
        .oneshot(
            axum::http::Request::builder()
                .method("OPTIONS")
                .uri("/calendar?action=events")
                .header(header::ORIGIN, "http://localhost.attacker.example")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
