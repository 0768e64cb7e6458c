// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::{Duration, Utc};
use realty_calendar_sync::config::Config;
use realty_calendar_sync::db::{CredentialStore, MemoryDb};
use realty_calendar_sync::models::CalendarCredential;
use realty_calendar_sync::routes::create_router;
use realty_calendar_sync::services::identity::create_jwt;
use realty_calendar_sync::services::JwtIdentityVerifier;
use realty_calendar_sync::AppState;
use std::sync::Arc;
use wiremock::MockServer;

/// Path of the fake token endpoint on the mock server.
#[allow(dead_code)]
pub const TOKEN_PATH: &str = "/token";

/// Path of the primary calendar's events on the mock server.
#[allow(dead_code)]
pub const EVENTS_PATH: &str = "/calendar/v3/calendars/primary/events";

/// Offline app wired to an in-memory store and a fake Google.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub db: MemoryDb,
    pub google: MockServer,
}

/// Config pointing every Google endpoint at `google`.
#[allow(dead_code)]
pub fn test_config(google: &MockServer) -> Config {
    Config {
        google_token_url: format!("{}{}", google.uri(), TOKEN_PATH),
        google_calendar_api_url: format!("{}/calendar/v3", google.uri()),
        ..Config::default()
    }
}

/// Create a test app with offline mock dependencies.
#[allow(dead_code)]
pub async fn create_test_app() -> TestApp {
    let google = MockServer::start().await;
    let config = test_config(&google);
    let db = MemoryDb::new();

    let secret = config
        .platform_jwt_secret
        .clone()
        .expect("test config has a JWT secret");
    let state = Arc::new(AppState::new(
        config,
        Arc::new(db.clone()),
        Arc::new(db.clone()),
        Arc::new(JwtIdentityVerifier::new(&secret)),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        google,
    }
}

/// Create a bearer token the test app accepts for `user_id`.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str) -> String {
    let secret = Config::default()
        .platform_jwt_secret
        .expect("test config has a JWT secret");
    create_jwt(user_id, &secret).expect("JWT encodes")
}

/// Store a credential whose access token expires in `expires_in_secs`.
#[allow(dead_code)]
pub async fn seed_credential(db: &MemoryDb, user_id: &str, access_token: &str, expires_in_secs: i64) {
    let now = Utc::now();
    let credential = CalendarCredential {
        user_id: user_id.to_string(),
        access_token: access_token.to_string(),
        refresh_token: "R1".to_string(),
        expires_at: now + Duration::seconds(expires_in_secs),
        updated_at: now,
    };
    CredentialStore::upsert(db, &credential).await.unwrap();
}

#[allow(dead_code)]
pub async fn stored_credential(db: &MemoryDb, user_id: &str) -> Option<CalendarCredential> {
    CredentialStore::get(db, user_id).await.unwrap()
}

/// Build a request, optionally authenticated as `user_id`.
#[allow(dead_code)]
pub fn request(
    method: &str,
    uri: &str,
    user_id: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user_id) = user_id {
        builder = builder.header(
            header::AUTHORIZATION,
            format!("Bearer {}", create_test_jwt(user_id)),
        );
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// A Google Calendar event as the API returns it.
#[allow(dead_code)]
pub fn google_event(id: &str, summary: &str, start: &str, end: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "summary": summary,
        "start": { "dateTime": start },
        "end": { "dateTime": end },
        "htmlLink": format!("https://www.google.com/calendar/event?eid={}", id)
    })
}
