// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod api;
pub mod calendar;

use crate::middleware::auth::require_auth;
use crate::AppState;
use axum::extract::{DefaultBodyLimit, Request};
use axum::http::header::{self, HeaderName};
use axum::http::request::Parts;
use axum::http::{HeaderValue, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::{Level, Span};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Largest request body accepted; appointment notes are the biggest field.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Browser origins allowed to call the API: the CRM frontend, plus local
/// dev servers on any port.
fn is_allowed_origin(app_url: &str, origin: &str) -> bool {
    if origin == app_url.trim_end_matches('/') {
        return true;
    }
    ["http://localhost", "http://127.0.0.1"].iter().any(|host| {
        origin
            .strip_prefix(host)
            .is_some_and(|rest| rest.is_empty() || is_port_suffix(rest))
    })
}

fn is_port_suffix(rest: &str) -> bool {
    rest.strip_prefix(':')
        .is_some_and(|port| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()))
}

// Spans carry the path only: the OAuth callback query holds the
// authorization code.
fn request_span(request: &Request) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
    )
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let app_url = state.config.app_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _request_parts: &Parts| {
                origin
                    .to_str()
                    .is_ok_and(|origin| is_allowed_origin(&app_url, origin))
            },
        ))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            HeaderName::from_static("apikey"),
            HeaderName::from_static("x-client-info"),
        ]);

    // `/calendar` authenticates per action since the OAuth callback is public.
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .merge(calendar::routes());

    let protected_routes =
        api::routes().route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_origins() {
        let app = "https://crm.example.com/";

        assert!(is_allowed_origin(app, "https://crm.example.com"));
        assert!(is_allowed_origin(app, "http://localhost"));
        assert!(is_allowed_origin(app, "http://localhost:5173"));
        assert!(is_allowed_origin(app, "http://127.0.0.1:8080"));

        assert!(!is_allowed_origin(app, "https://crm.example.com.evil.io"));
        assert!(!is_allowed_origin(app, "http://localhost.evil.io"));
        assert!(!is_allowed_origin(app, "http://localhost:"));
        assert!(!is_allowed_origin(app, "http://127.0.0.1:80/x"));
        assert!(!is_allowed_origin(app, "https://localhost:5173"));
    }
}
