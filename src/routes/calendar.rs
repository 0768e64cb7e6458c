// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar sync endpoint: `/calendar?action=<action>`.
//!
//! `callback` is public (Google redirects the browser here); every other
//! action requires a bearer token.

use crate::error::{AppError, Result};
use crate::middleware::authenticate;
use crate::models::{EventDraft, EventInstant, RemoteEvent};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/calendar", get(calendar_action).post(calendar_action))
}

/// Actions understood by the sync endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    AuthUrl,
    Callback,
    Events,
    CreateEvent,
    Disconnect,
}

impl Action {
    fn name(self) -> &'static str {
        match self {
            Action::AuthUrl => "auth-url",
            Action::Callback => "callback",
            Action::Events => "events",
            Action::CreateEvent => "create-event",
            Action::Disconnect => "disconnect",
        }
    }

    fn allows(self, method: &Method) -> bool {
        match self {
            Action::AuthUrl | Action::Callback | Action::Events => method == Method::GET,
            Action::CreateEvent => method == Method::POST,
            Action::Disconnect => method == Method::GET || method == Method::POST,
        }
    }
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "auth-url" => Ok(Action::AuthUrl),
            "callback" => Ok(Action::Callback),
            "events" => Ok(Action::Events),
            "create-event" => Ok(Action::CreateEvent),
            "disconnect" => Ok(Action::Disconnect),
            _ => Err(AppError::InvalidAction),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CalendarQuery {
    action: Option<String>,
    // Callback parameters
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Dispatch on `action`.
async fn calendar_action(
    State(state): State<Arc<AppState>>,
    method: Method,
    Query(query): Query<CalendarQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let action = query.action.as_deref().map(Action::from_str);

    if let Some(Ok(Action::Callback)) = action {
        if !Action::Callback.allows(&method) {
            return Err(AppError::MethodNotAllowed(Action::Callback.name()));
        }
        return Ok(oauth_callback(&state, &query).await);
    }

    let user = authenticate(&state, &headers).await?;
    let action = action.unwrap_or(Err(AppError::InvalidAction))?;
    if !action.allows(&method) {
        return Err(AppError::MethodNotAllowed(action.name()));
    }

    tracing::debug!(user_id = %user.user_id, action = action.name(), "Calendar action");

    match action {
        Action::AuthUrl => Ok(Json(AuthUrlResponse {
            auth_url: state.calendar.consent_url(&user.user_id),
        })
        .into_response()),
        Action::Events => {
            let events = state.calendar.list_upcoming_events(&user.user_id).await?;
            Ok(Json(EventsResponse { events }).into_response())
        }
        Action::CreateEvent => {
            let draft = parse_create_body(&body)?.into_draft()?;
            let event = state.calendar.create_event(&user.user_id, &draft).await?;
            Ok(Json(EventResponse { event }).into_response())
        }
        Action::Disconnect => {
            state.calendar.disconnect(&user.user_id).await?;
            Ok(Json(SuccessResponse { success: true }).into_response())
        }
        Action::Callback => Err(AppError::InvalidAction),
    }
}

// ─── OAuth callback ──────────────────────────────────────────

/// Finish the consent flow and send the browser back to the dashboard.
///
/// Every outcome is a redirect; failures carry `calendar_error=<code>`.
async fn oauth_callback(state: &AppState, query: &CalendarQuery) -> Response {
    let dashboard = format!("{}/dashboard", state.config.app_url);

    if let Some(error) = &query.error {
        tracing::warn!(error = %error, "OAuth consent returned an error");
        return found(&format!(
            "{}?calendar_error={}",
            dashboard,
            urlencoding::encode(error)
        ));
    }

    let (Some(code), Some(user_id)) = (
        query.code.as_deref().filter(|c| !c.is_empty()),
        query.state.as_deref().filter(|s| !s.is_empty()),
    ) else {
        return found(&format!("{}?calendar_error=missing_params", dashboard));
    };

    match state.calendar.connect(user_id, code).await {
        Ok(_) => found(&format!("{}?calendar_connected=true", dashboard)),
        Err(e) => {
            tracing::error!(user_id, error = ?e, "Calendar connection failed");
            found(&format!(
                "{}?calendar_error={}",
                dashboard,
                urlencoding::encode(&e.code())
            ))
        }
    }
}

/// 302 redirect.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

// ─── create-event ────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, Validate)]
struct CreateEventBody {
    #[validate(length(max = 1024))]
    summary: Option<String>,
    #[validate(length(max = 8192))]
    description: Option<String>,
    start: Option<String>,
    end: Option<String>,
    #[validate(length(max = 1024))]
    location: Option<String>,
}

fn parse_create_body(body: &[u8]) -> Result<CreateEventBody> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::MissingFields);
    }
    let parsed: CreateEventBody = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))?;
    parsed.validate()?;
    Ok(parsed)
}

impl CreateEventBody {
    fn into_draft(self) -> Result<EventDraft> {
        let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let (Some(title), Some(start)) = (non_blank(self.summary), non_blank(self.start)) else {
            return Err(AppError::MissingFields);
        };

        let start = parse_instant("start", &start)?;
        let end = non_blank(self.end)
            .map(|end| parse_instant("end", &end))
            .transpose()?;

        if let Some(end) = &end {
            match end.is_after(&start) {
                Some(true) => {}
                Some(false) => {
                    return Err(AppError::BadRequest("end must be after start".to_string()))
                }
                None => {
                    return Err(AppError::BadRequest(
                        "start and end must both include an offset or both omit it".to_string(),
                    ))
                }
            }
        }

        Ok(EventDraft {
            title,
            description: non_blank(self.description),
            start,
            end,
            location: non_blank(self.location),
        })
    }
}

fn parse_instant(field: &str, value: &str) -> Result<EventInstant> {
    value
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid '{}' date-time: {}", field, value)))
}

// ─── Responses ───────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct AuthUrlResponse {
    pub auth_url: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EventsResponse {
    pub events: Vec<RemoteEvent>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EventResponse {
    pub event: RemoteEvent,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SuccessResponse {
    pub success: bool,
}
