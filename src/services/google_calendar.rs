// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Calendar v3 client.
//!
//! Handles:
//! - Listing upcoming events on the primary calendar
//! - Creating events
//! - Normalizing Google's event shape into `RemoteEvent`
//! - Mapping 401 to `TokenExpired` so the caller can refresh once and retry

use crate::error::AppError;
use crate::models::{EventDraft, EventTime, EventWindow, RemoteEvent};
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// Cap on events returned by one listing.
pub const MAX_UPCOMING_EVENTS: u32 = 50;

const PRIMARY_CALENDAR: &str = "primary";

/// Title shown for events without a summary.
const UNTITLED_EVENT: &str = "(No title)";

/// Google Calendar API client.
#[derive(Clone)]
pub struct CalendarClient {
    http: reqwest::Client,
    base_url: String,
    /// Time zone attached to date-times that carry no offset
    time_zone: String,
}

impl CalendarClient {
    pub fn new(base_url: &str, time_zone: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            time_zone: time_zone.to_string(),
        }
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/{}/events", self.base_url, PRIMARY_CALENDAR)
    }

    /// List events in `window`, recurring events expanded, ordered by start.
    pub async fn list_events(
        &self,
        access_token: &str,
        window: EventWindow,
    ) -> Result<Vec<RemoteEvent>, AppError> {
        let response = self
            .http
            .get(self.events_url())
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", format_utc_rfc3339(window.time_min)),
                ("timeMax", format_utc_rfc3339(window.time_max)),
                ("maxResults", MAX_UPCOMING_EVENTS.to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Provider(e.to_string()))?;

        let list: GoogleEventList = check_response_json(response).await?;

        Ok(list
            .items
            .into_iter()
            .filter_map(|event| {
                let id = event.id.clone();
                let normalized = event.normalize();
                if normalized.is_none() {
                    tracing::warn!(event_id = %id, "Skipping event without start/end");
                }
                normalized
            })
            .collect())
    }

    /// Create an event; `end` defaults to one hour after `start`.
    pub async fn create_event(
        &self,
        access_token: &str,
        draft: &EventDraft,
    ) -> Result<RemoteEvent, AppError> {
        let body = NewGoogleEvent {
            summary: &draft.title,
            description: draft.description.as_deref(),
            location: draft.location.as_deref(),
            start: OutgoingTime {
                date_time: draft.start.to_google_string(),
                time_zone: &self.time_zone,
            },
            end: OutgoingTime {
                date_time: draft.resolved_end().to_google_string(),
                time_zone: &self.time_zone,
            },
        };

        let response = self
            .http
            .post(self.events_url())
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Provider(e.to_string()))?;

        let created: GoogleEvent = check_response_json(response).await?;
        let id = created.id.clone();
        created.normalize().ok_or_else(|| {
            AppError::Provider(format!("Created event {} has no start/end", id))
        })
    }
}

/// Check response status and parse JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        // Unauthorized - token expired or revoked
        if status.as_u16() == 401 {
            return Err(AppError::TokenExpired);
        }

        let message = serde_json::from_str::<GoogleErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or_else(|_| format!("HTTP {}: {}", status, body));
        tracing::error!(status = %status, message = %message, "Google Calendar API error");
        return Err(AppError::Provider(message));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Provider(format!("JSON parse error: {}", e)))
}

// ─── Google wire types ───────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GoogleEventList {
    #[serde(default)]
    items: Vec<GoogleEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEvent {
    id: String,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    html_link: Option<String>,
    #[serde(default)]
    start: GoogleEventTime,
    #[serde(default)]
    end: GoogleEventTime,
}

impl GoogleEvent {
    fn normalize(self) -> Option<RemoteEvent> {
        let start = self.start.into_event_time()?;
        let end = self.end.into_event_time()?;
        Some(RemoteEvent {
            id: self.id,
            title: self
                .summary
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| UNTITLED_EVENT.to_string()),
            description: self.description,
            all_day: start.is_all_day(),
            start,
            end,
            location: self.location,
            external_link: self.html_link.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventTime {
    date_time: Option<DateTime<FixedOffset>>,
    date: Option<NaiveDate>,
}

impl GoogleEventTime {
    fn into_event_time(self) -> Option<EventTime> {
        match (self.date_time, self.date) {
            (Some(dt), _) => Some(EventTime::DateTime(dt)),
            (None, Some(d)) => Some(EventTime::Date(d)),
            (None, None) => None,
        }
    }
}

#[derive(Serialize)]
struct NewGoogleEvent<'a> {
    summary: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    start: OutgoingTime<'a>,
    end: OutgoingTime<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutgoingTime<'a> {
    date_time: String,
    time_zone: &'a str,
}

#[derive(Deserialize)]
struct GoogleErrorBody {
    error: GoogleErrorDetail,
}

#[derive(Deserialize)]
struct GoogleErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_timed_event() {
        let event: GoogleEvent = serde_json::from_value(serde_json::json!({
            "id": "evt1",
            "summary": "Open home - 5 Elm St",
            "start": { "dateTime": "2026-03-07T10:00:00+11:00", "timeZone": "Australia/Sydney" },
            "end": { "dateTime": "2026-03-07T10:30:00+11:00" },
            "htmlLink": "https://www.google.com/calendar/event?eid=abc",
            "location": "5 Elm St"
        }))
        .unwrap();

        let normalized = event.normalize().unwrap();
        assert_eq!(normalized.title, "Open home - 5 Elm St");
        assert!(!normalized.all_day);
        assert_eq!(normalized.location.as_deref(), Some("5 Elm St"));
        assert_eq!(
            normalized.external_link,
            "https://www.google.com/calendar/event?eid=abc"
        );
    }

    #[test]
    fn test_normalize_all_day_without_summary() {
        let event: GoogleEvent = serde_json::from_value(serde_json::json!({
            "id": "evt2",
            "start": { "date": "2026-03-09" },
            "end": { "date": "2026-03-10" }
        }))
        .unwrap();

        let normalized = event.normalize().unwrap();
        assert_eq!(normalized.title, UNTITLED_EVENT);
        assert!(normalized.all_day);
        assert_eq!(normalized.external_link, "");
    }

    #[test]
    fn test_normalize_rejects_missing_times() {
        let event: GoogleEvent =
            serde_json::from_value(serde_json::json!({ "id": "evt3", "summary": "x" })).unwrap();
        assert!(event.normalize().is_none());
    }

    #[test]
    fn test_outgoing_event_shape() {
        let body = NewGoogleEvent {
            summary: "Settlement",
            description: None,
            location: Some("Level 2, 10 King St"),
            start: OutgoingTime {
                date_time: "2026-03-02T09:00:00".to_string(),
                time_zone: "Australia/Sydney",
            },
            end: OutgoingTime {
                date_time: "2026-03-02T10:00:00".to_string(),
                time_zone: "Australia/Sydney",
            },
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "summary": "Settlement",
                "location": "Level 2, 10 King St",
                "start": { "dateTime": "2026-03-02T09:00:00", "timeZone": "Australia/Sydney" },
                "end": { "dateTime": "2026-03-02T10:00:00", "timeZone": "Australia/Sydney" }
            })
        );
    }
}
