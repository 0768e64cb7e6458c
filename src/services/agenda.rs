// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Unified agenda: local appointments merged with remote calendar events.

use crate::db::AppointmentStore;
use crate::error::{AppError, Result};
use crate::models::event::DEFAULT_EVENT_DURATION_MINS;
use crate::models::{AppointmentKind, AppointmentStatus, EventTime, LocalAppointment, RemoteEvent};
use crate::services::CalendarService;
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// One entry on the agenda, tagged by where it lives.
#[derive(Debug, Clone, PartialEq)]
pub enum AgendaEntry {
    Local(LocalAppointment),
    Remote(RemoteEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    Local,
    Remote,
}

/// Common display shape for both entry kinds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct DisplayEvent {
    pub id: String,
    pub source: EventSource,
    pub title: String,
    pub start: String,
    pub end: String,
    pub all_day: bool,
    pub location: Option<String>,
    pub description: Option<String>,
    /// External calendar link (remote entries only)
    pub link: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<AppointmentKind>,
    pub status: Option<AppointmentStatus>,
    #[serde(skip)]
    #[cfg_attr(feature = "binding-generation", ts(skip))]
    sort_key: DateTime<Utc>,
}

impl AgendaEntry {
    pub fn to_display(&self) -> DisplayEvent {
        match self {
            AgendaEntry::Local(appt) => DisplayEvent {
                id: appt.id.to_string(),
                source: EventSource::Local,
                title: appt.title.clone(),
                start: format_utc_rfc3339(appt.date),
                end: format_utc_rfc3339(
                    appt.date + Duration::minutes(DEFAULT_EVENT_DURATION_MINS),
                ),
                all_day: false,
                location: appt.location.clone(),
                description: appt.notes.clone(),
                link: None,
                kind: Some(appt.kind),
                status: Some(appt.status),
                sort_key: appt.date,
            },
            AgendaEntry::Remote(event) => DisplayEvent {
                id: event.id.clone(),
                source: EventSource::Remote,
                title: event.title.clone(),
                start: display_time(&event.start),
                end: display_time(&event.end),
                all_day: event.all_day,
                location: event.location.clone(),
                description: event.description.clone(),
                link: Some(event.external_link.clone()).filter(|l| !l.is_empty()),
                kind: None,
                status: None,
                sort_key: event.start.sort_key(),
            },
        }
    }

    /// Local entries match on their stored type. Remote entries have no
    /// type, so they match when the title names it as whole words.
    pub fn matches(&self, filter: AgendaFilter) -> bool {
        let kind = match filter {
            AgendaFilter::All => return true,
            AgendaFilter::Kind(kind) => kind,
        };
        match self {
            AgendaEntry::Local(appt) => appt.kind == kind,
            AgendaEntry::Remote(event) => match kind {
                AppointmentKind::Other => !AppointmentKind::ALL
                    .iter()
                    .filter(|k| **k != AppointmentKind::Other)
                    .any(|k| title_mentions(&event.title, *k)),
                _ => title_mentions(&event.title, kind),
            },
        }
    }
}

fn display_time(time: &EventTime) -> String {
    match time {
        EventTime::DateTime(dt) => dt.to_rfc3339(),
        EventTime::Date(d) => d.format("%Y-%m-%d").to_string(),
    }
}

/// Case-insensitive whole-word match of the kind's name in `title`;
/// `open-home` matches "Open home", "open-home" and "OPEN HOME".
fn title_mentions(title: &str, kind: AppointmentKind) -> bool {
    let words: Vec<String> = title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    let needle: Vec<&str> = kind.as_str().split('-').collect();

    words
        .windows(needle.len())
        .any(|window| window.iter().zip(&needle).all(|(w, n)| w == n))
}

/// Agenda filter from the `filter` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgendaFilter {
    #[default]
    All,
    Kind(AppointmentKind),
}

impl FromStr for AgendaFilter {
    type Err = AppError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim().is_empty() || s.trim().eq_ignore_ascii_case("all") {
            return Ok(AgendaFilter::All);
        }
        AppointmentKind::parse(s)
            .map(AgendaFilter::Kind)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown filter: {}", s)))
    }
}

/// Merge, filter and order entries for display.
pub fn build_agenda(
    local: Vec<LocalAppointment>,
    remote: Vec<RemoteEvent>,
    filter: AgendaFilter,
) -> Vec<DisplayEvent> {
    let mut events: Vec<DisplayEvent> = local
        .into_iter()
        .map(AgendaEntry::Local)
        .chain(remote.into_iter().map(AgendaEntry::Remote))
        .filter(|entry| entry.matches(filter))
        .map(|entry| entry.to_display())
        .collect();
    events.sort_by_key(|e| e.sort_key);
    events
}

/// Agenda plus the state of the remote half.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Agenda {
    pub events: Vec<DisplayEvent>,
    /// The calendar is not connected or needs re-consent
    pub needs_auth: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_error: Option<String>,
}

/// Load the user's agenda. Remote failures degrade to local-only.
pub async fn load_agenda(
    appointments: &dyn AppointmentStore,
    calendar: &CalendarService,
    user_id: &str,
    filter: AgendaFilter,
) -> Result<Agenda> {
    let local = appointments.list(user_id).await?;

    let (remote, needs_auth, remote_error) = match calendar.list_upcoming_events(user_id).await {
        Ok(events) => (events, false, None),
        Err(e) if e.needs_auth() => (Vec::new(), true, None),
        Err(e) => {
            tracing::warn!(user_id, error = %e, "Remote events unavailable, showing local only");
            let message = match e {
                AppError::Provider(msg) => msg,
                _ => "Calendar unavailable".to_string(),
            };
            (Vec::new(), false, Some(message))
        }
    };

    Ok(Agenda {
        events: build_agenda(local, remote, filter),
        needs_auth,
        remote_error,
    })
}

// ─── CSV Export ──────────────────────────────────────────────────────────────

const CSV_COLUMNS: [&str; 7] = [
    "Title",
    "Start Date",
    "Start Time",
    "End Date",
    "End Time",
    "Location",
    "Description",
];

/// Render agenda events as CSV, one row per event in display order.
pub fn agenda_csv(events: &[DisplayEvent]) -> String {
    let mut out = csv_row(CSV_COLUMNS);
    for event in events {
        let (start_date, start_time) = split_display_time(&event.start, event.all_day);
        let (end_date, end_time) = split_display_time(&event.end, event.all_day);
        out.push_str(&csv_row([
            event.title.as_str(),
            &start_date,
            &start_time,
            &end_date,
            &end_time,
            event.location.as_deref().unwrap_or(""),
            event.description.as_deref().unwrap_or(""),
        ]));
    }
    out
}

fn csv_row<'a>(cells: impl IntoIterator<Item = &'a str>) -> String {
    let mut row = cells.into_iter().map(csv_cell).collect::<Vec<_>>().join(",");
    row.push_str("\r\n");
    row
}

// Cells starting with a formula trigger get a leading quote so spreadsheets
// show them as text.
fn csv_cell(value: &str) -> String {
    let value = match value.trim_start().chars().next() {
        Some('=' | '+' | '-' | '@') => format!("'{}", value),
        _ => value.to_string(),
    };
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value
    }
}

/// Date and time columns; all-day entries read "All day".
fn split_display_time(value: &str, all_day: bool) -> (String, String) {
    if all_day {
        return (value.to_string(), "All day".to_string());
    }
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => (dt.format("%Y-%m-%d").to_string(), dt.format("%H:%M").to_string()),
        Err(_) => (value.to_string(), String::new()),
    }
}
