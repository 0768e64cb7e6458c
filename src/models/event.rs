// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar event shapes: normalized remote events and drafts to create.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Length given to events created without an explicit end.
pub const DEFAULT_EVENT_DURATION_MINS: i64 = 60;

/// How far ahead the upcoming-events listing looks.
pub const UPCOMING_WINDOW_DAYS: i64 = 30;

/// Start or end of a remote event: a timed instant or an all-day date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventTime {
    DateTime(DateTime<FixedOffset>),
    Date(NaiveDate),
}

impl EventTime {
    pub fn is_all_day(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    /// Instant used for ordering; all-day dates sort at UTC midnight.
    pub fn sort_key(&self) -> DateTime<Utc> {
        match self {
            EventTime::DateTime(dt) => dt.with_timezone(&Utc),
            EventTime::Date(d) => d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc(),
        }
    }
}

/// Read-only mirror of a Google Calendar entry. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEvent {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub start: EventTime,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub end: EventTime,
    pub all_day: bool,
    pub location: Option<String>,
    /// Link to the event in the Google Calendar UI
    pub external_link: String,
}

/// A date-time supplied by a client when creating an event.
///
/// Clients may send either an RFC 3339 timestamp or a wall-clock time with
/// no offset; the latter is interpreted in the configured calendar time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventInstant {
    Zoned(DateTime<FixedOffset>),
    Floating(NaiveDateTime),
}

impl EventInstant {
    /// Format for the Google `dateTime` field.
    pub fn to_google_string(&self) -> String {
        match self {
            EventInstant::Zoned(dt) => dt.to_rfc3339(),
            EventInstant::Floating(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }

    pub fn plus(&self, duration: Duration) -> Self {
        match self {
            EventInstant::Zoned(dt) => EventInstant::Zoned(*dt + duration),
            EventInstant::Floating(dt) => EventInstant::Floating(*dt + duration),
        }
    }

    /// Whether `self` is strictly after `other`.
    ///
    /// Returns `None` when one side carries an offset and the other doesn't.
    pub fn is_after(&self, other: &EventInstant) -> Option<bool> {
        match (self, other) {
            (EventInstant::Zoned(a), EventInstant::Zoned(b)) => Some(a > b),
            (EventInstant::Floating(a), EventInstant::Floating(b)) => Some(a > b),
            _ => None,
        }
    }
}

impl From<DateTime<Utc>> for EventInstant {
    fn from(dt: DateTime<Utc>) -> Self {
        EventInstant::Zoned(dt.fixed_offset())
    }
}

impl FromStr for EventInstant {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(EventInstant::Zoned(dt));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
            .map(EventInstant::Floating)
    }
}

/// An event to create on the remote calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub title: String,
    pub description: Option<String>,
    pub start: EventInstant,
    pub end: Option<EventInstant>,
    pub location: Option<String>,
}

impl EventDraft {
    /// The end to send: the explicit end, or one default duration after start.
    pub fn resolved_end(&self) -> EventInstant {
        self.end.unwrap_or_else(|| {
            self.start
                .plus(Duration::minutes(DEFAULT_EVENT_DURATION_MINS))
        })
    }
}

/// Half-open time range `[time_min, time_max)` for listing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventWindow {
    pub time_min: DateTime<Utc>,
    pub time_max: DateTime<Utc>,
}

impl EventWindow {
    /// The listing window starting at `now`.
    pub fn upcoming(now: DateTime<Utc>) -> Self {
        Self {
            time_min: now,
            time_max: now + Duration::days(UPCOMING_WINDOW_DAYS),
        }
    }
}
