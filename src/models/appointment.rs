// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! First-party appointment records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Kind of appointment, as picked in the CRM's appointment form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentKind {
    Valuation,
    #[default]
    Meeting,
    Call,
    Inspection,
    Appraisal,
    Settlement,
    OpenHome,
    #[serde(other)]
    Other,
}

impl AppointmentKind {
    pub const ALL: [AppointmentKind; 8] = [
        AppointmentKind::Valuation,
        AppointmentKind::Meeting,
        AppointmentKind::Call,
        AppointmentKind::Inspection,
        AppointmentKind::Appraisal,
        AppointmentKind::Settlement,
        AppointmentKind::OpenHome,
        AppointmentKind::Other,
    ];

    /// Wire name (`open-home`, `meeting`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentKind::Valuation => "valuation",
            AppointmentKind::Meeting => "meeting",
            AppointmentKind::Call => "call",
            AppointmentKind::Inspection => "inspection",
            AppointmentKind::Appraisal => "appraisal",
            AppointmentKind::Settlement => "settlement",
            AppointmentKind::OpenHome => "open-home",
            AppointmentKind::Other => "other",
        }
    }

    /// Parse a wire name; unknown names are `None` rather than `Other`.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
/// Stored as free text; values this service does not know read as `Other`.
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
    #[serde(other)]
    Other,
}

/// Appointment stored in the `appointments` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LocalAppointment {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    /// Scheduled start
    pub date: DateTime<Utc>,
    pub location: Option<String>,
    pub notes: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: AppointmentKind,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: AppointmentStatus,
    /// Weak link to a contact; nulled when the contact is deleted
    pub contact_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Older rows carry NULL for type/status.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Fields for a new appointment (the store assigns id and timestamps).
#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub title: String,
    pub date: DateTime<Utc>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub kind: AppointmentKind,
    pub status: AppointmentStatus,
    pub contact_id: Option<String>,
}

impl NewAppointment {
    /// Materialize a row owned by `user_id`.
    pub fn into_record(self, user_id: &str, now: DateTime<Utc>) -> LocalAppointment {
        LocalAppointment {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            title: self.title,
            date: self.date,
            location: self.location,
            notes: self.notes,
            kind: self.kind,
            status: self.status,
            contact_id: self.contact_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppointmentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<AppointmentKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<Option<String>>,
}

impl AppointmentPatch {
    pub fn apply(&self, appointment: &mut LocalAppointment, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            appointment.title = title.clone();
        }
        if let Some(date) = self.date {
            appointment.date = date;
        }
        if let Some(location) = &self.location {
            appointment.location = location.clone();
        }
        if let Some(notes) = &self.notes {
            appointment.notes = notes.clone();
        }
        if let Some(kind) = self.kind {
            appointment.kind = kind;
        }
        if let Some(status) = self.status {
            appointment.status = status;
        }
        if let Some(contact_id) = &self.contact_id {
            appointment.contact_id = contact_id.clone();
        }
        appointment.updated_at = now;
    }
}
