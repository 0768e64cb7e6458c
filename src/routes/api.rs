// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users: appointments and the agenda.

use crate::error::{AppError, Result};
use crate::models::{
    AppointmentKind, AppointmentPatch, AppointmentStatus, LocalAppointment, NewAppointment,
};
use crate::services::agenda::{agenda_csv, load_agenda, Agenda, AgendaFilter};
use crate::services::appointments::schedule;
use crate::services::AuthUser;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const MAX_LOCATION_LEN: usize = 500;
const MAX_NOTES_LEN: usize = 5000;

/// API routes (require authentication via bearer token).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/appointments",
            get(list_appointments).post(create_appointment),
        )
        .route(
            "/api/appointments/{id}",
            get(get_appointment)
                .put(update_appointment)
                .delete(delete_appointment),
        )
        .route(
            "/api/contacts/{contact_id}/appointments",
            delete(unlink_contact_appointments),
        )
        .route("/api/agenda", get(get_agenda))
        .route("/api/agenda/export", get(export_agenda))
        .route("/api/calendar/status", get(get_calendar_status))
}

// ─── Appointments ────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AppointmentsResponse {
    pub appointments: Vec<LocalAppointment>,
}

/// List the caller's appointments, earliest first.
async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<AppointmentsResponse>> {
    let appointments = state.appointments.list(&user.user_id).await?;
    Ok(Json(AppointmentsResponse { appointments }))
}

async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<LocalAppointment>> {
    state
        .appointments
        .get(&user.user_id, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Appointment {}", id)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAppointmentRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub date: DateTime<Utc>,
    /// Only used for the calendar mirror; appointments store a start date
    pub end: Option<DateTime<Utc>>,
    #[validate(length(max = 500))]
    pub location: Option<String>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: AppointmentKind,
    #[serde(default)]
    pub status: AppointmentStatus,
    pub contact_id: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CreateAppointmentResponse {
    pub appointment: LocalAppointment,
    /// Whether a copy was written to the user's Google Calendar
    pub mirrored: bool,
}

/// Create an appointment and mirror it to Google when connected.
async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<CreateAppointmentResponse>)> {
    req.validate()?;

    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("title must not be blank".to_string()));
    }

    let new = NewAppointment {
        title: title.to_string(),
        date: req.date,
        location: non_blank(req.location),
        notes: non_blank(req.notes),
        kind: req.kind,
        status: req.status,
        contact_id: non_blank(req.contact_id),
    };

    let scheduled = schedule(
        state.appointments.as_ref(),
        &state.calendar,
        &user.user_id,
        new,
        req.end,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateAppointmentResponse {
            appointment: scheduled.appointment,
            mirrored: scheduled.mirrored,
        }),
    ))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Present-but-null deserializes to `Some(None)`; absent stays `None`.
fn double_option<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateAppointmentRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    #[serde(rename = "type")]
    pub kind: Option<AppointmentKind>,
    pub status: Option<AppointmentStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub contact_id: Option<Option<String>>,
}

impl UpdateAppointmentRequest {
    fn into_patch(self) -> Result<AppointmentPatch> {
        let title = match self.title {
            Some(t) if t.trim().is_empty() => {
                return Err(AppError::BadRequest("title must not be blank".to_string()))
            }
            other => other.map(|t| t.trim().to_string()),
        };
        check_len("location", &self.location, MAX_LOCATION_LEN)?;
        check_len("notes", &self.notes, MAX_NOTES_LEN)?;

        Ok(AppointmentPatch {
            title,
            date: self.date,
            location: self.location.map(non_blank),
            notes: self.notes.map(non_blank),
            kind: self.kind,
            status: self.status,
            contact_id: self.contact_id.map(non_blank),
        })
    }
}

fn check_len(field: &str, value: &Option<Option<String>>, max: usize) -> Result<()> {
    match value {
        Some(Some(v)) if v.chars().count() > max => Err(AppError::BadRequest(format!(
            "{} must be at most {} characters",
            field, max
        ))),
        _ => Ok(()),
    }
}

/// Partially update one of the caller's appointments.
async fn update_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAppointmentRequest>,
) -> Result<Json<LocalAppointment>> {
    req.validate()?;
    let patch = req.into_patch()?;

    let updated = state
        .appointments
        .update(&user.user_id, id, &patch)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Appointment {}", id)))?;

    tracing::info!(user_id = %user.user_id, appointment_id = %id, "Appointment updated");
    Ok(Json(updated))
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

async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>> {
    if !state.appointments.delete(&user.user_id, id).await? {
        return Err(AppError::NotFound(format!("Appointment {}", id)));
    }

    tracing::info!(user_id = %user.user_id, appointment_id = %id, "Appointment deleted");
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UnlinkResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub unlinked: usize,
}

/// Called when a contact is deleted: its appointments stay, unlinked.
async fn unlink_contact_appointments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(contact_id): Path<String>,
) -> Result<Json<UnlinkResponse>> {
    let unlinked = state
        .appointments
        .unlink_contact(&user.user_id, &contact_id)
        .await?;

    tracing::info!(
        user_id = %user.user_id,
        contact_id = %contact_id,
        unlinked,
        "Contact appointments unlinked"
    );
    Ok(Json(UnlinkResponse { unlinked }))
}

// ─── Agenda ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct AgendaQuery {
    /// `all` or an appointment type
    filter: Option<String>,
}

/// Local appointments merged with upcoming Google events.
async fn get_agenda(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<AgendaQuery>,
) -> Result<Json<Agenda>> {
    let filter: AgendaFilter = params.filter.as_deref().unwrap_or("all").parse()?;

    let agenda = load_agenda(
        state.appointments.as_ref(),
        &state.calendar,
        &user.user_id,
        filter,
    )
    .await?;

    tracing::debug!(
        user_id = %user.user_id,
        count = agenda.events.len(),
        needs_auth = agenda.needs_auth,
        "Agenda loaded"
    );
    Ok(Json(agenda))
}

/// Download the filtered agenda as `schedule-<date>.csv`.
async fn export_agenda(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<AgendaQuery>,
) -> Result<impl IntoResponse> {
    let filter: AgendaFilter = params.filter.as_deref().unwrap_or("all").parse()?;

    let agenda = load_agenda(
        state.appointments.as_ref(),
        &state.calendar,
        &user.user_id,
        filter,
    )
    .await?;

    let disposition = format!(
        "attachment; filename=\"schedule-{}.csv\"",
        Utc::now().format("%Y-%m-%d")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        agenda_csv(&agenda.events),
    ))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CalendarStatusResponse {
    pub connected: bool,
}

/// Whether a calendar credential is stored for the caller.
async fn get_calendar_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<CalendarStatusResponse>> {
    let connected = state.calendar.is_connected(&user.user_id).await?;
    Ok(Json(CalendarStatusResponse { connected }))
}
