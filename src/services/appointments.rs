// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scheduling appointments locally with a best-effort calendar mirror.

use crate::db::AppointmentStore;
use crate::error::{AppError, Result};
use crate::models::{EventDraft, EventInstant, LocalAppointment, NewAppointment};
use crate::services::CalendarService;
use chrono::{DateTime, Utc};

/// Result of scheduling: the stored row and whether Google has a copy.
#[derive(Debug, Clone)]
pub struct Scheduled {
    pub appointment: LocalAppointment,
    pub mirrored: bool,
}

/// Persist `new` for `user_id`, then mirror it to the user's calendar.
///
/// The local row is written first and is never rolled back; a failed
/// mirror only shows up as `mirrored: false`.
pub async fn schedule(
    store: &dyn AppointmentStore,
    calendar: &CalendarService,
    user_id: &str,
    new: NewAppointment,
    end: Option<DateTime<Utc>>,
) -> Result<Scheduled> {
    if let Some(end) = end {
        if end <= new.date {
            return Err(AppError::BadRequest(
                "end must be after the appointment date".to_string(),
            ));
        }
    }

    let appointment = store.create(user_id, new).await?;
    tracing::info!(user_id, appointment_id = %appointment.id, "Appointment created");

    let draft = EventDraft {
        title: appointment.title.clone(),
        description: appointment.notes.clone(),
        start: EventInstant::from(appointment.date),
        end: end.map(EventInstant::from),
        location: appointment.location.clone(),
    };

    let mirrored = match calendar.create_event(user_id, &draft).await {
        Ok(event) => {
            tracing::info!(
                user_id,
                appointment_id = %appointment.id,
                event_id = %event.id,
                "Appointment mirrored to calendar"
            );
            true
        }
        Err(AppError::NotConnected) => false,
        Err(e) => {
            tracing::warn!(
                user_id,
                appointment_id = %appointment.id,
                error = %e,
                "Calendar mirror failed; appointment kept locally"
            );
            false
        }
    };

    Ok(Scheduled {
        appointment,
        mirrored,
    })
}
