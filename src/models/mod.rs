// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod appointment;
pub mod credential;
pub mod event;

pub use appointment::{
    AppointmentKind, AppointmentPatch, AppointmentStatus, LocalAppointment, NewAppointment,
};
pub use credential::CalendarCredential;
pub use event::{EventDraft, EventInstant, EventTime, EventWindow, RemoteEvent};
