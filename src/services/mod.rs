// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod agenda;
pub mod appointments;
pub mod calendar;
pub mod google_calendar;
pub mod google_oauth;
pub mod identity;

pub use agenda::{agenda_csv, Agenda, AgendaFilter, DisplayEvent};
pub use calendar::{CalendarService, ConnectError};
pub use google_calendar::CalendarClient;
pub use google_oauth::GoogleOAuthClient;
pub use identity::{AuthUser, IdentityVerifier, JwtIdentityVerifier, RemoteIdentityVerifier};
