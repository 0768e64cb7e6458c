// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistence layer.
//!
//! Handlers only see the two narrow store traits; `PlatformDb` backs them
//! with the hosted platform's REST API and `MemoryDb` with process memory.

pub mod memory;
pub mod platform;

pub use memory::MemoryDb;
pub use platform::PlatformDb;

use crate::error::AppError;
use crate::models::{AppointmentPatch, CalendarCredential, LocalAppointment, NewAppointment};
use async_trait::async_trait;
use uuid::Uuid;

/// Table names as constants.
pub mod tables {
    pub const CALENDAR_CREDENTIALS: &str = "calendar_credentials";
    pub const APPOINTMENTS: &str = "appointments";
}

/// Calendar credentials keyed by user id.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<CalendarCredential>, AppError>;

    /// Insert or replace the user's credential (last write wins).
    async fn upsert(&self, credential: &CalendarCredential) -> Result<(), AppError>;

    /// Remove the user's credential. Succeeds when none exists.
    async fn clear(&self, user_id: &str) -> Result<(), AppError>;
}

/// Appointments, always scoped to the owning user.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// All of the user's appointments ordered by date.
    async fn list(&self, user_id: &str) -> Result<Vec<LocalAppointment>, AppError>;

    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<LocalAppointment>, AppError>;

    async fn create(
        &self,
        user_id: &str,
        appointment: NewAppointment,
    ) -> Result<LocalAppointment, AppError>;

    /// Returns `None` when the appointment doesn't exist for this user.
    async fn update(
        &self,
        user_id: &str,
        id: Uuid,
        patch: &AppointmentPatch,
    ) -> Result<Option<LocalAppointment>, AppError>;

    /// Returns whether a row was deleted.
    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool, AppError>;

    /// Null out `contact_id` on every appointment pointing at `contact_id`.
    /// Returns the number of appointments changed.
    async fn unlink_contact(&self, user_id: &str, contact_id: &str) -> Result<usize, AppError>;
}
