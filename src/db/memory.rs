// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store for local development and tests.

use crate::db::{AppointmentStore, CredentialStore};
use crate::error::AppError;
use crate::models::{AppointmentPatch, CalendarCredential, LocalAppointment, NewAppointment};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Memory-backed implementation of both store traits.
///
/// Clones share the same maps.
#[derive(Clone, Default)]
pub struct MemoryDb {
    credentials: Arc<DashMap<String, CalendarCredential>>,
    appointments: Arc<DashMap<Uuid, LocalAppointment>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryDb {
    async fn get(&self, user_id: &str) -> Result<Option<CalendarCredential>, AppError> {
        Ok(self.credentials.get(user_id).map(|c| c.clone()))
    }

    async fn upsert(&self, credential: &CalendarCredential) -> Result<(), AppError> {
        self.credentials
            .insert(credential.user_id.clone(), credential.clone());
        Ok(())
    }

    async fn clear(&self, user_id: &str) -> Result<(), AppError> {
        self.credentials.remove(user_id);
        Ok(())
    }
}

#[async_trait]
impl AppointmentStore for MemoryDb {
    async fn list(&self, user_id: &str) -> Result<Vec<LocalAppointment>, AppError> {
        let mut appointments: Vec<LocalAppointment> = self
            .appointments
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        appointments.sort_by_key(|a| a.date);
        Ok(appointments)
    }

    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<LocalAppointment>, AppError> {
        Ok(self
            .appointments
            .get(&id)
            .filter(|a| a.user_id == user_id)
            .map(|a| a.clone()))
    }

    async fn create(
        &self,
        user_id: &str,
        appointment: NewAppointment,
    ) -> Result<LocalAppointment, AppError> {
        let record = appointment.into_record(user_id, Utc::now());
        self.appointments.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        user_id: &str,
        id: Uuid,
        patch: &AppointmentPatch,
    ) -> Result<Option<LocalAppointment>, AppError> {
        let Some(mut entry) = self.appointments.get_mut(&id) else {
            return Ok(None);
        };
        if entry.user_id != user_id {
            return Ok(None);
        }
        patch.apply(&mut entry, Utc::now());
        Ok(Some(entry.clone()))
    }

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool, AppError> {
        Ok(self
            .appointments
            .remove_if(&id, |_, a| a.user_id == user_id)
            .is_some())
    }

    async fn unlink_contact(&self, user_id: &str, contact_id: &str) -> Result<usize, AppError> {
        let now = Utc::now();
        let mut changed = 0;
        for mut entry in self.appointments.iter_mut() {
            if entry.user_id == user_id && entry.contact_id.as_deref() == Some(contact_id) {
                entry.contact_id = None;
                entry.updated_at = now;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppointmentKind, AppointmentStatus};
    use chrono::Duration;

    fn new_appointment(title: &str, offset_hours: i64, contact: Option<&str>) -> NewAppointment {
        NewAppointment {
            title: title.to_string(),
            date: Utc::now() + Duration::hours(offset_hours),
            location: None,
            notes: None,
            kind: AppointmentKind::Inspection,
            status: AppointmentStatus::Scheduled,
            contact_id: contact.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_credential_clear_is_idempotent() {
        let db = MemoryDb::new();
        let cred = CalendarCredential::issued("u1", "a".into(), "r".into(), 3600, Utc::now()).unwrap();

        CredentialStore::upsert(&db, &cred).await.unwrap();
        assert_eq!(CredentialStore::get(&db, "u1").await.unwrap(), Some(cred));

        db.clear("u1").await.unwrap();
        db.clear("u1").await.unwrap();
        assert_eq!(CredentialStore::get(&db, "u1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_appointments_are_scoped_and_ordered() {
        let db = MemoryDb::new();
        let later = db.create("u1", new_appointment("later", 48, None)).await.unwrap();
        let sooner = db.create("u1", new_appointment("sooner", 2, None)).await.unwrap();
        let other = db.create("u2", new_appointment("other", 1, None)).await.unwrap();

        let listed = db.list("u1").await.unwrap();
        assert_eq!(
            listed.iter().map(|a| a.id).collect::<Vec<_>>(),
            vec![sooner.id, later.id]
        );

        assert!(AppointmentStore::get(&db, "u1", other.id).await.unwrap().is_none());
        assert!(!db.delete("u1", other.id).await.unwrap());
        assert!(db.delete("u2", other.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_unlink_contact_nulls_references() {
        let db = MemoryDb::new();
        let linked = db
            .create("u1", new_appointment("linked", 1, Some("c1")))
            .await
            .unwrap();
        db.create("u1", new_appointment("other contact", 2, Some("c2")))
            .await
            .unwrap();

        assert_eq!(db.unlink_contact("u1", "c1").await.unwrap(), 1);

        let after = AppointmentStore::get(&db, "u1", linked.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.contact_id, None);
        assert_eq!(db.list("u1").await.unwrap().len(), 2);
    }
}
