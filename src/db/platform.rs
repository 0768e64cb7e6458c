// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! REST client for the hosted data platform with typed operations.
//!
//! Talks PostgREST dialect (`/rest/v1/<table>?col=eq.value`) using the
//! service key, so row-level security is enforced here by always filtering
//! on `user_id`.

use crate::db::{tables, AppointmentStore, CredentialStore};
use crate::error::AppError;
use crate::models::{AppointmentPatch, CalendarCredential, LocalAppointment, NewAppointment};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde::de::DeserializeOwned;
use uuid::Uuid;

const RETURN_REPRESENTATION: &str = "return=representation";

/// Platform database client.
#[derive(Clone)]
pub struct PlatformDb {
    http: reqwest::Client,
    rest_url: String,
    service_key: String,
}

impl PlatformDb {
    pub fn new(platform_url: &str, service_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            rest_url: format!("{}/rest/v1", platform_url.trim_end_matches('/')),
            service_key: service_key.to_string(),
        }
    }

    fn request(&self, method: Method, table: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    /// Send and parse a JSON array of rows.
    async fn rows<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Vec<T>, AppError> {
        let response = self.send(request).await?;
        response
            .json()
            .await
            .map_err(|e| AppError::Database(format!("JSON parse error: {}", e)))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, AppError> {
        let response = request
            .send()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::Database(format!("HTTP {}: {}", status, body)))
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{}", value)
}

#[async_trait]
impl CredentialStore for PlatformDb {
    async fn get(&self, user_id: &str) -> Result<Option<CalendarCredential>, AppError> {
        let rows: Vec<CalendarCredential> = self
            .rows(
                self.request(Method::GET, tables::CALENDAR_CREDENTIALS)
                    .query(&[("user_id", eq(user_id)), ("select", "*".to_string())]),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert(&self, credential: &CalendarCredential) -> Result<(), AppError> {
        self.send(
            self.request(Method::POST, tables::CALENDAR_CREDENTIALS)
                .query(&[("on_conflict", "user_id")])
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(credential),
        )
        .await?;
        Ok(())
    }

    async fn clear(&self, user_id: &str) -> Result<(), AppError> {
        self.send(
            self.request(Method::DELETE, tables::CALENDAR_CREDENTIALS)
                .query(&[("user_id", eq(user_id))]),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AppointmentStore for PlatformDb {
    async fn list(&self, user_id: &str) -> Result<Vec<LocalAppointment>, AppError> {
        self.rows(
            self.request(Method::GET, tables::APPOINTMENTS).query(&[
                ("user_id", eq(user_id)),
                ("order", "date.asc".to_string()),
            ]),
        )
        .await
    }

    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<LocalAppointment>, AppError> {
        let rows: Vec<LocalAppointment> = self
            .rows(
                self.request(Method::GET, tables::APPOINTMENTS)
                    .query(&[("id", eq(id)), ("user_id", eq(user_id))]),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn create(
        &self,
        user_id: &str,
        appointment: NewAppointment,
    ) -> Result<LocalAppointment, AppError> {
        let record = appointment.into_record(user_id, Utc::now());
        let rows: Vec<LocalAppointment> = self
            .rows(
                self.request(Method::POST, tables::APPOINTMENTS)
                    .header("Prefer", RETURN_REPRESENTATION)
                    .json(&record),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Insert returned no rows".to_string()))
    }

    async fn update(
        &self,
        user_id: &str,
        id: Uuid,
        patch: &AppointmentPatch,
    ) -> Result<Option<LocalAppointment>, AppError> {
        let mut body = serde_json::to_value(patch)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode patch: {}", e)))?;
        body["updated_at"] = serde_json::json!(Utc::now());

        let rows: Vec<LocalAppointment> = self
            .rows(
                self.request(Method::PATCH, tables::APPOINTMENTS)
                    .query(&[("id", eq(id)), ("user_id", eq(user_id))])
                    .header("Prefer", RETURN_REPRESENTATION)
                    .json(&body),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool, AppError> {
        let rows: Vec<serde_json::Value> = self
            .rows(
                self.request(Method::DELETE, tables::APPOINTMENTS)
                    .query(&[
                        ("id", eq(id)),
                        ("user_id", eq(user_id)),
                        ("select", "id".to_string()),
                    ])
                    .header("Prefer", RETURN_REPRESENTATION),
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn unlink_contact(&self, user_id: &str, contact_id: &str) -> Result<usize, AppError> {
        let rows: Vec<serde_json::Value> = self
            .rows(
                self.request(Method::PATCH, tables::APPOINTMENTS)
                    .query(&[
                        ("user_id", eq(user_id)),
                        ("contact_id", eq(contact_id)),
                        ("select", "id".to_string()),
                    ])
                    .header("Prefer", RETURN_REPRESENTATION)
                    .json(&serde_json::json!({
                        "contact_id": null,
                        "updated_at": Utc::now(),
                    })),
            )
            .await?;
        tracing::info!(user_id, contact_id, count = rows.len(), "Unlinked appointments from contact");
        Ok(rows.len())
    }
}
