// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! High-level calendar service with token management.
//!
//! Every provider call goes through two explicit steps:
//! 1. `ensure_fresh_token` refreshes the stored credential if it expires
//!    within 60 seconds and persists the result
//! 2. the Calendar API call runs with that token
//!
//! If Google still answers 401 with a token we did not just refresh, the
//! token is refreshed once more and the call retried once. There is no
//! loop; a second rejection surfaces as `ReauthRequired`.
//!
//! Nothing is cached or locked in-process. Two concurrent requests for the
//! same user may both refresh; the last credential written wins.

use crate::config::Config;
use crate::db::CredentialStore;
use crate::error::{AppError, Result};
use crate::models::credential::expiry_after;
use crate::models::{CalendarCredential, EventDraft, EventWindow, RemoteEvent};
use crate::services::google_calendar::CalendarClient;
use crate::services::google_oauth::GoogleOAuthClient;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;

/// Manages the calendar connection lifecycle and all Calendar API calls.
#[derive(Clone)]
pub struct CalendarService {
    oauth: GoogleOAuthClient,
    client: CalendarClient,
    credentials: Arc<dyn CredentialStore>,
}

impl CalendarService {
    pub fn new(config: &Config, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            oauth: GoogleOAuthClient::new(config),
            client: CalendarClient::new(
                &config.google_calendar_api_url,
                &config.calendar_time_zone,
            ),
            credentials,
        }
    }

    /// Consent URL correlating the callback to `user_id` via `state`.
    pub fn consent_url(&self, user_id: &str) -> String {
        self.oauth.consent_url(user_id)
    }

    // ─── Token Management ────────────────────────────────────────────────────

    async fn load_credential(&self, user_id: &str) -> Result<CalendarCredential> {
        self.credentials
            .get(user_id)
            .await?
            .ok_or(AppError::NotConnected)
    }

    /// Return a credential whose access token is valid for at least another
    /// minute, refreshing (and persisting) it first if necessary.
    pub async fn ensure_fresh_token(
        &self,
        credential: CalendarCredential,
    ) -> Result<CalendarCredential> {
        if !credential.needs_refresh(Utc::now()) {
            return Ok(credential);
        }
        tracing::info!(user_id = %credential.user_id, "Access token expiring, refreshing");
        self.refresh(credential).await
    }

    /// Exchange the refresh token and store the new access token.
    ///
    /// On failure the stored credential is left untouched.
    async fn refresh(&self, credential: CalendarCredential) -> Result<CalendarCredential> {
        let grant = self.oauth.refresh(&credential.refresh_token).await?;

        let now = Utc::now();
        let expires_at = expiry_after(now, grant.expires_in)?;
        let refreshed = CalendarCredential {
            user_id: credential.user_id,
            access_token: grant.access_token,
            refresh_token: grant.refresh_token.unwrap_or(credential.refresh_token),
            expires_at,
            updated_at: now,
        };

        self.credentials.upsert(&refreshed).await?;
        tracing::info!(user_id = %refreshed.user_id, "Token refreshed and stored");
        Ok(refreshed)
    }

    /// Run `call` with a valid access token for `user_id`.
    async fn with_access_token<T, F, Fut>(&self, user_id: &str, call: F) -> Result<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let stored = self.load_credential(user_id).await?;
        let was_stale = stored.needs_refresh(Utc::now());
        let credential = self.ensure_fresh_token(stored).await?;

        match call(credential.access_token.clone()).await {
            Err(AppError::TokenExpired) if was_stale => {
                tracing::warn!(user_id, "Freshly refreshed token rejected by Google");
                Err(AppError::ReauthRequired)
            }
            Err(AppError::TokenExpired) => {
                tracing::info!(user_id, "Access token rejected, refreshing once and retrying");
                let refreshed = self.refresh(credential).await?;
                match call(refreshed.access_token).await {
                    Err(AppError::TokenExpired) => Err(AppError::ReauthRequired),
                    other => other,
                }
            }
            other => other,
        }
    }

    // ─── API Wrappers ────────────────────────────────────────────────────────

    /// Events in the next 30 days on the user's primary calendar.
    pub async fn list_upcoming_events(&self, user_id: &str) -> Result<Vec<RemoteEvent>> {
        let window = EventWindow::upcoming(Utc::now());
        let client = &self.client;
        let events = self
            .with_access_token(user_id, move |token| async move {
                client.list_events(&token, window).await
            })
            .await?;

        tracing::info!(user_id, count = events.len(), "Fetched calendar events");
        Ok(events)
    }

    /// Create an event on the user's primary calendar.
    pub async fn create_event(&self, user_id: &str, draft: &EventDraft) -> Result<RemoteEvent> {
        let client = &self.client;
        let event = self
            .with_access_token(user_id, move |token| async move {
                client.create_event(&token, draft).await
            })
            .await?;

        tracing::info!(user_id, event_id = %event.id, "Calendar event created");
        Ok(event)
    }

    // ─── Connection Lifecycle ────────────────────────────────────────────────

    /// Handle the OAuth callback: exchange `code` and store the credential.
    pub async fn connect(
        &self,
        user_id: &str,
        code: &str,
    ) -> std::result::Result<CalendarCredential, ConnectError> {
        let grant = self.oauth.exchange_code(code).await.map_err(|e| match e {
            AppError::Provider(msg) => ConnectError::Exchange(msg),
            other => ConnectError::Exchange(other.to_string()),
        })?;

        // Google omits the refresh token when consent was already granted;
        // keep the one we have rather than storing an unusable credential.
        let refresh_token = match grant.refresh_token {
            Some(token) => token,
            None => self
                .credentials
                .get(user_id)
                .await
                .map_err(ConnectError::Storage)?
                .map(|existing| existing.refresh_token)
                .ok_or(ConnectError::MissingRefreshToken)?,
        };

        let credential = CalendarCredential::issued(
            user_id,
            grant.access_token,
            refresh_token,
            grant.expires_in,
            Utc::now(),
        )
        .map_err(|e| match e {
            AppError::Provider(msg) => ConnectError::Exchange(msg),
            other => ConnectError::Exchange(other.to_string()),
        })?;

        self.credentials
            .upsert(&credential)
            .await
            .map_err(ConnectError::Storage)?;

        tracing::info!(user_id, "Calendar connected, credential stored");
        Ok(credential)
    }

    /// Forget the user's calendar credential. Safe to repeat.
    pub async fn disconnect(&self, user_id: &str) -> Result<()> {
        self.credentials.clear(user_id).await?;
        tracing::info!(user_id, "Calendar disconnected");
        Ok(())
    }

    /// Whether a credential is stored (it may still turn out to be revoked).
    pub async fn is_connected(&self, user_id: &str) -> Result<bool> {
        Ok(self.credentials.get(user_id).await?.is_some())
    }
}

/// Why the OAuth callback could not connect the calendar.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("{0}")]
    Exchange(String),

    #[error("missing_refresh_token")]
    MissingRefreshToken,

    #[error("storage_failed")]
    Storage(#[source] AppError),
}

impl ConnectError {
    /// Value for the `calendar_error` redirect parameter.
    pub fn code(&self) -> String {
        self.to_string()
    }
}
