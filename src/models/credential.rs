// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stored Google Calendar OAuth credential.

use crate::error::AppError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Refresh the access token when it expires within this many seconds.
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// A user's calendar connection, one row per user.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarCredential {
    /// Platform user id (primary key)
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
    /// When `access_token` stops being accepted by Google
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CalendarCredential {
    /// Build a credential from a token grant received at `now`.
    pub fn issued(
        user_id: &str,
        access_token: String,
        refresh_token: String,
        expires_in_secs: i64,
        now: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            user_id: user_id.to_string(),
            access_token,
            refresh_token,
            expires_at: expiry_after(now, expires_in_secs)?,
            updated_at: now,
        })
    }

    /// True when the access token must be refreshed before use.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS)
    }
}

/// Instant a token granted at `now` with `expires_in` seconds of life expires.
///
/// `expires_in` comes from the token endpoint, so an out-of-range value is a
/// provider error rather than a panic.
pub fn expiry_after(now: DateTime<Utc>, expires_in_secs: i64) -> Result<DateTime<Utc>, AppError> {
    Duration::try_seconds(expires_in_secs)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| {
            AppError::Provider(format!("Invalid token lifetime: {}", expires_in_secs))
        })
}

// Tokens stay out of logs.
impl fmt::Debug for CalendarCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalendarCredential")
            .field("user_id", &self.user_id)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}
