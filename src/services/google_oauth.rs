// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth 2.0 client: consent URL, code exchange and token refresh.

use crate::config::Config;
use crate::error::AppError;
use serde::Deserialize;

/// Read/write access to the user's calendars.
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// Google OAuth client holding the server-side client credentials.
#[derive(Clone)]
pub struct GoogleOAuthClient {
    http: reqwest::Client,
    auth_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GoogleOAuthClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth_url: config.google_auth_url.clone(),
            token_url: config.google_token_url.clone(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: config.oauth_redirect_uri.clone(),
        }
    }

    /// Build the consent screen URL.
    ///
    /// `state` comes back untouched on the callback and is how the callback
    /// learns which user consented. Offline access plus forced consent makes
    /// Google issue a refresh token every time.
    pub fn consent_url(&self, state: &str) -> String {
        format!(
            "{}?\
             client_id={}&\
             redirect_uri={}&\
             response_type=code&\
             scope={}&\
             access_type=offline&\
             prompt=consent&\
             state={}",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(CALENDAR_SCOPE),
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for tokens.
    ///
    /// On rejection the error carries Google's `error_description` (or
    /// `error`) so the callback can hand it back to the UI.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Google token exchange failed");
            return Err(AppError::Provider(
                OAuthErrorBody::describe(&body)
                    .unwrap_or_else(|| format!("Token exchange failed with status {}", status)),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to parse token response: {}", e)))
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// A 400/401 from Google means the grant is no longer usable and maps to
    /// `ReauthRequired`; anything else is treated as transient.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Token refresh request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| AppError::Provider(format!("Failed to parse token response: {}", e)));
        }

        let body = response.text().await.unwrap_or_default();
        if status.as_u16() == 400 || status.as_u16() == 401 {
            let reason = OAuthErrorBody::describe(&body).unwrap_or_default();
            tracing::warn!(status = %status, reason = %reason, "Google rejected refresh token");
            return Err(AppError::ReauthRequired);
        }

        Err(AppError::Provider(format!(
            "Token refresh failed with status {}",
            status
        )))
    }
}

/// Successful response from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Lifetime of `access_token` in seconds
    pub expires_in: i64,
    /// Present on code exchange; on refresh only when Google rotates it
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Error body from the token endpoint.
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl OAuthErrorBody {
    fn describe(body: &str) -> Option<String> {
        let parsed: OAuthErrorBody = serde_json::from_str(body).ok()?;
        Some(parsed.error_description.unwrap_or(parsed.error))
    }
}
