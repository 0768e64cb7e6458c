// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! OAuth client credentials and the platform service key are server-side
//! secrets; their absence is a startup failure, never a per-request error.

use std::env;

const DEFAULT_GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_GOOGLE_CALENDAR_API_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Where calendar credentials and appointments are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// The hosted platform's REST API.
    Platform,
    /// Process memory (local development and tests).
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Google OAuth client ID (public)
    pub google_client_id: String,
    /// Base URL of the hosted data/identity platform
    pub platform_url: String,
    /// Frontend URL the OAuth callback redirects back to
    pub app_url: String,
    /// Redirect URI registered with Google for the callback action
    pub oauth_redirect_uri: String,
    /// IANA time zone attached to date-times sent without an offset
    pub calendar_time_zone: String,
    /// Persistence backend
    pub storage: StorageBackend,
    /// Google consent screen URL
    pub google_auth_url: String,
    /// Google token endpoint
    pub google_token_url: String,
    /// Google Calendar v3 API base URL
    pub google_calendar_api_url: String,
    /// Server port
    pub port: u16,

    // --- Secrets ---
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// Platform service key (bypasses row-level security)
    pub platform_service_key: String,
    /// Platform JWT secret; when set, bearer tokens are verified locally
    pub platform_jwt_secret: Option<Vec<u8>>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            google_client_id: "test_client_id".to_string(),
            platform_url: "http://localhost:54321".to_string(),
            app_url: "http://localhost:5173".to_string(),
            oauth_redirect_uri: "http://localhost:8080/calendar?action=callback".to_string(),
            calendar_time_zone: "Australia/Sydney".to_string(),
            storage: StorageBackend::Memory,
            google_auth_url: DEFAULT_GOOGLE_AUTH_URL.to_string(),
            google_token_url: DEFAULT_GOOGLE_TOKEN_URL.to_string(),
            google_calendar_api_url: DEFAULT_GOOGLE_CALENDAR_API_URL.to_string(),
            port: 8080,
            google_client_secret: "test_secret".to_string(),
            platform_service_key: "test_service_key".to_string(),
            platform_jwt_secret: Some(b"test_jwt_secret_32_bytes_minimum!".to_vec()),
        }
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let public_url = env::var("PUBLIC_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| "http://localhost:8080".to_string());

        let storage = match env::var("STORAGE_BACKEND").as_deref() {
            Ok("memory") => StorageBackend::Memory,
            Ok("platform") | Err(_) => StorageBackend::Platform,
            Ok(other) => return Err(ConfigError::Invalid("STORAGE_BACKEND", other.to_string())),
        };

        Ok(Self {
            google_client_id: required("GOOGLE_CLIENT_ID")?,
            platform_url: required("PLATFORM_URL")?
                .trim_end_matches('/')
                .to_string(),
            app_url: env::var("APP_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            oauth_redirect_uri: env::var("OAUTH_REDIRECT_URI")
                .unwrap_or_else(|_| format!("{}/calendar?action=callback", public_url)),
            calendar_time_zone: env::var("CALENDAR_TIME_ZONE")
                .unwrap_or_else(|_| "Australia/Sydney".to_string()),
            storage,
            google_auth_url: env::var("GOOGLE_AUTH_URL")
                .unwrap_or_else(|_| DEFAULT_GOOGLE_AUTH_URL.to_string()),
            google_token_url: env::var("GOOGLE_TOKEN_URL")
                .unwrap_or_else(|_| DEFAULT_GOOGLE_TOKEN_URL.to_string()),
            google_calendar_api_url: env::var("GOOGLE_CALENDAR_API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_GOOGLE_CALENDAR_API_URL.to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),

            google_client_secret: required("GOOGLE_CLIENT_SECRET")?,
            platform_service_key: required("PLATFORM_SERVICE_KEY")?,
            platform_jwt_secret: env::var("PLATFORM_JWT_SECRET")
                .ok()
                .map(|v| v.trim().as_bytes().to_vec())
                .filter(|v| !v.is_empty()),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
