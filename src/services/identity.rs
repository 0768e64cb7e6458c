// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Caller identity: resolve a platform bearer token to a user id.
//!
//! With the platform's JWT secret configured, tokens are verified locally.
//! Otherwise the platform's auth endpoint is asked who the token belongs to.

use crate::config::Config;
use crate::error::AppError;
use anyhow::Context;
use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const CLOCK_SKEW_SECS: u64 = 30;

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
}

/// Turns a bearer token into an `AuthUser`.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthUser, AppError>;
}

/// Claims carried by platform session tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (platform user id)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Local HS256 verification with the platform's JWT secret.
pub struct JwtIdentityVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        // Platform tokens carry aud="authenticated"; the subject is what matters.
        validation.validate_aud = false;
        validation.leeway = CLOCK_SKEW_SECS;

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

#[async_trait]
impl IdentityVerifier for JwtIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<AuthUser, AppError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "JWT validation failed");
            AppError::Unauthorized
        })?;

        if data.claims.sub.trim().is_empty() {
            return Err(AppError::Unauthorized);
        }

        Ok(AuthUser {
            user_id: data.claims.sub,
        })
    }
}

/// Asks the platform's `/auth/v1/user` endpoint to resolve the token.
pub struct RemoteIdentityVerifier {
    http: reqwest::Client,
    user_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct PlatformUser {
    id: String,
}

impl RemoteIdentityVerifier {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building identity HTTP client")?;

        Ok(Self {
            http,
            user_url: format!("{}/auth/v1/user", config.platform_url),
            api_key: config.platform_service_key.clone(),
        })
    }
}

#[async_trait]
impl IdentityVerifier for RemoteIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<AuthUser, AppError> {
        let response = self
            .http
            .get(&self.user_url)
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Identity lookup failed: {}", e)))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(AppError::Unauthorized);
        }
        if !status.is_success() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "Identity lookup returned {}",
                status
            )));
        }

        let user: PlatformUser = response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Bad identity response: {}", e)))?;

        Ok(AuthUser { user_id: user.id })
    }
}

/// Pick the verifier for this deployment.
pub fn verifier_from_config(config: &Config) -> anyhow::Result<Arc<dyn IdentityVerifier>> {
    let verifier: Arc<dyn IdentityVerifier> = match &config.platform_jwt_secret {
        Some(secret) => Arc::new(JwtIdentityVerifier::new(secret)),
        None => {
            tracing::info!("No JWT secret configured, resolving callers via platform auth API");
            Arc::new(RemoteIdentityVerifier::new(config)?)
        }
    };
    Ok(verifier)
}

/// Create a session JWT for `user_id` (used by tests and local tooling).
pub fn create_jwt(user_id: &str, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + 60 * 60, // 1 hour
        role: Some("authenticated".to_string()),
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}
