// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Realty calendar sync: connects a CRM user's Google Calendar.
//!
//! This crate provides the backend API that manages the Google OAuth
//! credential for each user, lists and creates calendar events, and keeps
//! first-party appointments that are mirrored to Google when connected.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::{Config, StorageBackend};
use db::{AppointmentStore, CredentialStore, MemoryDb, PlatformDb};
use services::{CalendarService, IdentityVerifier};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub credentials: Arc<dyn CredentialStore>,
    pub appointments: Arc<dyn AppointmentStore>,
    pub identity: Arc<dyn IdentityVerifier>,
    pub calendar: CalendarService,
}

impl AppState {
    /// Wire services over the given stores.
    pub fn new(
        config: Config,
        credentials: Arc<dyn CredentialStore>,
        appointments: Arc<dyn AppointmentStore>,
        identity: Arc<dyn IdentityVerifier>,
    ) -> Self {
        let calendar = CalendarService::new(&config, credentials.clone());
        Self {
            config,
            credentials,
            appointments,
            identity,
            calendar,
        }
    }

    /// Build state from configuration, choosing the storage backend and
    /// identity verifier it names.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let (credentials, appointments): (Arc<dyn CredentialStore>, Arc<dyn AppointmentStore>) =
            match config.storage {
                StorageBackend::Platform => {
                    let db = Arc::new(PlatformDb::new(
                        &config.platform_url,
                        &config.platform_service_key,
                    ));
                    (db.clone() as Arc<dyn CredentialStore>, db as Arc<dyn AppointmentStore>)
                }
                StorageBackend::Memory => {
                    let db = Arc::new(MemoryDb::new());
                    (db.clone() as Arc<dyn CredentialStore>, db as Arc<dyn AppointmentStore>)
                }
            };
        let identity = services::identity::verifier_from_config(&config)?;

        Ok(Self::new(config, credentials, appointments, identity))
    }
}
