// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Sheet-Sync: copy HubSpot website pages into a Google Sheet
//!
//! This crate provides the backend API for the sync dashboard: Google and
//! HubSpot connections, page fetching and filtering, sheet writes and the
//! sync history ledger.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::SyncLedger;
use services::{CredentialStore, GoogleSheetsGateway, HubSpotGateway, InFlightSyncs};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub credentials: CredentialStore,
    pub google: GoogleSheetsGateway,
    pub hubspot: HubSpotGateway,
    pub ledger: SyncLedger,
    pub in_flight: InFlightSyncs,
}

impl AppState {
    /// Build every client once from the loaded configuration.
    pub fn new(config: Config, ledger: SyncLedger) -> Self {
        Self {
            credentials: CredentialStore::new(config.cookies_secure()),
            google: GoogleSheetsGateway::new(config.google.clone()),
            hubspot: HubSpotGateway::new(config.hubspot.clone()),
            ledger,
            in_flight: InFlightSyncs::new(),
            config,
        }
    }
}
