// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sheet-Sync API Server
//!
//! Backend for the sync dashboard: connects a Google account and a HubSpot
//! private app, and copies website pages into a Google Sheet tab.

use sheet_sync::{config::Config, db::SyncLedger, AppState};
use std::sync::Arc;
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        google_configured = config.google.client_id.is_some(),
        hubspot_site_domain = config.hubspot.site_domain.is_some(),
        "Starting Sheet-Sync API"
    );

    // Every upstream client is built once here and shared
    let ledger = SyncLedger::new(&config.supabase);
    let port = config.port;
    let state = Arc::new(AppState::new(config, ledger));

    // Build router
    let app = sheet_sync::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let mut filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    if let Ok(directive) = "sheet_sync=debug".parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::registry().with(filter).with(format).init();
}
