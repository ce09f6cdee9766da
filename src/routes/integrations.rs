// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Sheets integration routes.

use axum::{extract::State, routing::get, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::services::SpreadsheetSummary;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/integrations/google/sheets", get(list_sheets))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SheetsResponse {
    pub sheets: Vec<SpreadsheetSummary>,
}

/// List the spreadsheets the connected Google account can see.
async fn list_sheets(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SheetsResponse>)> {
    let (jar, access_token) = google_access_token(&state, jar).await?;

    let sheets = state.google.list_spreadsheets(&access_token).await?;
    tracing::debug!(count = sheets.len(), "Listed Google spreadsheets");

    Ok((jar, Json(SheetsResponse { sheets })))
}

/// Get a usable Google access token from the cookies, refreshing it first
/// if it has expired.
///
/// Returns the jar to send back, which carries the new tokens after a
/// refresh. Fails with `NotAuthenticated` when nothing usable is stored.
pub(crate) async fn google_access_token(
    state: &AppState,
    jar: CookieJar,
) -> Result<(CookieJar, String)> {
    let credential = state
        .credentials
        .load_google_credential(&jar)
        .ok_or(AppError::NotAuthenticated)?;

    let now = chrono::Utc::now();
    if !credential.is_expired(now) {
        return Ok((jar, credential.access_token));
    }

    if !credential.can_refresh() {
        tracing::info!("Google access token expired and no refresh token stored");
        return Err(AppError::NotAuthenticated);
    }
    let refresh_token = credential.refresh_token.unwrap_or_default();

    let grant = match state.google.refresh_access_token(&refresh_token).await {
        Ok(grant) => grant,
        Err(AppError::Configuration(msg)) => return Err(AppError::Configuration(msg)),
        Err(e) => {
            tracing::warn!(error = %e, "Google token refresh failed");
            return Err(AppError::NotAuthenticated);
        }
    };

    let access_token = grant.access_token.clone();
    let jar = state.credentials.store_google_tokens(jar, &grant, now);
    Ok((jar, access_token))
}
