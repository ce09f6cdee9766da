// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sync history ledger on Supabase's REST (PostgREST) interface.
//!
//! Provides:
//! - Append-only inserts of sync sessions
//! - Most-recent-first listing per user
//! - Cleanup of sandbox rows (sheet ids with the test prefix)
//!
//! Requests carry the caller's session token so the table's row-level
//! security policies apply.

use crate::config::SupabaseConfig;
use crate::db::tables;
use crate::error::AppError;
use crate::models::sync_session::TEST_SHEET_PREFIX;
use crate::models::{NewSyncSession, SyncSession};

/// Upper bound for history listings.
pub const MAX_HISTORY_LIMIT: u32 = 100;

#[derive(Clone)]
struct RestClient {
    http: reqwest::Client,
    rest_url: String,
    anon_key: String,
}

/// Ledger of sync attempts.
#[derive(Clone)]
pub struct SyncLedger {
    client: Option<RestClient>,
}

impl SyncLedger {
    pub fn new(config: &SupabaseConfig) -> Self {
        tracing::info!(url = %config.url, "Supabase ledger configured");
        Self {
            client: Some(RestClient {
                http: reqwest::Client::new(),
                rest_url: format!("{}/rest/v1", config.url),
                anon_key: config.anon_key.clone(),
            }),
        }
    }

    /// Offline ledger for tests: every operation returns an error.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&RestClient, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    fn request(
        &self,
        method: reqwest::Method,
        table: &str,
        session_token: &str,
    ) -> Result<reqwest::RequestBuilder, AppError> {
        let client = self.get_client()?;
        Ok(client
            .http
            .request(method, format!("{}/{}", client.rest_url, table))
            .header("apikey", &client.anon_key)
            .bearer_auth(session_token))
    }

    // ─── Sync Session Operations ─────────────────────────────────

    /// Insert a session row. Existing rows are never updated.
    pub async fn record(
        &self,
        session_token: &str,
        session: &NewSyncSession,
    ) -> Result<SyncSession, AppError> {
        let response = self
            .request(reqwest::Method::POST, tables::SYNC_SESSIONS, session_token)?
            .header("Prefer", "return=representation")
            .json(session)
            .send()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut rows: Vec<SyncSession> = check_response_json(response).await?;
        rows.pop()
            .ok_or_else(|| AppError::Database("Insert returned no row".to_string()))
    }

    /// Sessions for `user_id`, newest first, at most `limit` rows.
    pub async fn list_for_user(
        &self,
        session_token: &str,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<SyncSession>, AppError> {
        let limit = limit.clamp(1, MAX_HISTORY_LIMIT);
        let response = self
            .request(reqwest::Method::GET, tables::SYNC_SESSIONS, session_token)?
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", user_id)),
                ("order", "timestamp.desc".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        check_response_json(response).await
    }

    /// Delete the user's sandbox rows (sheet id starting with `test_`).
    ///
    /// Returns the deleted rows. Fails if any deleted row is not a test row.
    pub async fn delete_test_records(
        &self,
        session_token: &str,
        user_id: &str,
    ) -> Result<Vec<SyncSession>, AppError> {
        let response = self
            .request(reqwest::Method::DELETE, tables::SYNC_SESSIONS, session_token)?
            .header("Prefer", "return=representation")
            .query(&[
                ("user_id", format!("eq.{}", user_id)),
                ("sheet_id", format!("like.{}", test_prefix_pattern())),
            ])
            .send()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let deleted: Vec<SyncSession> = check_response_json(response).await?;
        // The filter runs server-side; make sure nothing else slipped through.
        if let Some(stray) = deleted.iter().find(|s| !s.is_test_record()) {
            tracing::error!(sheet_id = %stray.sheet_id, "Deleted a non-test sync session");
            return Err(AppError::Database(format!(
                "Cleanup deleted non-test sync session {}",
                stray.id
            )));
        }
        Ok(deleted)
    }
}

/// PostgREST `like` pattern for the reserved prefix. `_` is a single-char
/// wildcard in SQL LIKE, so it is escaped.
fn test_prefix_pattern() -> String {
    format!("{}*", TEST_SHEET_PREFIX.replace('_', "\\_"))
}

async fn check_response_json<T: for<'de> serde::Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Database(format!("HTTP {}: {}", status, body)));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Database(format!("JSON parse error: {}", e)))
}
