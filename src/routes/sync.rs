// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sync and sync-history routes (authenticated).

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::sync_session::{CONTENT_TYPE_PAGES, TEST_SHEET_PREFIX};
use crate::models::{HubSpotPage, NewSyncSession, PageFilter, SyncSession};
use crate::routes::integrations::google_access_token;
use crate::services::sync::SyncContext;
use crate::services::{SyncTarget, SyncWorkflow};
use crate::AppState;

const DEFAULT_HISTORY_LIMIT: u32 = 20;

/// Sessions returned alongside a sandbox insert.
const SANDBOX_HISTORY_LIMIT: u32 = 5;
const SANDBOX_TAB_NAME: &str = "API Test Tab";
const SANDBOX_ROWS_SYNCED: i64 = 3;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sync", post(sync_pages))
        .route("/sync/history", get(sync_history))
        .route(
            "/sync/test-records",
            post(create_test_record).delete(delete_test_records),
        )
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    #[validate(length(min = 1, max = 200, message = "A sheet must be selected"))]
    pub sheet_id: String,
    #[validate(length(min = 1, max = 100, message = "A tab name is required"))]
    pub tab_name: String,
    #[serde(default)]
    pub pages: Vec<HubSpotPage>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub filters: PageFilter,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub rows_written: usize,
    pub sync_recorded: bool,
}

/// Overwrite the target tab with the filtered pages and record the session.
async fn sync_pages(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
    Json(body): Json<SyncRequest>,
) -> Result<Response> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    ensure_same_user(&user, body.user_id.as_deref())?;

    let (jar, access_token) = google_access_token(&state, jar).await?;

    let target = SyncTarget {
        sheet_id: body.sheet_id,
        tab_name: body.tab_name,
    };
    let Some(_guard) = state.in_flight.try_acquire(&target) else {
        tracing::warn!(tab = %target.tab_name, "Sync already running for this tab");
        return Err(AppError::Conflict(
            "A sync to this sheet tab is already in progress".to_string(),
        ));
    };

    let ctx = SyncContext {
        google: &state.google,
        google_access_token: &access_token,
        ledger: &state.ledger,
        user_id: &user.user_id,
        session_token: &user.access_token,
    };

    // The dashboard sends its page set; filtering again is idempotent.
    let mut workflow = SyncWorkflow::with_pages(body.pages);
    let result = match workflow.apply_filter(body.filters) {
        Ok(_) => workflow.sync(&ctx, &target).await,
        Err(e) => Err(e),
    };

    // Refreshed Google cookies go back even when the sync fails.
    Ok(match result {
        Ok(outcome) => (
            jar,
            Json(SyncResponse {
                success: true,
                rows_written: outcome.rows_written,
                sync_recorded: outcome.sync_recorded,
            }),
        )
            .into_response(),
        Err(e) => (jar, e).into_response(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HistoryResponse {
    pub success: bool,
    pub sessions: Vec<SyncSession>,
}

/// Most recent sync sessions for the signed-in user.
async fn sync_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>> {
    ensure_same_user(&user, query.user_id.as_deref())?;

    let sessions = state
        .ledger
        .list_for_user(
            &user.access_token,
            &user.user_id,
            query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
        )
        .await?;

    Ok(Json(HistoryResponse {
        success: true,
        sessions,
    }))
}

/// Insert a sandbox session to check the ledger end to end.
async fn create_test_record(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<serde_json::Value>> {
    let session = NewSyncSession {
        user_id: user.user_id.clone(),
        sheet_id: format!(
            "{}sheet_{}",
            TEST_SHEET_PREFIX,
            chrono::Utc::now().timestamp_millis()
        ),
        tab_name: SANDBOX_TAB_NAME.to_string(),
        content_type: CONTENT_TYPE_PAGES.to_string(),
        filters_used: Some(json!({ "test": true, "language": "en" })),
        rows_synced: SANDBOX_ROWS_SYNCED,
    };

    let record = state.ledger.record(&user.access_token, &session).await?;
    tracing::info!(session_id = %record.id, "Sandbox sync session recorded");

    let sessions = state
        .ledger
        .list_for_user(&user.access_token, &user.user_id, SANDBOX_HISTORY_LIMIT)
        .await?;

    Ok(Json(json!({
        "success": true,
        "record": record,
        "sessions": sessions,
    })))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTestRecordsResponse {
    pub success: bool,
    pub deleted_count: usize,
}

/// Remove the user's sandbox sessions.
async fn delete_test_records(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DeleteTestRecordsResponse>> {
    let deleted = state
        .ledger
        .delete_test_records(&user.access_token, &user.user_id)
        .await?;

    tracing::info!(count = deleted.len(), "Sandbox sync sessions deleted");

    Ok(Json(DeleteTestRecordsResponse {
        success: true,
        deleted_count: deleted.len(),
    }))
}

/// A user id in the request must be the caller's own.
fn ensure_same_user(user: &AuthUser, requested: Option<&str>) -> Result<()> {
    match requested {
        Some(id) if !id.is_empty() && id != user.user_id => {
            tracing::warn!("Request user id does not match session");
            Err(AppError::Forbidden("user_id_mismatch".to_string()))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> AuthUser {
        AuthUser {
            user_id: "user-1".to_string(),
            access_token: "jwt".to_string(),
        }
    }

    #[test]
    fn test_ensure_same_user() {
        assert!(ensure_same_user(&user(), None).is_ok());
        assert!(ensure_same_user(&user(), Some("")).is_ok());
        assert!(ensure_same_user(&user(), Some("user-1")).is_ok());
        assert!(matches!(
            ensure_same_user(&user(), Some("user-2")),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_sync_request_validation() {
        let body: SyncRequest = serde_json::from_value(json!({
            "sheetId": "",
            "tabName": "T",
            "pages": []
        }))
        .unwrap();
        assert!(body.validate().is_err());

        let body: SyncRequest = serde_json::from_value(json!({
            "sheetId": "S1",
            "tabName": "x".repeat(101),
        }))
        .unwrap();
        assert!(body.validate().is_err());

        let body: SyncRequest = serde_json::from_value(json!({
            "sheetId": "S1",
            "tabName": "T",
            "filters": { "language": "en", "domain": "all" }
        }))
        .unwrap();
        assert!(body.validate().is_ok());
        assert_eq!(body.filters, PageFilter::new("en", "all"));
    }
}
