// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HubSpot token validation and page fetching.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::{HubSpotPage, HubSpotToken};
use crate::services::{HubSpotError, SyncWorkflow};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/hubspot/validate", post(validate_token))
        .route("/hubspot/pages", post(fetch_pages))
}

#[derive(Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    token: HubSpotToken,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ValidateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Check a private-app token against HubSpot. 400 when no endpoint accepts it.
async fn validate_token(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TokenRequest>,
) -> Response {
    if body.token.is_blank() {
        return validation_failed("Valid token is required".to_string());
    }

    match state.hubspot.validate_token(&body.token).await {
        Ok(endpoint) => Json(ValidateResponse {
            success: true,
            endpoint: Some(endpoint.to_string()),
            error: None,
        })
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "HubSpot token validation failed");
            validation_failed(e.to_string())
        }
    }
}

fn validation_failed(error: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ValidateResponse {
            success: false,
            endpoint: None,
            error: Some(error),
        }),
    )
        .into_response()
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PagesResponse {
    pub success: bool,
    pub pages: Vec<HubSpotPage>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct PagesDebug {
    pub last_error: String,
    pub suggestion: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PagesFailure {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<PagesDebug>,
}

/// Fetch pages through the endpoint fallback chain.
///
/// Running out of endpoints is not an HTTP error: the dashboard needs the
/// diagnostic message, so it comes back as `success: false`.
async fn fetch_pages(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TokenRequest>,
) -> Response {
    let mut workflow = SyncWorkflow::new();

    match workflow.fetch_pages(&state.hubspot, &body.token).await {
        Ok(_) => {
            let endpoint = workflow.endpoint().map(str::to_string);
            let pages = workflow.pages().to_vec();
            Json(PagesResponse {
                success: true,
                total: pages.len(),
                pages,
                endpoint,
            })
            .into_response()
        }
        Err(err) => {
            let error = err.to_string();
            match err {
                HubSpotError::NoPagesFound { last_error } => Json(PagesFailure {
                    success: false,
                    error,
                    debug: Some(PagesDebug {
                        last_error,
                        suggestion: HubSpotError::SUGGESTION.to_string(),
                    }),
                })
                .into_response(),
                HubSpotError::Rejected(_) => (
                    StatusCode::BAD_REQUEST,
                    Json(PagesFailure {
                        success: false,
                        error,
                        debug: None,
                    }),
                )
                    .into_response(),
            }
        }
    }
}
