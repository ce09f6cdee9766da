// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth connection routes.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long a consent round-trip may take before its state is rejected.
const STATE_MAX_AGE_MILLIS: u128 = 10 * 60 * 1000;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/google", get(auth_start))
        .route("/auth/google/callback", get(auth_callback))
        .route("/auth/google/check", get(check_connection))
        .route("/auth/google/disconnect", post(disconnect))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct AuthUrlResponse {
    pub auth_url: String,
}

/// Start OAuth flow - return the Google consent URL.
async fn auth_start(State(state): State<Arc<AppState>>) -> Result<Json<AuthUrlResponse>> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis();

    let oauth_state = sign_state(
        &state.config.dashboard_url,
        timestamp,
        &state.config.oauth_state_key,
    )?;
    let auth_url = state.google.build_authorization_url(&oauth_state)?;

    tracing::info!("Starting Google OAuth flow");

    Ok(Json(AuthUrlResponse { auth_url }))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Callback failure reasons reported to the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallbackError {
    Denied,
    NoCode,
    InvalidState,
    NoToken,
    Failed,
}

impl CallbackError {
    fn as_str(self) -> &'static str {
        match self {
            CallbackError::Denied => "google_auth_denied",
            CallbackError::NoCode => "google_no_code",
            CallbackError::InvalidState => "google_invalid_state",
            CallbackError::NoToken => "google_no_token",
            CallbackError::Failed => "google_callback_failed",
        }
    }
}

/// OAuth callback - exchange code for tokens, store them in cookies and
/// send the browser back to the dashboard.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> (CookieJar, Redirect) {
    let dashboard_url = &state.config.dashboard_url;

    if let Some(error) = params.error.as_deref() {
        tracing::warn!(error = %error, "Google OAuth denied");
        return (jar, dashboard_redirect(dashboard_url, Err(CallbackError::Denied)));
    }

    let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
        tracing::warn!("No authorization code in Google callback");
        return (jar, dashboard_redirect(dashboard_url, Err(CallbackError::NoCode)));
    };

    let now_millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let state_ok = params
        .state
        .as_deref()
        .and_then(|s| verify_state(s, &state.config.oauth_state_key, now_millis))
        .is_some();
    if !state_ok {
        tracing::error!("Invalid or tampered OAuth state parameter");
        return (
            jar,
            dashboard_redirect(dashboard_url, Err(CallbackError::InvalidState)),
        );
    }

    tracing::info!("Exchanging authorization code for tokens");

    match state.google.exchange_code_for_tokens(code).await {
        Ok(grant) => {
            let jar = state
                .credentials
                .store_google_tokens(jar, &grant, chrono::Utc::now());
            tracing::info!(
                has_refresh_token = grant.refresh_token.is_some(),
                "Google OAuth successful, tokens stored in cookies"
            );
            (jar, dashboard_redirect(dashboard_url, Ok("google_connected")))
        }
        Err(AppError::NoToken) => {
            tracing::error!("Google returned no access token");
            (jar, dashboard_redirect(dashboard_url, Err(CallbackError::NoToken)))
        }
        Err(e) => {
            tracing::error!(error = %e, "Google OAuth callback failed");
            (jar, dashboard_redirect(dashboard_url, Err(CallbackError::Failed)))
        }
    }
}

/// Dashboard URL with `success=` or `error=` appended.
fn dashboard_redirect(
    dashboard_url: &str,
    outcome: std::result::Result<&str, CallbackError>,
) -> Redirect {
    let (key, value) = match outcome {
        Ok(success) => ("success", success),
        Err(err) => ("error", err.as_str()),
    };

    let target = match url::Url::parse(dashboard_url) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair(key, value);
            url.to_string()
        }
        Err(_) => format!("{}?{}={}", dashboard_url, key, value),
    };
    Redirect::temporary(&target)
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ConnectionResponse {
    pub connected: bool,
}

/// Whether a Google access token cookie is present.
async fn check_connection(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Json<ConnectionResponse> {
    let connected = state.credentials.read_google_connection(&jar);
    tracing::debug!(connected, "Google connection check");
    Json(ConnectionResponse { connected })
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DisconnectResponse {
    pub success: bool,
}

/// Drop the Google credential cookies.
async fn disconnect(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Json<DisconnectResponse>) {
    let jar = state.credentials.clear_google_connection(jar);
    tracing::info!("Google tokens cleared");
    (jar, Json(DisconnectResponse { success: true }))
}

/// Build the signed, base64url `state`: `dashboard_url|timestamp_hex|signature_hex`.
fn sign_state(dashboard_url: &str, timestamp_millis: u128, secret: &[u8]) -> Result<String> {
    let payload = format!("{}|{:x}", dashboard_url, timestamp_millis);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Verify the HMAC signature and age of a `state`; returns the dashboard URL.
fn verify_state(state: &str, secret: &[u8], now_millis: u128) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // The URL may itself contain '|', so split from the right.
    let mut parts = state_str.rsplitn(3, '|');
    let signature_hex = parts.next()?;
    let timestamp_hex = parts.next()?;
    let dashboard_url = parts.next()?;

    let payload = format!("{}|{}", dashboard_url, timestamp_hex);
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if !bool::from(expected.as_bytes().ct_eq(signature_hex.as_bytes())) {
        return None;
    }

    let issued_at = u128::from_str_radix(timestamp_hex, 16).ok()?;
    if now_millis.saturating_sub(issued_at) > STATE_MAX_AGE_MILLIS {
        tracing::warn!("OAuth state expired");
        return None;
    }

    Some(dashboard_url.to_string())
}
