// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sheet_sync::config::Config;
use sheet_sync::db::SyncLedger;
use sheet_sync::middleware::auth::{Claims, SESSION_AUDIENCE};
use sheet_sync::routes::create_router;
use sheet_sync::AppState;
use std::sync::Arc;
use tower::ServiceExt;

/// User id carried by [`session_token`].
#[allow(dead_code)]
pub const TEST_USER_ID: &str = "user-1";

/// Create a test app with the default config and an offline ledger.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_ledger(Config::test_default(), SyncLedger::new_mock())
}

/// Create a test app whose ledger talks to `config.supabase.url`.
#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>) {
    let ledger = SyncLedger::new(&config.supabase);
    create_test_app_with_ledger(config, ledger)
}

#[allow(dead_code)]
pub fn create_test_app_with_ledger(
    config: Config,
    ledger: SyncLedger,
) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config, ledger));
    (create_router(state.clone()), state)
}

/// Test config with every upstream pointed at local stub servers.
///
/// Google's token, Drive and Sheets endpoints all live on `google_url`.
#[allow(dead_code)]
pub fn config_with_upstreams(google_url: &str, hubspot_url: &str, supabase_url: &str) -> Config {
    let mut config = Config::test_default();
    config.google.token_url = format!("{}/token", google_url);
    config.google.drive_api_url = google_url.to_string();
    config.google.sheets_api_url = google_url.to_string();
    config.hubspot.api_url = hubspot_url.to_string();
    config.supabase.url = supabase_url.to_string();
    config
}

/// Supabase session JWT for `user_id`, signed with the test secret.
#[allow(dead_code)]
pub fn session_token(user_id: &str) -> String {
    let config = Config::test_default();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        aud: SESSION_AUDIENCE.to_string(),
        email: Some("user@example.com".to_string()),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&config.supabase.jwt_secret),
    )
    .unwrap()
}

/// `Cookie` header for a Google connection whose access token is still valid.
#[allow(dead_code)]
pub fn google_cookies(access_token: &str) -> String {
    let expires_at = chrono::Utc::now() + chrono::Duration::hours(1);
    format!(
        "google_access_token={}; google_token_expires_at={}",
        access_token,
        expires_at.to_rfc3339()
    )
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
}

/// Decoded value of the named cookie in a list of `Set-Cookie` headers.
#[allow(dead_code)]
pub fn cookie_value(headers: &[String], name: &str) -> Option<String> {
    find_cookie(headers, name).map(|header| {
        axum_extra::extract::cookie::Cookie::parse_encoded(header)
            .unwrap()
            .value()
            .to_string()
    })
}

/// `Cookie` request header replaying `Set-Cookie` values as a browser would.
#[allow(dead_code)]
pub fn replay_cookies(headers: &[String]) -> String {
    headers
        .iter()
        .filter_map(|header| header.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Start the OAuth flow and pull the signed `state` out of the consent URL.
#[allow(dead_code)]
pub async fn issue_oauth_state(app: &axum::Router) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/auth/google")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let json = body_json(response).await;
    let auth_url = url::Url::parse(json["authUrl"].as_str().unwrap()).unwrap();
    auth_url
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .expect("authUrl carries a state")
}
