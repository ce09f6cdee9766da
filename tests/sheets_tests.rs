// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spreadsheet listing and Google token refresh tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use mockito::Matcher;
use sheet_sync::db::SyncLedger;
use tower::ServiceExt;

mod common;

async fn list_sheets(app: axum::Router, cookie: Option<&str>) -> Response {
    let mut request = Request::builder().uri("/integrations/google/sheets");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    app.oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_sheets_without_connection_is_401() {
    let (app, _) = common::create_test_app();

    let response = list_sheets(app, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        common::body_json(response).await["error"],
        "not_authenticated"
    );
}

#[tokio::test]
async fn test_sheets_lists_spreadsheets() {
    let mut google = mockito::Server::new_async().await;
    let drive_mock = google
        .mock("GET", "/drive/v3/files")
        .match_header("authorization", "Bearer ya29.valid")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded(
                "q".into(),
                "mimeType='application/vnd.google-apps.spreadsheet'".into(),
            ),
            Matcher::UrlEncoded("pageSize".into(), "20".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"files":[{"id":"S1","name":"Pages"},{"id":"S2","name":"Blog"}]}"#)
        .create_async()
        .await;

    let config = common::config_with_upstreams(&google.url(), "http://unused", "http://unused");
    let (app, _) = common::create_test_app_with_ledger(config, SyncLedger::new_mock());

    let response = list_sheets(app, Some(&common::google_cookies("ya29.valid"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    drive_mock.assert_async().await;

    let json = common::body_json(response).await;
    assert_eq!(
        json["sheets"],
        serde_json::json!([{"id": "S1", "name": "Pages"}, {"id": "S2", "name": "Blog"}])
    );
}

#[tokio::test]
async fn test_expired_token_is_refreshed() {
    let mut google = mockito::Server::new_async().await;
    let refresh_mock = google
        .mock("POST", "/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("refresh_token".into(), "1//refresh".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"ya29.fresh","expires_in":3599}"#)
        .create_async()
        .await;
    let drive_mock = google
        .mock("GET", "/drive/v3/files")
        .match_header("authorization", "Bearer ya29.fresh")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"files":[]}"#)
        .create_async()
        .await;

    let config = common::config_with_upstreams(&google.url(), "http://unused", "http://unused");
    let (app, _) = common::create_test_app_with_ledger(config, SyncLedger::new_mock());

    let expired = (chrono::Utc::now() - chrono::Duration::minutes(5)).to_rfc3339();
    let cookie = format!(
        "google_access_token=ya29.stale; google_refresh_token=1//refresh; google_token_expires_at={}",
        expired
    );
    let response = list_sheets(app, Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::OK);
    refresh_mock.assert_async().await;
    drive_mock.assert_async().await;

    let cookies = common::set_cookie_headers(&response);
    let access = common::find_cookie(&cookies, "google_access_token").expect("new access cookie");
    assert!(access.starts_with("google_access_token=ya29.fresh"));
    // Google didn't rotate the refresh token, so it is left alone.
    assert!(common::find_cookie(&cookies, "google_refresh_token").is_none());
}

#[tokio::test]
async fn test_missing_expiry_without_refresh_token_is_401() {
    let (app, _) = common::create_test_app();

    // No expiry cookie: treated as expired, and nothing to refresh with.
    let response = list_sheets(app, Some("google_access_token=ya29.unknown")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_failed_refresh_is_401() {
    let mut google = mockito::Server::new_async().await;
    let _refresh_mock = google
        .mock("POST", "/token")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"invalid_grant"}"#)
        .create_async()
        .await;

    let config = common::config_with_upstreams(&google.url(), "http://unused", "http://unused");
    let (app, _) = common::create_test_app_with_ledger(config, SyncLedger::new_mock());

    let response = list_sheets(app, Some("google_refresh_token=1//revoked")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_google_rejection_is_passed_through() {
    let mut google = mockito::Server::new_async().await;
    let _drive_mock = google
        .mock("GET", "/drive/v3/files")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"code":403,"message":"Insufficient Permission"}}"#)
        .create_async()
        .await;

    let config = common::config_with_upstreams(&google.url(), "http://unused", "http://unused");
    let (app, _) = common::create_test_app_with_ledger(config, SyncLedger::new_mock());

    let response = list_sheets(app, Some(&common::google_cookies("ya29.valid"))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let json = common::body_json(response).await;
    assert_eq!(json["error"], "upstream_error");
    assert_eq!(json["details"], "Insufficient Permission");
}
