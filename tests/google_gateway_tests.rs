// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sheets gateway tests against a stubbed Sheets API.

use mockito::Matcher;
use serde_json::json;
use sheet_sync::config::GoogleConfig;
use sheet_sync::services::sync::SHEET_HEADER;
use sheet_sync::services::{GoogleSheetsGateway, TabStatus};

fn gateway(url: &str) -> GoogleSheetsGateway {
    GoogleSheetsGateway::new(GoogleConfig {
        sheets_api_url: url.to_string(),
        drive_api_url: url.to_string(),
        ..GoogleConfig::default()
    })
}

#[tokio::test]
async fn test_overwrite_with_no_rows_writes_header_only() {
    let mut google = mockito::Server::new_async().await;
    let clear = google
        .mock("POST", Matcher::Regex(r"^/v4/spreadsheets/S1/values/.*:clear$".to_string()))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;
    let write = google
        .mock("PUT", Matcher::Regex(r"^/v4/spreadsheets/S1/values/".to_string()))
        .match_query(Matcher::Any)
        .match_body(Matcher::Json(json!({
            "range": "'Pages'!A1",
            "majorDimension": "ROWS",
            "values": [["Name", "Language", "Slug", "URL", "Last Updated"]],
        })))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    gateway(&google.url())
        .overwrite_tab_contents("token", "S1", "Pages", &SHEET_HEADER, &[])
        .await
        .unwrap();

    clear.assert_async().await;
    write.assert_async().await;
}

#[tokio::test]
async fn test_overwrite_stops_when_clear_fails() {
    let mut google = mockito::Server::new_async().await;
    let _clear = google
        .mock("POST", Matcher::Regex(r":clear$".to_string()))
        .with_status(404)
        .with_body(r#"{"error":{"code":404,"message":"Requested entity was not found."}}"#)
        .create_async()
        .await;
    let write = google
        .mock("PUT", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let err = gateway(&google.url())
        .overwrite_tab_contents("token", "S1", "Pages", &SHEET_HEADER, &[])
        .await
        .unwrap_err();

    write.assert_async().await;
    assert!(err.to_string().contains("Requested entity was not found."));
}

#[tokio::test]
async fn test_tab_status_tri_state() {
    let mut google = mockito::Server::new_async().await;
    let _ok = google
        .mock("GET", "/v4/spreadsheets/S1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"sheets":[{"properties":{"title":"Pages"}}]}"#)
        .create_async()
        .await;
    let _denied = google
        .mock("GET", "/v4/spreadsheets/S2")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body(r#"{"error":{"message":"The caller does not have permission"}}"#)
        .create_async()
        .await;

    let gateway = gateway(&google.url());
    assert_eq!(
        gateway.tab_status("token", "S1", "Pages").await,
        TabStatus::Exists
    );
    assert_eq!(
        gateway.tab_status("token", "S1", "Blog").await,
        TabStatus::Missing
    );
    match gateway.tab_status("token", "S2", "Pages").await {
        TabStatus::Unknown(reason) => {
            assert!(reason.contains("The caller does not have permission"))
        }
        other => panic!("expected Unknown, got {other:?}"),
    }
}

#[tokio::test]
async fn test_existing_tab_is_not_recreated() {
    let mut google = mockito::Server::new_async().await;
    let _probe = google
        .mock("GET", "/v4/spreadsheets/S1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"sheets":[{"properties":{"title":"Pages"}}]}"#)
        .create_async()
        .await;
    let add = google
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    gateway(&google.url())
        .ensure_tab_exists("token", "S1", "Pages")
        .await
        .unwrap();
    add.assert_async().await;
}

#[tokio::test]
async fn test_concurrently_created_tab_is_tolerated() {
    let mut google = mockito::Server::new_async().await;
    let _probe = google
        .mock("GET", "/v4/spreadsheets/S1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"sheets":[]}"#)
        .create_async()
        .await;
    let _add = google
        .mock("POST", "/v4/spreadsheets/S1:batchUpdate")
        .with_status(400)
        .with_body(
            r#"{"error":{"code":400,"message":"Invalid requests[0].addSheet: A sheet with the name \"Pages\" already exists. Please enter another name."}}"#,
        )
        .create_async()
        .await;

    gateway(&google.url())
        .ensure_tab_exists("token", "S1", "Pages")
        .await
        .unwrap();
}
