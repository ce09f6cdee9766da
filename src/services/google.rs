// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth + Drive/Sheets client.
//!
//! Handles:
//! - Authorization URL construction and code exchange
//! - Access token refresh
//! - Listing the user's spreadsheets
//! - Tab existence checks / creation and full tab overwrites

use crate::config::GoogleConfig;
use crate::error::AppError;
use crate::models::TokenGrant;
use serde::{Deserialize, Serialize};
use serde_json::json;

const SERVICE: &str = "Google";

const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive.readonly",
];

const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";
const SHEET_LIST_PAGE_SIZE: u32 = 20;

/// Columns cleared before every overwrite.
const CLEAR_COLUMNS: &str = "A:Z";

/// A spreadsheet the user can sync into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SpreadsheetSummary {
    pub id: String,
    pub name: String,
}

/// Result of probing a spreadsheet for a tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabStatus {
    Exists,
    Missing,
    /// The probe itself failed; carries the reason.
    Unknown(String),
}

/// Google APIs client built once from [`GoogleConfig`].
#[derive(Clone)]
pub struct GoogleSheetsGateway {
    http: reqwest::Client,
    config: GoogleConfig,
}

impl GoogleSheetsGateway {
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Client credentials, or a configuration error naming what's missing.
    fn oauth_client(&self) -> Result<(&str, &str, &str), AppError> {
        let missing: Vec<&str> = [
            ("GOOGLE_CLIENT_ID", &self.config.client_id),
            ("GOOGLE_CLIENT_SECRET", &self.config.client_secret),
            ("GOOGLE_REDIRECT_URI", &self.config.redirect_uri),
        ]
        .iter()
        .filter(|(_, value)| value.as_deref().map_or(true, str::is_empty))
        .map(|(name, _)| *name)
        .collect();

        match (
            &self.config.client_id,
            &self.config.client_secret,
            &self.config.redirect_uri,
        ) {
            (Some(id), Some(secret), Some(redirect)) if missing.is_empty() => {
                Ok((id.as_str(), secret.as_str(), redirect.as_str()))
            }
            _ => Err(AppError::Configuration(format!(
                "Google OAuth is not configured (missing {})",
                missing.join(", ")
            ))),
        }
    }

    /// Build the consent URL: offline access, spreadsheets + drive.readonly,
    /// and `prompt=consent` so a refresh token is issued every time.
    pub fn build_authorization_url(&self, state: &str) -> Result<String, AppError> {
        let (client_id, _, redirect_uri) = self.oauth_client()?;

        let mut url = url::Url::parse(&self.config.auth_url)
            .map_err(|e| AppError::Configuration(format!("Invalid Google auth URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &SCOPES.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", state);

        Ok(url.into())
    }

    /// Exchange an authorization code for tokens.
    ///
    /// A response without an access token is `AppError::NoToken`.
    pub async fn exchange_code_for_tokens(&self, code: &str) -> Result<TokenGrant, AppError> {
        let (client_id, client_secret, redirect_uri) = self.oauth_client()?;

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("Token exchange failed: {}", e)))?;

        let grant: TokenGrant = check_response_json(response).await?;
        if grant.access_token.is_empty() {
            return Err(AppError::NoToken);
        }
        Ok(grant)
    }

    /// Trade a refresh token for a new access token.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenGrant, AppError> {
        let (client_id, client_secret, _) = self.oauth_client()?;

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("Token refresh failed: {}", e)))?;

        let grant: TokenGrant = check_response_json(response).await?;
        if grant.access_token.is_empty() {
            return Err(AppError::NoToken);
        }
        tracing::info!("Google access token refreshed");
        Ok(grant)
    }

    /// List up to 20 spreadsheets visible to the user.
    pub async fn list_spreadsheets(
        &self,
        access_token: &str,
    ) -> Result<Vec<SpreadsheetSummary>, AppError> {
        if access_token.is_empty() {
            return Err(AppError::NotAuthenticated);
        }

        #[derive(Deserialize)]
        struct FileList {
            #[serde(default)]
            files: Vec<DriveFile>,
        }

        #[derive(Deserialize)]
        struct DriveFile {
            id: Option<String>,
            name: Option<String>,
        }

        let url = format!("{}/drive/v3/files", self.config.drive_api_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("q", format!("mimeType='{}'", SPREADSHEET_MIME_TYPE)),
                ("fields", "files(id, name)".to_string()),
                ("pageSize", SHEET_LIST_PAGE_SIZE.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e.to_string()))?;

        let list: FileList = check_response_json(response).await?;
        Ok(list
            .files
            .into_iter()
            .filter_map(|f| {
                Some(SpreadsheetSummary {
                    id: f.id?,
                    name: f.name.unwrap_or_default(),
                })
            })
            .collect())
    }

    /// Check whether `tab_name` exists in the spreadsheet.
    pub async fn tab_status(&self, access_token: &str, sheet_id: &str, tab_name: &str) -> TabStatus {
        #[derive(Deserialize)]
        struct Spreadsheet {
            #[serde(default)]
            sheets: Vec<Sheet>,
        }

        #[derive(Deserialize)]
        struct Sheet {
            properties: SheetProperties,
        }

        #[derive(Deserialize)]
        struct SheetProperties {
            #[serde(default)]
            title: String,
        }

        let url = format!(
            "{}/v4/spreadsheets/{}",
            self.config.sheets_api_url,
            urlencoding::encode(sheet_id)
        );
        let response = match self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("fields", "sheets.properties.title")])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return TabStatus::Unknown(e.to_string()),
        };

        match check_response_json::<Spreadsheet>(response).await {
            Ok(spreadsheet) => {
                if spreadsheet.sheets.iter().any(|s| s.properties.title == tab_name) {
                    TabStatus::Exists
                } else {
                    TabStatus::Missing
                }
            }
            Err(e) => TabStatus::Unknown(e.to_string()),
        }
    }

    /// Make sure the tab exists, creating it when the probe says it's missing.
    ///
    /// An inconclusive probe is an error rather than a guess.
    pub async fn ensure_tab_exists(
        &self,
        access_token: &str,
        sheet_id: &str,
        tab_name: &str,
    ) -> Result<(), AppError> {
        match self.tab_status(access_token, sheet_id, tab_name).await {
            TabStatus::Exists => {
                tracing::debug!(tab = tab_name, "Tab exists");
                Ok(())
            }
            TabStatus::Missing => {
                tracing::info!(tab = tab_name, "Creating tab");
                self.add_tab(access_token, sheet_id, tab_name).await
            }
            TabStatus::Unknown(reason) => Err(AppError::UpstreamApi {
                service: SERVICE,
                status: 0,
                message: format!("Could not check tab '{}': {}", tab_name, reason),
            }),
        }
    }

    async fn add_tab(&self, access_token: &str, sheet_id: &str, tab_name: &str) -> Result<(), AppError> {
        let url = format!(
            "{}/v4/spreadsheets/{}:batchUpdate",
            self.config.sheets_api_url,
            urlencoding::encode(sheet_id)
        );
        let body = json!({
            "requests": [{ "addSheet": { "properties": { "title": tab_name } } }]
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e.to_string()))?;

        match check_response(response).await {
            Ok(()) => Ok(()),
            // Another request created it between our probe and this call.
            Err(AppError::UpstreamApi {
                status: 400,
                ref message,
                ..
            }) if message.contains("already exists") => {
                tracing::debug!(tab = tab_name, "Tab created concurrently");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Replace the tab's contents: clear `A:Z`, then write the header row
    /// followed by `rows` from `A1` with RAW input.
    pub async fn overwrite_tab_contents(
        &self,
        access_token: &str,
        sheet_id: &str,
        tab_name: &str,
        header: &[&str],
        rows: &[Vec<String>],
    ) -> Result<(), AppError> {
        let sheet = urlencoding::encode(sheet_id);

        let clear_range = a1_range(tab_name, CLEAR_COLUMNS);
        let clear_url = format!(
            "{}/v4/spreadsheets/{}/values/{}:clear",
            self.config.sheets_api_url,
            sheet,
            urlencoding::encode(&clear_range)
        );
        let response = self
            .http
            .post(&clear_url)
            .bearer_auth(access_token)
            .json(&json!({}))
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e.to_string()))?;
        check_response(response).await?;

        let write_range = a1_range(tab_name, "A1");
        let mut values: Vec<Vec<String>> = Vec::with_capacity(rows.len() + 1);
        values.push(header.iter().map(|h| h.to_string()).collect());
        values.extend(rows.iter().cloned());

        let update_url = format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.config.sheets_api_url,
            sheet,
            urlencoding::encode(&write_range)
        );
        let response = self
            .http
            .put(&update_url)
            .bearer_auth(access_token)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({
                "range": write_range,
                "majorDimension": "ROWS",
                "values": values,
            }))
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e.to_string()))?;
        check_response(response).await?;

        tracing::info!(tab = tab_name, rows = rows.len(), "Tab contents replaced");
        Ok(())
    }
}

/// A1 notation with the tab name quoted (`'My Tab'!A1`).
pub fn a1_range(tab_name: &str, cells: &str) -> String {
    format!("'{}'!{}", tab_name.replace('\'', "''"), cells)
}

/// Google error bodies look like `{"error": {"message": ...}}` (APIs) or
/// `{"error": "...", "error_description": ...}` (OAuth).
fn google_error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("error_description"))
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(300).collect())
}

async fn check_response(response: reqwest::Response) -> Result<(), AppError> {
    if response.status().is_success() {
        return Ok(());
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(AppError::UpstreamApi {
        service: SERVICE,
        status: status.as_u16(),
        message: google_error_message(&body),
    })
}

async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::UpstreamApi {
            service: SERVICE,
            status: status.as_u16(),
            message: google_error_message(&body),
        });
    }

    response
        .json()
        .await
        .map_err(|e| AppError::upstream(SERVICE, format!("JSON parse error: {}", e)))
}
