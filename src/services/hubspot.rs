// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HubSpot content API client.
//!
//! HubSpot has exposed website pages through several API generations, and
//! which one answers depends on the account. Page listing therefore walks an
//! ordered list of candidate endpoints and keeps the first non-empty result.
//! Records are normalized through a field table because each endpoint names
//! the same attribute differently.

use crate::config::HubSpotConfig;
use crate::error::AppError;
use crate::models::{HubSpotPage, HubSpotToken};
use chrono::{DateTime, Utc};
use serde_json::Value;

const SERVICE: &str = "HubSpot";

/// Domain reported when neither the page nor the config names one.
pub const UNKNOWN_DOMAIN: &str = "unknown-domain";

/// How much of the last upstream error body is kept for diagnostics.
const LAST_ERROR_MAX_CHARS: usize = 200;

/// Body keys that hold the page array, by endpoint generation.
const RESULT_KEYS: [&str; 3] = ["results", "objects", "pages"];

/// A candidate HubSpot endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub name: &'static str,
    /// Path and query relative to the API base URL
    pub path: &'static str,
}

/// Page listing candidates, in priority order.
pub const PAGE_ENDPOINTS: [Endpoint; 5] = [
    Endpoint {
        name: "Website Pages API v2",
        path: "/content/api/v2/pages?limit=100",
    },
    Endpoint {
        name: "CMS Pages v3 (All states)",
        path: "/cms/v3/pages?limit=100",
    },
    Endpoint {
        name: "CMS Pages v3 (Published only)",
        path: "/cms/v3/pages?limit=100&archived=false",
    },
    Endpoint {
        name: "Website Pages with state filter",
        path: "/content/api/v2/pages?limit=100&state=PUBLISHED",
    },
    Endpoint {
        name: "CMS Site Pages",
        path: "/cms/v3/site-pages?limit=100",
    },
];

/// Connectivity probes for token validation, in priority order.
pub const VALIDATION_ENDPOINTS: [Endpoint; 3] = [
    Endpoint {
        name: "CMS Pages",
        path: "/cms/v3/pages?limit=1",
    },
    Endpoint {
        name: "Website Pages",
        path: "/content/api/v2/pages?limit=1",
    },
    Endpoint {
        name: "Account Info",
        path: "/account-info/v3/details",
    },
];

/// Pages from the first endpoint that returned any.
#[derive(Debug, Clone)]
pub struct PageListing {
    pub endpoint: &'static str,
    pub pages: Vec<HubSpotPage>,
}

/// Errors specific to the HubSpot gateway.
#[derive(Debug, thiserror::Error)]
pub enum HubSpotError {
    /// Every candidate endpoint failed or came back empty.
    #[error("No pages found in your HubSpot account")]
    NoPagesFound { last_error: String },

    #[error("{0}")]
    Rejected(String),
}

impl HubSpotError {
    pub const SUGGESTION: &'static str =
        "Check your HubSpot private app permissions include 'CMS Pages' and 'Website Pages'";
}

impl From<HubSpotError> for AppError {
    fn from(err: HubSpotError) -> Self {
        AppError::UpstreamApi {
            service: SERVICE,
            status: 0,
            message: err.to_string(),
        }
    }
}

/// HubSpot API client built once from [`HubSpotConfig`].
#[derive(Clone)]
pub struct HubSpotGateway {
    http: reqwest::Client,
    config: HubSpotConfig,
}

impl HubSpotGateway {
    pub fn new(config: HubSpotConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Check that the token reaches at least one content endpoint.
    ///
    /// Returns the name of the first endpoint that answered 2xx.
    pub async fn validate_token(&self, token: &HubSpotToken) -> Result<&'static str, HubSpotError> {
        let mut last_message = None;

        for endpoint in VALIDATION_ENDPOINTS {
            match self.get(endpoint, token).await {
                Ok(_) => {
                    tracing::info!(endpoint = endpoint.name, "HubSpot token validated");
                    return Ok(endpoint.name);
                }
                Err(failure) => {
                    tracing::debug!(
                        endpoint = endpoint.name,
                        status = failure.status,
                        "HubSpot validation probe failed"
                    );
                    last_message = failure.message.or(last_message);
                }
            }
        }

        Err(HubSpotError::Rejected(last_message.unwrap_or_else(|| {
            "None of the HubSpot API endpoints are accessible with this token. \
             Please check your token permissions."
                .to_string()
        })))
    }

    /// Fetch website pages, trying each of [`PAGE_ENDPOINTS`] in order.
    pub async fn list_published_pages(
        &self,
        token: &HubSpotToken,
    ) -> Result<PageListing, HubSpotError> {
        self.list_pages_from(&PAGE_ENDPOINTS, token).await
    }

    /// Fallback walk over an explicit endpoint list.
    pub async fn list_pages_from(
        &self,
        endpoints: &[Endpoint],
        token: &HubSpotToken,
    ) -> Result<PageListing, HubSpotError> {
        let mut last_error = String::new();

        for endpoint in endpoints {
            tracing::debug!(endpoint = endpoint.name, "Trying HubSpot endpoint");

            let body = match self.get(*endpoint, token).await {
                Ok(body) => body,
                Err(failure) => {
                    tracing::debug!(
                        endpoint = endpoint.name,
                        status = failure.status,
                        "HubSpot endpoint failed"
                    );
                    last_error = failure.body;
                    continue;
                }
            };

            let raw_pages = extract_page_array(&body);
            if raw_pages.is_empty() {
                tracing::debug!(endpoint = endpoint.name, "No pages in response");
                continue;
            }

            let pages = normalize_pages(raw_pages, self.config.site_domain.as_deref(), Utc::now());
            tracing::info!(
                endpoint = endpoint.name,
                count = pages.len(),
                "Fetched HubSpot pages"
            );
            return Ok(PageListing {
                endpoint: endpoint.name,
                pages,
            });
        }

        tracing::warn!("No HubSpot endpoint returned pages");
        Err(HubSpotError::NoPagesFound {
            last_error: last_error.chars().take(LAST_ERROR_MAX_CHARS).collect(),
        })
    }

    async fn get(&self, endpoint: Endpoint, token: &HubSpotToken) -> Result<Value, Failure> {
        let url = format!("{}{}", self.config.api_url, endpoint.path);

        let response = self
            .http
            .get(&url)
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(|e| Failure {
                status: 0,
                body: e.to_string(),
                message: None,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string));
            return Err(Failure {
                status: status.as_u16(),
                body,
                message,
            });
        }

        response.json().await.map_err(|e| Failure {
            status: status.as_u16(),
            body: format!("JSON parse error: {}", e),
            message: None,
        })
    }
}

/// A failed endpoint call: status (0 for transport errors), raw body, and
/// HubSpot's `message` field when the body had one.
struct Failure {
    status: u16,
    body: String,
    message: Option<String>,
}

/// The page array under the first known key holding a non-empty array.
fn extract_page_array(body: &Value) -> &[Value] {
    RESULT_KEYS
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_array))
        .find(|pages| !pages.is_empty())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

// ─── Field mapping ───────────────────────────────────────────────────────────

type Extract = fn(&Value) -> Option<String>;

/// Candidate source fields per logical field, first match wins.
type FieldRules = &'static [(&'static str, Extract)];

const ID_FIELDS: FieldRules = &[("id", text), ("page_id", text), ("contentId", text)];

const NAME_FIELDS: FieldRules = &[
    ("name", text),
    ("html_title", text),
    ("page_title", text),
    ("htmlTitle", text),
    ("title", text),
    ("meta_title", text),
];

const SLUG_FIELDS: FieldRules = &[
    ("slug", text),
    ("path", text),
    ("url_path", text),
    ("page_path", text),
];

const URL_FIELDS: FieldRules = &[
    ("url", text),
    ("absolute_url", text),
    ("published_url", text),
    ("public_url", text),
];

/// Upstream `domain` when present, otherwise the host of a URL field.
const DOMAIN_FIELDS: FieldRules = &[
    ("domain", text),
    ("url", url_host),
    ("absolute_url", url_host),
    ("published_url", url_host),
];

const LANGUAGE_FIELDS: FieldRules = &[
    ("language", text),
    ("primaryLanguage", text),
    ("lang", text),
];

const UPDATED_FIELDS: FieldRules = &[
    ("updatedAt", text),
    ("updated", epoch_millis_or_text),
    ("updated_at", text),
    ("publish_date", epoch_millis_or_text),
];

const STATUS_FIELDS: FieldRules = &[
    ("currentState", text),
    ("state", text),
    ("publish_immediately", published_flag),
];

fn lookup(page: &Value, rules: FieldRules) -> Option<String> {
    rules
        .iter()
        .find_map(|(field, extract)| page.get(*field).and_then(extract))
}

/// Non-empty string, or a number rendered as a string.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Legacy endpoints report timestamps as epoch milliseconds.
fn epoch_millis_or_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.to_rfc3339()),
        other => text(other),
    }
}

fn url_host(value: &Value) -> Option<String> {
    text(value).and_then(|raw| extract_domain(&raw))
}

fn published_flag(value: &Value) -> Option<String> {
    (value.as_bool() == Some(true)).then(|| "PUBLISHED".to_string())
}

/// Host part of a URL, accepting scheme-less values like `example.com/x`.
pub fn extract_domain(raw: &str) -> Option<String> {
    let candidate = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };
    url::Url::parse(&candidate)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .filter(|h| !h.is_empty())
}

/// Map one upstream record onto [`HubSpotPage`], filling defaults.
pub fn normalize_page(
    raw: &Value,
    index: usize,
    site_domain: Option<&str>,
    now: DateTime<Utc>,
) -> HubSpotPage {
    let fallback_domain = site_domain.unwrap_or(UNKNOWN_DOMAIN);
    let slug = lookup(raw, SLUG_FIELDS).unwrap_or_default();

    let url = lookup(raw, URL_FIELDS).unwrap_or_else(|| {
        format!("https://{}/{}", fallback_domain, slug.trim_start_matches('/'))
    });

    let domain = lookup(raw, DOMAIN_FIELDS).unwrap_or_else(|| fallback_domain.to_string());

    HubSpotPage {
        id: lookup(raw, ID_FIELDS).unwrap_or_else(|| index.to_string()),
        name: lookup(raw, NAME_FIELDS).unwrap_or_else(|| format!("Page {}", index + 1)),
        slug,
        url,
        language: lookup(raw, LANGUAGE_FIELDS).unwrap_or_else(|| "en".to_string()),
        domain,
        updated_at: lookup(raw, UPDATED_FIELDS).unwrap_or_else(|| now.to_rfc3339()),
        status: lookup(raw, STATUS_FIELDS).unwrap_or_else(|| "PUBLISHED".to_string()),
    }
}

pub fn normalize_pages(
    raw_pages: &[Value],
    site_domain: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<HubSpotPage> {
    raw_pages
        .iter()
        .enumerate()
        .map(|(index, raw)| normalize_page(raw, index, site_domain, now))
        .collect()
}
