// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HubSpot page mirror and the dashboard's page filter.

use serde::{Deserialize, Deserializer, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Filter value meaning "don't filter on this field".
pub const FILTER_ALL: &str = "all";

/// A HubSpot website page, normalized from whichever endpoint returned it.
///
/// Pages are never persisted; they only pass through to the sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HubSpotPage {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub slug: String,
    #[serde(deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(deserialize_with = "lenient_string")]
    pub language: String,
    #[serde(deserialize_with = "lenient_string")]
    pub domain: String,
    /// RFC 3339, `YYYY-MM-DD`, or epoch milliseconds
    #[serde(deserialize_with = "lenient_string")]
    pub updated_at: String,
    #[serde(deserialize_with = "lenient_string")]
    pub status: String,
}

/// Language / domain selection from the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PageFilter {
    /// Exact language code, or `all`
    pub language: String,
    /// Domain substring, or `all`
    pub domain: String,
}

impl Default for PageFilter {
    fn default() -> Self {
        Self {
            language: FILTER_ALL.to_string(),
            domain: FILTER_ALL.to_string(),
        }
    }
}

impl PageFilter {
    pub fn new(language: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            domain: domain.into(),
        }
    }

    /// Language must match exactly; domain is a substring match.
    pub fn matches(&self, page: &HubSpotPage) -> bool {
        let language_ok = is_wildcard(&self.language) || page.language == self.language;
        let domain_ok = is_wildcard(&self.domain) || page.domain.contains(self.domain.as_str());
        language_ok && domain_ok
    }

    pub fn apply(&self, pages: &[HubSpotPage]) -> Vec<HubSpotPage> {
        pages.iter().filter(|p| self.matches(p)).cloned().collect()
    }
}

fn is_wildcard(value: &str) -> bool {
    value.is_empty() || value == FILTER_ALL
}

/// Accept strings, numbers (`1`, epoch millis) and `null` (as empty).
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}
