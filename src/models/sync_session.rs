// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sync history rows stored in the `sync_sessions` table.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Content type recorded for page syncs.
pub const CONTENT_TYPE_PAGES: &str = "pages";

/// Sheet ids starting with this prefix are sandbox records.
pub const TEST_SHEET_PREFIX: &str = "test_";

/// One recorded sync attempt. Rows are append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SyncSession {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub user_id: String,
    pub sheet_id: String,
    pub tab_name: String,
    pub content_type: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "Record<string, unknown> | null"))]
    pub filters_used: Option<serde_json::Value>,
    pub rows_synced: i64,
    /// Insert time (ISO 8601, set by the database)
    pub timestamp: String,
}

/// Insert payload; `id` and `timestamp` are generated by the database.
#[derive(Debug, Clone, Serialize)]
pub struct NewSyncSession {
    pub user_id: String,
    pub sheet_id: String,
    pub tab_name: String,
    pub content_type: String,
    pub filters_used: Option<serde_json::Value>,
    pub rows_synced: i64,
}

impl SyncSession {
    pub fn is_test_record(&self) -> bool {
        self.sheet_id.starts_with(TEST_SHEET_PREFIX)
    }
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}
