// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Page → sheet sync workflow.
//!
//! `Idle → PagesFetched → FiltersApplied → Syncing → Synced`, with `Failed`
//! reachable from any step. The sheet write and the ledger insert are
//! independent effects: a ledger failure is reported as
//! `sync_recorded: false` and never fails the sync.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use crate::db::SyncLedger;
use crate::error::AppError;
use crate::models::sync_session::CONTENT_TYPE_PAGES;
use crate::models::{HubSpotPage, HubSpotToken, NewSyncSession, PageFilter};
use crate::services::google::GoogleSheetsGateway;
use crate::services::hubspot::{HubSpotError, HubSpotGateway};
use crate::time_utils::format_us_short_date;

/// Header row written above the page rows.
pub const SHEET_HEADER: [&str; 5] = ["Name", "Language", "Slug", "URL", "Last Updated"];

/// Where the pages go.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyncTarget {
    pub sheet_id: String,
    pub tab_name: String,
}

/// Everything a sync needs besides the pages themselves.
pub struct SyncContext<'a> {
    pub google: &'a GoogleSheetsGateway,
    pub google_access_token: &'a str,
    pub ledger: &'a SyncLedger,
    /// Authenticated user; the ledger row is attributed to this id.
    pub user_id: &'a str,
    pub session_token: &'a str,
}

/// Result of a completed sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub rows_written: usize,
    pub sync_recorded: bool,
}

#[derive(Debug, Clone)]
pub enum SyncState {
    Idle,
    PagesFetched {
        endpoint: Option<&'static str>,
        pages: Vec<HubSpotPage>,
    },
    FiltersApplied {
        pages: Vec<HubSpotPage>,
        filter: PageFilter,
        filtered: Vec<HubSpotPage>,
    },
    Syncing,
    Synced(SyncOutcome),
    Failed(String),
}

impl SyncState {
    pub fn name(&self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::PagesFetched { .. } => "pages_fetched",
            SyncState::FiltersApplied { .. } => "filters_applied",
            SyncState::Syncing => "syncing",
            SyncState::Synced(_) => "synced",
            SyncState::Failed(_) => "failed",
        }
    }
}

/// One run of the workflow. Each inbound request drives its own instance.
#[derive(Debug)]
pub struct SyncWorkflow {
    state: SyncState,
}

impl Default for SyncWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncWorkflow {
    pub fn new() -> Self {
        Self {
            state: SyncState::Idle,
        }
    }

    /// Start from pages the caller already holds (e.g. sent by the dashboard).
    pub fn with_pages(pages: Vec<HubSpotPage>) -> Self {
        Self {
            state: SyncState::PagesFetched {
                endpoint: None,
                pages,
            },
        }
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(from = self.state.name(), error = %message, "Sync workflow failed");
        self.state = SyncState::Failed(message);
    }

    /// `Idle → PagesFetched`. On failure the upstream message is kept verbatim.
    pub async fn fetch_pages(
        &mut self,
        hubspot: &HubSpotGateway,
        token: &HubSpotToken,
    ) -> Result<&[HubSpotPage], HubSpotError> {
        if token.is_blank() {
            let err = HubSpotError::Rejected("Valid token is required".to_string());
            self.fail(err.to_string());
            return Err(err);
        }

        match hubspot.list_published_pages(token).await {
            Ok(listing) => {
                self.state = SyncState::PagesFetched {
                    endpoint: Some(listing.endpoint),
                    pages: listing.pages,
                };
                Ok(self.pages())
            }
            Err(err) => {
                self.fail(err.to_string());
                Err(err)
            }
        }
    }

    /// All fetched pages, before filtering.
    pub fn pages(&self) -> &[HubSpotPage] {
        match &self.state {
            SyncState::PagesFetched { pages, .. } | SyncState::FiltersApplied { pages, .. } => {
                pages
            }
            _ => &[],
        }
    }

    /// Endpoint the pages came from, when they were fetched here.
    pub fn endpoint(&self) -> Option<&'static str> {
        match &self.state {
            SyncState::PagesFetched { endpoint, .. } => *endpoint,
            _ => None,
        }
    }

    /// Pages that will be written.
    pub fn filtered(&self) -> &[HubSpotPage] {
        match &self.state {
            SyncState::FiltersApplied { filtered, .. } => filtered,
            _ => &[],
        }
    }

    /// `PagesFetched | FiltersApplied → FiltersApplied`.
    ///
    /// Recomputes from the full page set every time, so changing the filter
    /// never compounds with the previous one.
    pub fn apply_filter(&mut self, filter: PageFilter) -> Result<&[HubSpotPage], AppError> {
        let pages = match std::mem::replace(&mut self.state, SyncState::Idle) {
            SyncState::PagesFetched { pages, .. } | SyncState::FiltersApplied { pages, .. } => pages,
            other => {
                let from = other.name();
                self.state = other;
                return Err(AppError::BadRequest(format!(
                    "Cannot filter pages while {}",
                    from
                )));
            }
        };

        let filtered = filter.apply(&pages);
        tracing::debug!(
            total = pages.len(),
            kept = filtered.len(),
            language = %filter.language,
            domain = %filter.domain,
            "Filters applied"
        );
        self.state = SyncState::FiltersApplied {
            pages,
            filter,
            filtered,
        };
        Ok(self.filtered())
    }

    /// Replace the page set, re-running the current filter if one is set.
    pub fn replace_pages(&mut self, pages: Vec<HubSpotPage>) {
        match std::mem::replace(&mut self.state, SyncState::Idle) {
            SyncState::FiltersApplied { filter, .. } => {
                self.state = SyncState::PagesFetched {
                    endpoint: None,
                    pages,
                };
                // Can't fail: the state is PagesFetched.
                let _ = self.apply_filter(filter);
            }
            _ => {
                self.state = SyncState::PagesFetched {
                    endpoint: None,
                    pages,
                };
            }
        }
    }

    /// `FiltersApplied → Syncing → Synced`.
    ///
    /// Ensures the tab exists, overwrites it, then records the session.
    pub async fn sync(
        &mut self,
        ctx: &SyncContext<'_>,
        target: &SyncTarget,
    ) -> Result<SyncOutcome, AppError> {
        let (filter, filtered) = match &self.state {
            SyncState::FiltersApplied {
                filter, filtered, ..
            } => (filter.clone(), filtered.clone()),
            other => {
                return Err(AppError::BadRequest(format!(
                    "Cannot sync while {}",
                    other.name()
                )))
            }
        };

        if target.sheet_id.trim().is_empty() {
            return Err(AppError::BadRequest("A sheet must be selected".to_string()));
        }
        if target.tab_name.trim().is_empty() {
            return Err(AppError::BadRequest("A tab name is required".to_string()));
        }
        if filtered.is_empty() {
            return Err(AppError::BadRequest("No pages to sync".to_string()));
        }

        self.state = SyncState::Syncing;
        tracing::info!(
            tab = %target.tab_name,
            pages = filtered.len(),
            "Syncing pages to sheet"
        );

        let rows: Vec<Vec<String>> = filtered.iter().map(page_row).collect();
        let written = async {
            ctx.google
                .ensure_tab_exists(ctx.google_access_token, &target.sheet_id, &target.tab_name)
                .await?;
            ctx.google
                .overwrite_tab_contents(
                    ctx.google_access_token,
                    &target.sheet_id,
                    &target.tab_name,
                    &SHEET_HEADER,
                    &rows,
                )
                .await
        }
        .await;

        if let Err(err) = written {
            self.fail(err.to_string());
            return Err(err);
        }

        let session = NewSyncSession {
            user_id: ctx.user_id.to_string(),
            sheet_id: target.sheet_id.clone(),
            tab_name: target.tab_name.clone(),
            content_type: CONTENT_TYPE_PAGES.to_string(),
            filters_used: serde_json::to_value(&filter).ok(),
            rows_synced: rows.len() as i64,
        };

        let sync_recorded = match ctx.ledger.record(ctx.session_token, &session).await {
            Ok(row) => {
                tracing::info!(session_id = %row.id, "Sync session recorded");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to record sync session, sync still succeeded");
                false
            }
        };

        let outcome = SyncOutcome {
            rows_written: rows.len(),
            sync_recorded,
        };
        self.state = SyncState::Synced(outcome);
        Ok(outcome)
    }
}

/// Sheet row for a page, in [`SHEET_HEADER`] order.
pub fn page_row(page: &HubSpotPage) -> Vec<String> {
    vec![
        page.name.clone(),
        page.language.clone(),
        page.slug.clone(),
        page.url.clone(),
        format_us_short_date(&page.updated_at),
    ]
}

// ─── In-flight syncs ─────────────────────────────────────────────────────────

/// Targets currently being written by this process.
#[derive(Clone, Default)]
pub struct InFlightSyncs {
    targets: Arc<DashMap<SyncTarget, ()>>,
}

impl InFlightSyncs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `target`, or `None` if another sync holds it.
    pub fn try_acquire(&self, target: &SyncTarget) -> Option<InFlightGuard> {
        match self.targets.entry(target.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => None,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(());
                Some(InFlightGuard {
                    targets: self.targets.clone(),
                    target: target.clone(),
                })
            }
        }
    }

    pub fn is_busy(&self, target: &SyncTarget) -> bool {
        self.targets.contains_key(target)
    }
}

/// Releases its target on drop.
pub struct InFlightGuard {
    targets: Arc<DashMap<SyncTarget, ()>>,
    target: SyncTarget,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.targets.remove(&self.target);
    }
}
