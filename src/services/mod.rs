// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - integrations and the sync workflow.

pub mod credentials;
pub mod google;
pub mod hubspot;
pub mod sync;

pub use credentials::CredentialStore;
pub use google::{GoogleSheetsGateway, SpreadsheetSummary, TabStatus};
pub use hubspot::{HubSpotError, HubSpotGateway, PageListing};
pub use sync::{InFlightSyncs, SyncOutcome, SyncTarget, SyncWorkflow};
