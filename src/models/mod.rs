// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod credential;
pub mod page;
pub mod sync_session;

pub use credential::{GoogleCredential, HubSpotToken, TokenGrant};
pub use page::{HubSpotPage, PageFilter};
pub use sync_session::{NewSyncSession, SyncSession};
