// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Supabase REST).

pub mod supabase;

pub use supabase::SyncLedger;

/// Table names as constants.
pub mod tables {
    pub const SYNC_SESSIONS: &str = "sync_sessions";
}
