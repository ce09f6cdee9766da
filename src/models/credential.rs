// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Integration credentials: the Google OAuth token set and the HubSpot
//! private-app token.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// Google OAuth credential held in the browser session's cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleCredential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// When the access token expires. `None` means unknown.
    pub expires_at: Option<DateTime<Utc>>,
}

impl GoogleCredential {
    /// A token without a known expiry counts as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => true,
        }
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }
}

/// Token set returned by Google's token endpoint (code exchange or refresh).
#[derive(Clone, Deserialize)]
pub struct TokenGrant {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// HubSpot private-app bearer token pasted by the user.
///
/// Only lives for the duration of a request; `Debug` never prints the value.
#[derive(Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct HubSpotToken(String);

impl HubSpotToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for HubSpotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HubSpotToken(***)")
    }
}
