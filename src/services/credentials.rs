// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google credential persistence in the browser session's cookies.
//!
//! The access token, refresh token and the access token's expiry each live
//! in their own httpOnly, `SameSite=Lax` cookie scoped to `/`. Reads never
//! fail: anything missing or unparseable is reported as disconnected.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};

use crate::models::{GoogleCredential, TokenGrant};

pub const ACCESS_TOKEN_COOKIE: &str = "google_access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "google_refresh_token";
pub const EXPIRES_AT_COOKIE: &str = "google_token_expires_at";

/// Used when Google doesn't report `expires_in`.
const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 3599;
const REFRESH_TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Cookie-backed store for the Google OAuth credential.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    secure: bool,
}

impl CredentialStore {
    /// `secure` adds the `Secure` attribute (production, https dashboard).
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    /// Write the token set into the jar, replacing whatever was there.
    ///
    /// The refresh cookie is only touched when the grant carries one, so a
    /// refresh that doesn't rotate the refresh token keeps the old one.
    pub fn store_google_tokens(
        &self,
        jar: CookieJar,
        grant: &TokenGrant,
        now: DateTime<Utc>,
    ) -> CookieJar {
        let ttl = grant
            .expires_in
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_ACCESS_TOKEN_TTL_SECS);
        let expires_at = now + Duration::seconds(ttl);

        let mut jar = jar
            .add(self.cookie(ACCESS_TOKEN_COOKIE, grant.access_token.clone(), ttl))
            .add(self.cookie(EXPIRES_AT_COOKIE, expires_at.to_rfc3339(), ttl));

        if let Some(refresh_token) = grant.refresh_token.as_deref().filter(|t| !t.is_empty()) {
            jar = jar.add(self.cookie(
                REFRESH_TOKEN_COOKIE,
                refresh_token.to_string(),
                REFRESH_TOKEN_TTL_SECS,
            ));
        }

        jar
    }

    /// Connected means a non-empty access token cookie is present.
    ///
    /// The token is not checked against Google.
    pub fn read_google_connection(&self, jar: &CookieJar) -> bool {
        non_empty(jar, ACCESS_TOKEN_COOKIE).is_some()
    }

    /// Load the stored credential, if there is anything usable.
    ///
    /// Once the browser drops the expired access cookie only the refresh
    /// token may remain; that still yields a credential (already expired)
    /// so the caller can refresh it.
    pub fn load_google_credential(&self, jar: &CookieJar) -> Option<GoogleCredential> {
        let access_token = non_empty(jar, ACCESS_TOKEN_COOKIE);
        let refresh_token = non_empty(jar, REFRESH_TOKEN_COOKIE);

        if access_token.is_none() && refresh_token.is_none() {
            return None;
        }

        let expires_at = access_token.as_ref().and_then(|_| {
            non_empty(jar, EXPIRES_AT_COOKIE)
                .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
                .map(|dt| dt.with_timezone(&Utc))
        });

        Some(GoogleCredential {
            access_token: access_token.unwrap_or_default(),
            refresh_token,
            expires_at,
        })
    }

    /// Remove all credential cookies. Absent cookies are simply skipped.
    pub fn clear_google_connection(&self, jar: CookieJar) -> CookieJar {
        [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, EXPIRES_AT_COOKIE]
            .into_iter()
            .fold(jar, |jar, name| jar.remove(self.cookie(name, String::new(), 0)))
    }

    fn cookie(&self, name: &'static str, value: String, max_age_secs: i64) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(max_age_secs))
            .build()
    }
}

fn non_empty(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|c| c.value().trim().to_string())
        .filter(|v| !v.is_empty())
}
