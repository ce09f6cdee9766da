// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Supabase session authentication middleware.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AppError;

/// Cookie carrying the Supabase session token.
pub const SESSION_COOKIE: &str = "sb-access-token";

/// Audience Supabase puts on signed-in users' tokens.
pub const SESSION_AUDIENCE: &str = "authenticated";

/// Supabase JWT claims we rely on.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (Supabase user id)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Audience (`authenticated`)
    pub aud: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Authenticated user extracted from the session token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    /// Raw session token, forwarded to Supabase so row-level security applies.
    pub access_token: String,
}

/// Middleware that requires a valid Supabase session.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Header first, then cookie
    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string);

    let token = bearer
        .or_else(|| jar.get(SESSION_COOKIE).map(|c| c.value().to_string()))
        .filter(|t| !t.is_empty())
        .ok_or(AppError::NotAuthenticated)?;

    let claims = verify_session_token(&token, &state.config.supabase.jwt_secret)?;

    request.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
        access_token: token,
    });

    Ok(next.run(request).await)
}

/// Verify an HS256 Supabase session token and return its claims.
pub fn verify_session_token(token: &str, secret: &[u8]) -> Result<Claims, AppError> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[SESSION_AUDIENCE]);

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| {
        tracing::debug!(error = %e, "Rejected session token");
        AppError::InvalidSession
    })?;

    if token_data.claims.sub.is_empty() {
        return Err(AppError::InvalidSession);
    }

    Ok(token_data.claims)
}
