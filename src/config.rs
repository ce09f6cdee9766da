// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup. The upstream endpoints live in the
//! per-gateway config structs so that tests can point them at local stubs.

use std::env;

const DEFAULT_DASHBOARD_URL: &str = "http://localhost:3000/dashboard";

/// Google OAuth client settings and API endpoints.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// OAuth client ID (absent until the operator configures it)
    pub client_id: Option<String>,
    /// OAuth client secret
    pub client_secret: Option<String>,
    /// Registered OAuth redirect URI (points at `/auth/google/callback`)
    pub redirect_uri: Option<String>,
    pub auth_url: String,
    pub token_url: String,
    pub drive_api_url: String,
    pub sheets_api_url: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            drive_api_url: "https://www.googleapis.com".to_string(),
            sheets_api_url: "https://sheets.googleapis.com".to_string(),
        }
    }
}

/// HubSpot API settings. The token itself is supplied by the user at runtime.
#[derive(Debug, Clone)]
pub struct HubSpotConfig {
    pub api_url: String,
    /// Site domain used when a page carries no URL of its own.
    pub site_domain: Option<String>,
}

impl Default for HubSpotConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.hubapi.com".to_string(),
            site_domain: None,
        }
    }
}

/// Supabase project settings (auth + REST ledger).
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Anonymous (publishable) API key
    pub anon_key: String,
    /// Secret used to verify session JWTs (raw bytes)
    pub jwt_secret: Vec<u8>,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub google: GoogleConfig,
    pub hubspot: HubSpotConfig,
    pub supabase: SupabaseConfig,
    /// Dashboard page the OAuth callback redirects back to
    pub dashboard_url: String,
    /// Frontend origin allowed by CORS
    pub frontend_url: String,
    /// Key for signing the OAuth `state` parameter
    pub oauth_state_key: Vec<u8>,
    /// Server port
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Google OAuth credentials are optional here; their absence is reported
    /// as a configuration error when the OAuth flow is started.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let dashboard_url = optional("DASHBOARD_URL")
            .unwrap_or_else(|| DEFAULT_DASHBOARD_URL.to_string());
        let frontend_url = optional("FRONTEND_URL").unwrap_or_else(|| origin_of(&dashboard_url));

        let google = GoogleConfig {
            client_id: optional("GOOGLE_CLIENT_ID"),
            client_secret: optional("GOOGLE_CLIENT_SECRET"),
            redirect_uri: optional("GOOGLE_REDIRECT_URI"),
            ..GoogleConfig::default()
        };

        let hubspot = HubSpotConfig {
            api_url: optional("HUBSPOT_API_URL")
                .unwrap_or_else(|| HubSpotConfig::default().api_url),
            site_domain: optional("HUBSPOT_SITE_DOMAIN"),
        };

        let supabase = SupabaseConfig {
            url: required("SUPABASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            anon_key: required("SUPABASE_ANON_KEY")?,
            jwt_secret: required("SUPABASE_JWT_SECRET")?.into_bytes(),
        };

        Ok(Self {
            google,
            hubspot,
            supabase,
            dashboard_url,
            frontend_url,
            oauth_state_key: required("OAUTH_STATE_KEY")?.into_bytes(),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
        })
    }

    /// Fully populated configuration for tests.
    pub fn test_default() -> Self {
        Self {
            google: GoogleConfig {
                client_id: Some("test_client_id".to_string()),
                client_secret: Some("test_client_secret".to_string()),
                redirect_uri: Some("http://localhost:8080/auth/google/callback".to_string()),
                ..GoogleConfig::default()
            },
            hubspot: HubSpotConfig::default(),
            supabase: SupabaseConfig {
                url: "http://localhost:54321".to_string(),
                anon_key: "test_anon_key".to_string(),
                jwt_secret: b"test_supabase_jwt_secret_32_bytes!".to_vec(),
            },
            dashboard_url: DEFAULT_DASHBOARD_URL.to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            oauth_state_key: b"test_oauth_state_key".to_vec(),
            port: 8080,
        }
    }

    /// Whether credential cookies must carry the `Secure` attribute.
    pub fn cookies_secure(&self) -> bool {
        self.dashboard_url.starts_with("https://")
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

/// `scheme://host[:port]` of a URL, or the input unchanged if it won't parse.
fn origin_of(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(parsed) => parsed.origin().ascii_serialization(),
        Err(_) => raw.to_string(),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
