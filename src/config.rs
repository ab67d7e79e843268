//! # Configuration Management
//!
//! This module handles loading configuration from environment variables.
//! Configuration comes from the environment ("12-factor" style), with a
//! `.env` file honored for local development.
//!
//! ## Environment Variables
//! - `HOST`: Server bind address (default: 127.0.0.1)
//! - `PORT`: Server port (default: 8080)
//! - `DATABASE_URL`: SQLite connection string; when unset, users, credentials
//!   and challenges live in process memory and are lost on restart
//! - `RP_ID`: Relying Party ID (usually your domain)
//! - `RP_ORIGIN`: Relying Party origin (full URL, matched byte-exact against
//!   ceremony responses)
//! - `RP_NAME`: Human-readable name for your service
//! - `ATTESTATION`: Attestation conveyance preference, `none` or `direct`
//! - `UV_MODE`: User-verification mode: `touch_only`, `pin_required` or
//!   `preferred`
//! - `UV_MODE_LOCK`: When truthy, the mode above is permanently locked for
//!   the process lifetime; mode-change requests then fail

use anyhow::{bail, Result};
use std::env;

use crate::webauthn::policy::UvMode;

/// Application configuration
///
/// ## WebAuthn Terminology
/// - **RP (Relying Party)**: The application that relies on authentication
/// - **RP ID**: Your domain name (e.g., "example.com" or "localhost")
/// - **RP Origin**: Full URL of your application (e.g., "https://example.com")
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host/IP address to bind to
    pub host: String,

    /// Server port number
    pub port: u16,

    /// SQLite database connection URL; `None` selects the in-memory store
    pub database_url: Option<String>,

    /// Relying Party ID; must match the domain the app is served from
    pub rp_id: String,

    /// Relying Party origin; full URL including protocol
    pub rp_origin: String,

    /// Application name shown to users during passkey creation
    pub rp_name: String,

    /// Attestation conveyance preference sent in registration options
    pub attestation: String,

    /// Initial user-verification mode
    pub uv_mode: UvMode,

    /// Whether the user-verification mode is locked at startup
    pub uv_mode_locked: bool,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Loads variables from a `.env` file if present, then reads each value
    /// from the environment, falling back to defaults suitable for local
    /// development. Returns an error if a value is present but unparseable.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let uv_mode = match env::var("UV_MODE") {
            Ok(raw) => match UvMode::parse(&raw) {
                Some(mode) => mode,
                None => bail!(
                    "UV_MODE must be one of touch_only, pin_required, preferred (got '{}')",
                    raw
                ),
            },
            Err(_) => UvMode::Preferred,
        };

        let attestation = env::var("ATTESTATION").unwrap_or_else(|_| "none".to_string());
        if attestation != "none" && attestation != "direct" {
            bail!(
                "ATTESTATION must be 'none' or 'direct' (got '{}')",
                attestation
            );
        }

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),

            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,

            // Unset or empty means no persistence: the in-memory store
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),

            rp_id: env::var("RP_ID").unwrap_or_else(|_| "localhost".to_string()),

            rp_origin: env::var("RP_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),

            rp_name: env::var("RP_NAME").unwrap_or_else(|_| "Passkey Gate".to_string()),

            attestation,
            uv_mode,
            uv_mode_locked: env::var("UV_MODE_LOCK")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }

    /// Socket address to bind the server to, e.g. "127.0.0.1:8080"
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
