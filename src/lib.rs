//! Passkey Gate library - passwordless authentication over a
//! challenge-response public-key protocol.
//!
//! This library exposes the server components for use in integration tests.
//! The main binary uses these same components.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;
pub mod store;
pub mod validation;
pub mod verifier;
pub mod webauthn;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::{AppState, RelyingParty};
pub use store::{CredentialEntry, MemoryStore, SqliteStore, Store, StoreError, User};
pub use verifier::{CeremonyVerifier, WebauthnVerifier};
pub use webauthn::policy::{PolicyHandle, UvMode};
