//! # Application State
//!
//! Shared state accessible to all request handlers. The protocol core's
//! collaborators are injected here — the store, the ceremony verifier and
//! the policy are explicit dependencies behind `Arc`, never process
//! globals, so tests can assemble a state around an in-memory store and
//! drive the full protocol without HTTP.

use std::sync::Arc;

use crate::config::Config;
use crate::store::{Store, UserLocks};
use crate::verifier::{CeremonyVerifier, WebauthnVerifier};
use crate::webauthn::policy::PolicyHandle;

/// Relying party identity the ceremonies are bound to
#[derive(Debug, Clone)]
pub struct RelyingParty {
    /// rpId, conceptually the domain operating this service
    pub id: String,
    /// Human-readable service name shown during passkey creation
    pub name: String,
    /// Full origin URL, matched byte-exact against ceremony responses
    pub origin: String,
    /// Attestation conveyance preference: "none" or "direct"
    pub attestation: String,
}

impl RelyingParty {
    pub fn from_config(config: &Config) -> Self {
        Self {
            id: config.rp_id.clone(),
            name: config.rp_name.clone(),
            origin: config.rp_origin.clone(),
            attestation: config.attestation.clone(),
        }
    }
}

/// Shared application state
///
/// Cloning is cheap: every field is an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Credential store + challenge ledger
    pub store: Arc<dyn Store>,
    /// Cryptographic ceremony verifier
    pub verifier: Arc<dyn CeremonyVerifier>,
    /// Process-wide user-verification policy
    pub policy: Arc<PolicyHandle>,
    /// Relying party identity
    pub rp: Arc<RelyingParty>,
    /// Per-username ceremony locks
    pub locks: Arc<UserLocks>,
}

impl AppState {
    /// Assemble the state for the given configuration and store backend
    pub fn new(config: &Config, store: Arc<dyn Store>) -> Self {
        Self::with_parts(
            store,
            Arc::new(WebauthnVerifier::new()),
            RelyingParty::from_config(config),
            PolicyHandle::new(config.uv_mode, config.uv_mode_locked),
        )
    }

    /// Assemble the state from explicit collaborators (used by tests)
    pub fn with_parts(
        store: Arc<dyn Store>,
        verifier: Arc<dyn CeremonyVerifier>,
        rp: RelyingParty,
        policy: PolicyHandle,
    ) -> Self {
        Self {
            store,
            verifier,
            policy: Arc::new(policy),
            rp: Arc::new(rp),
            locks: Arc::new(UserLocks::new()),
        }
    }
}
