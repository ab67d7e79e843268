//! # Ceremony Verifier
//!
//! Cryptographic verification of registration and authentication ceremony
//! responses, behind the [`CeremonyVerifier`] trait so the protocol core
//! depends on a capability, not a concrete implementation. The production
//! implementation ([`WebauthnVerifier`]) parses the authenticator data
//! structure, recomputes and compares the rpId hash, verifies the signature
//! over `authenticatorData || SHA-256(clientDataJSON)` with the stored
//! public key, and confirms the `type`, `challenge` and `origin` fields
//! embedded in `clientDataJSON`.
//!
//! ## Submodules
//! - `client_data`: clientDataJSON parsing and context checks
//! - `authenticator_data`: authenticator data and attested credential parsing
//! - `attestation`: attestation object CBOR decoding
//! - `cose`: COSE public keys and signature verification

pub mod attestation;
pub mod authenticator_data;
pub mod client_data;
pub mod cose;

mod webauthn;

pub use webauthn::WebauthnVerifier;

use thiserror::Error;

use crate::store::models::CredentialEntry;
use crate::webauthn::types::{AuthenticationResponse, RegistrationResponse};

/// Server-side expectations a ceremony response is verified against
#[derive(Debug, Clone)]
pub struct Expected {
    /// The challenge popped from the ledger for this username
    pub challenge: Vec<u8>,
    /// Configured relying-party origin, matched byte-exact
    pub origin: String,
    /// Configured relying-party id; its SHA-256 must match the rpId hash
    /// in the authenticator data
    pub rp_id: String,
    /// Whether the active policy demands the user-verification flag
    pub require_user_verification: bool,
}

/// Public registration info extracted from a verified attestation response
#[derive(Debug, Clone)]
pub struct RegistrationInfo {
    pub credential_id: Vec<u8>,
    /// COSE-encoded public key, stored verbatim for later assertions
    pub public_key: Vec<u8>,
    /// Initial signature counter reported by the authenticator
    pub counter: u32,
    /// Authenticator model id
    pub aaguid: String,
    /// Attestation statement format ("none", "packed", ...)
    pub attestation_format: String,
    pub backup_eligible: bool,
    pub backed_up: bool,
    pub user_verified: bool,
}

/// Outcome of a verified assertion
#[derive(Debug, Clone, Copy)]
pub struct AuthenticationInfo {
    /// Signature counter reported in this assertion; the caller enforces
    /// monotonicity against the stored value
    pub new_counter: u32,
    pub user_verified: bool,
    pub backed_up: bool,
}

/// A specific ceremony check that did not pass
///
/// These are normal negative outcomes: the caller reports them as
/// `verified: false`, not as a request error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CheckFailure {
    #[error("client data type mismatch")]
    TypeMismatch,
    #[error("challenge mismatch")]
    ChallengeMismatch,
    #[error("origin mismatch")]
    OriginMismatch,
    #[error("relying party id hash mismatch")]
    RpIdHashMismatch,
    #[error("user presence flag not set")]
    UserNotPresent,
    #[error("user verification required but flag not set")]
    UserNotVerified,
    #[error("credential id does not match attested credential data")]
    CredentialMismatch,
    #[error("unsupported credential algorithm")]
    UnsupportedAlgorithm,
    #[error("signature verification failed")]
    BadSignature,
}

/// Verifier errors
///
/// `Malformed` means the response could not even be decoded and is rejected
/// as a bad request; `Check` means a well-formed response failed one of the
/// cryptographic or contextual checks.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("malformed ceremony response: {0}")]
    Malformed(String),

    #[error("{0}")]
    Check(#[from] CheckFailure),
}

/// External cryptographic capability trusted by the protocol core
pub trait CeremonyVerifier: Send + Sync {
    /// Verify a registration (attestation) response and extract the new
    /// credential's public info
    fn verify_registration(
        &self,
        response: &RegistrationResponse,
        expected: &Expected,
    ) -> Result<RegistrationInfo, VerifyError>;

    /// Verify an authentication (assertion) response against a stored
    /// credential
    fn verify_authentication(
        &self,
        response: &AuthenticationResponse,
        expected: &Expected,
        credential: &CredentialEntry,
    ) -> Result<AuthenticationInfo, VerifyError>;
}
