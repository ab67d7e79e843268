//! # Ceremony Wire Types
//!
//! Request/response types crossing the HTTP boundary. Every byte-valued
//! field (challenge, credential id, public key, user id) travels as an
//! unpadded URL-safe base64 string; field names follow the WebAuthn JSON
//! shapes the browser API produces and consumes.

use serde::{Deserialize, Serialize};

use crate::store::models::{CredentialEntry, DeviceType};

/// Ceremony timeout hint sent to clients, in milliseconds
pub const CEREMONY_TIMEOUT_MS: u32 = 60_000;

/// Acceptable signature algorithms, strongest first: EdDSA, ES256, RS256
pub const SUPPORTED_ALGORITHMS: [i64; 3] = [-8, -7, -257];

/// Relying party identity sent in creation options
#[derive(Debug, Clone, Serialize)]
pub struct RelyingPartyEntity {
    pub id: String,
    pub name: String,
}

/// The candidate user's protocol-level identity
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    /// Opaque user handle, base64url
    pub id: String,
    pub name: String,
    pub display_name: String,
}

/// One acceptable signature algorithm
#[derive(Debug, Clone, Serialize)]
pub struct CredentialParameters {
    #[serde(rename = "type")]
    pub ty: String,
    pub alg: i64,
}

/// Reference to a registered credential, used in allow- and exclude-lists
#[derive(Debug, Clone, Serialize)]
pub struct CredentialDescriptor {
    #[serde(rename = "type")]
    pub ty: String,
    /// Credential id, base64url
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transports: Vec<String>,
}

impl CredentialDescriptor {
    pub fn from_credential(credential: &CredentialEntry) -> Self {
        use base64::prelude::*;
        Self {
            ty: "public-key".to_string(),
            id: BASE64_URL_SAFE_NO_PAD.encode(&credential.credential_id),
            transports: credential.transports.clone(),
        }
    }
}

/// Authenticator requirements for registration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    /// "discouraged", "preferred" or "required", from the active policy
    pub user_verification: String,
}

/// Registration ceremony parameter set (credential creation options)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOptions {
    pub rp: RelyingPartyEntity,
    pub user: UserEntity,
    /// Fresh challenge, base64url
    pub challenge: String,
    pub pub_key_cred_params: Vec<CredentialParameters>,
    pub timeout: u32,
    /// Attestation conveyance preference: "none" or "direct"
    pub attestation: String,
    /// Credentials already registered for this user, so one authenticator
    /// cannot double-register for the same account
    pub exclude_credentials: Vec<CredentialDescriptor>,
    pub authenticator_selection: AuthenticatorSelection,
}

/// Authentication ceremony parameter set (credential request options)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationOptions {
    /// Fresh challenge, base64url
    pub challenge: String,
    pub timeout: u32,
    pub rp_id: String,
    pub user_verification: String,
    /// The client must prove possession of exactly one of these
    pub allow_credentials: Vec<CredentialDescriptor>,
}

/// The attestation payload of a registration response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationPayload {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub attestation_object: String,
    #[serde(default)]
    pub transports: Vec<String>,
}

/// Signed registration ceremony response from the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub id: String,
    pub raw_id: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub response: AttestationPayload,
}

/// The assertion payload of an authentication response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionPayload {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub authenticator_data: String,
    pub signature: String,
    #[serde(default)]
    pub user_handle: Option<String>,
}

/// Signed authentication ceremony response (assertion) from the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResponse {
    pub id: String,
    pub raw_id: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub response: AssertionPayload,
}

/// Request to start passkey registration
///
/// ## Example JSON
/// ```json
/// { "username": "alice", "display_name": "Alice Smith" }
/// ```
#[derive(Debug, Deserialize)]
pub struct RegisterStartRequest {
    pub username: String,
    /// Optional; falls back to the username
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Request to complete passkey registration
#[derive(Debug, Deserialize)]
pub struct RegisterFinishRequest {
    pub username: String,
    /// The credential created by the authenticator
    pub credential: RegistrationResponse,
}

/// Request to start passkey authentication
#[derive(Debug, Deserialize)]
pub struct AuthenticateStartRequest {
    pub username: String,
}

/// Request to complete passkey authentication
#[derive(Debug, Deserialize)]
pub struct AuthenticateFinishRequest {
    pub username: String,
    /// The signed assertion from the authenticator
    pub credential: AuthenticationResponse,
}

/// Public info about a newly stored credential
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationSummary {
    /// Credential id, base64url
    pub credential_id: String,
    pub device_type: DeviceType,
    pub backed_up: bool,
    pub aaguid: String,
    pub attestation_format: String,
    pub user_verified: bool,
}

/// Outcome details of a successful authentication
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationSummary {
    /// Credential id, base64url
    pub credential_id: String,
    pub new_counter: u32,
    pub user_verified: bool,
}

/// Verification outcome returned by both finish operations
///
/// `verified: false` is a normal negative result; callers branch on the
/// boolean. Request-shape problems surface as errors before verification
/// is attempted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_info: Option<RegistrationSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication_info: Option<AuthenticationSummary>,
}

impl VerificationResult {
    pub fn failed() -> Self {
        Self {
            verified: false,
            registration_info: None,
            authentication_info: None,
        }
    }

    pub fn registered(info: RegistrationSummary) -> Self {
        Self {
            verified: true,
            registration_info: Some(info),
            authentication_info: None,
        }
    }

    pub fn authenticated(info: AuthenticationSummary) -> Self {
        Self {
            verified: true,
            registration_info: None,
            authentication_info: Some(info),
        }
    }
}
