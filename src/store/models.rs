//! # Storage Models
//!
//! Data structures held by the credential store. A [`User`] owns zero or
//! more [`CredentialEntry`] values, unique by credential id; the entry holds
//! everything needed to verify a future authentication: the public key, the
//! signature counter, and descriptive metadata captured at registration.
//!
//! Only public key material is stored. The private key stays on the user's
//! authenticator and never reaches this server.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User account information
///
/// Each user can have multiple passkey credentials. The `id` is the opaque
/// protocol-level identifier; `username` is the human-facing lookup key and
/// is stored case-normalized.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique identifier (UUID v4), immutable after creation
    pub id: String,

    /// Unique case-normalized username; primary lookup key
    pub username: String,

    /// Human-readable display name, cosmetic only
    pub display_name: String,

    /// When the account was created (RFC 3339 timestamp)
    pub created_at: String,

    /// Registered credentials, unique by `credential_id`, in registration order
    pub credentials: Vec<CredentialEntry>,
}

impl User {
    /// Create a new user with a generated id, current timestamp and no
    /// credentials
    pub fn new(username: String, display_name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            display_name,
            created_at: Utc::now().to_rfc3339(),
            credentials: Vec::new(),
        }
    }

    /// Whether a credential with this id is already registered
    pub fn has_credential(&self, credential_id: &[u8]) -> bool {
        self.credentials
            .iter()
            .any(|c| c.credential_id == credential_id)
    }

    /// Look up a credential by id
    pub fn credential(&self, credential_id: &[u8]) -> Option<&CredentialEntry> {
        self.credentials
            .iter()
            .find(|c| c.credential_id == credential_id)
    }
}

/// Whether a credential is bound to a single authenticator or syncable
/// across devices (platform passkey)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceType {
    SingleDevice,
    MultiDevice,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::SingleDevice => "singleDevice",
            DeviceType::MultiDevice => "multiDevice",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "singleDevice" => Some(DeviceType::SingleDevice),
            "multiDevice" => Some(DeviceType::MultiDevice),
            _ => None,
        }
    }
}

/// One hardware key binding for a user
///
/// ## Security: Signature Counter
/// The counter is reported by the authenticator on every assertion and must
/// never decrease across successful verifications. A decrease signals a
/// possibly cloned key and fails verification. Authenticators that do not
/// implement counters report zero forever; that case is tolerated.
#[derive(Debug, Clone)]
pub struct CredentialEntry {
    /// Opaque credential identifier assigned by the authenticator, immutable
    pub credential_id: Vec<u8>,

    /// COSE-encoded public key material, immutable once stored
    pub public_key: Vec<u8>,

    /// Monotonically non-decreasing usage counter
    pub counter: u32,

    /// Advisory transport hints ("usb", "nfc", "ble", "internal")
    pub transports: Vec<String>,

    /// Single-device key or syncable passkey, captured at registration
    pub device_type: DeviceType,

    /// Whether the credential is currently backed up (synced to cloud)
    pub backed_up: bool,

    /// Authenticator model id (AAGUID), captured at registration
    pub aaguid: String,

    /// When the credential was registered (RFC 3339 timestamp)
    pub created_at: String,

    /// When the credential last passed authentication
    pub last_used_at: Option<String>,
}

impl CredentialEntry {
    /// Touch the last-used timestamp
    pub fn mark_used(&mut self) {
        self.last_used_at = Some(Utc::now().to_rfc3339());
    }
}
