//! Authenticator data parsing
//!
//! The authenticator data structure is a fixed 37-byte header (rpId hash,
//! flags byte, big-endian signature counter) optionally followed by
//! attested credential data (AAGUID, credential id, COSE public key) when
//! the AT flag is set, and by extension data when the ED flag is set.
//! Extension payloads are tolerated but left unparsed.

use super::VerifyError;

pub const FLAG_USER_PRESENT: u8 = 0b0000_0001;
pub const FLAG_USER_VERIFIED: u8 = 0b0000_0100;
pub const FLAG_BACKUP_ELIGIBLE: u8 = 0b0000_1000;
pub const FLAG_BACKUP_STATE: u8 = 0b0001_0000;
pub const FLAG_ATTESTED_CREDENTIAL_DATA: u8 = 0b0100_0000;
pub const FLAG_EXTENSION_DATA: u8 = 0b1000_0000;

/// Parsed authenticator data
#[derive(Debug, Clone)]
pub struct AuthenticatorData {
    /// SHA-256 of the rpId the authenticator scoped this operation to
    pub rp_id_hash: Vec<u8>,
    pub user_present: bool,
    pub user_verified: bool,
    pub backup_eligible: bool,
    pub backup_state: bool,
    /// Big-endian signature counter; zero forever on counter-less devices
    pub sign_count: u32,
    /// Present when the AT flag is set (registration ceremonies)
    pub attested_credential: Option<AttestedCredentialData>,
}

/// Attested credential data embedded at registration
#[derive(Debug, Clone)]
pub struct AttestedCredentialData {
    pub aaguid: [u8; 16],
    pub credential_id: Vec<u8>,
    /// COSE key bytes, exactly as long as the CBOR value they encode
    pub public_key: Vec<u8>,
}

pub fn parse(bytes: &[u8]) -> Result<AuthenticatorData, VerifyError> {
    if bytes.len() < 37 {
        return Err(VerifyError::Malformed(
            "authenticator data too short".to_string(),
        ));
    }

    let rp_id_hash = bytes[0..32].to_vec();
    let flags = bytes[32];
    let sign_count_bytes: [u8; 4] = bytes[33..37]
        .try_into()
        .map_err(|_| VerifyError::Malformed("sign count truncated".to_string()))?;
    let sign_count = u32::from_be_bytes(sign_count_bytes);

    let attested_credential = if flags & FLAG_ATTESTED_CREDENTIAL_DATA != 0 {
        Some(parse_attested_credential(&bytes[37..])?)
    } else {
        None
    };

    Ok(AuthenticatorData {
        rp_id_hash,
        user_present: flags & FLAG_USER_PRESENT != 0,
        user_verified: flags & FLAG_USER_VERIFIED != 0,
        backup_eligible: flags & FLAG_BACKUP_ELIGIBLE != 0,
        backup_state: flags & FLAG_BACKUP_STATE != 0,
        sign_count,
        attested_credential,
    })
}

fn parse_attested_credential(rest: &[u8]) -> Result<AttestedCredentialData, VerifyError> {
    if rest.len() < 18 {
        return Err(VerifyError::Malformed(
            "attested credential data too short".to_string(),
        ));
    }

    let mut aaguid = [0u8; 16];
    aaguid.copy_from_slice(&rest[0..16]);

    let id_len = u16::from_be_bytes([rest[16], rest[17]]) as usize;
    if rest.len() < 18 + id_len {
        return Err(VerifyError::Malformed(
            "credential id truncated".to_string(),
        ));
    }
    let credential_id = rest[18..18 + id_len].to_vec();

    // The COSE key is a single CBOR value; extension data may follow it, so
    // decode one value and keep exactly the bytes it occupied
    let key_bytes = &rest[18 + id_len..];
    let mut deserializer = serde_cbor::Deserializer::from_slice(key_bytes);
    let _: serde_cbor::Value = serde::Deserialize::deserialize(&mut deserializer)
        .map_err(|e| VerifyError::Malformed(format!("credential public key: {}", e)))?;
    let consumed = deserializer.byte_offset();

    Ok(AttestedCredentialData {
        aaguid,
        credential_id,
        public_key: key_bytes[..consumed].to_vec(),
    })
}
