//! Attestation object decoding
//!
//! The attestation object is a CBOR map with three entries: `fmt` (the
//! attestation statement format), `authData` (the raw authenticator data)
//! and `attStmt` (the format-specific statement). Statement contents are
//! not chain-validated here; the format is recorded and the authenticator
//! data is handed on for parsing.

use serde_cbor::Value;

use super::VerifyError;

/// Decoded attestation object
#[derive(Debug, Clone)]
pub struct AttestationObject {
    /// Statement format: "none", "packed", "fido-u2f", ...
    pub fmt: String,
    /// Raw authenticator data bytes
    pub auth_data: Vec<u8>,
}

pub fn parse(raw: &[u8]) -> Result<AttestationObject, VerifyError> {
    let value: Value = serde_cbor::from_slice(raw)
        .map_err(|e| VerifyError::Malformed(format!("attestation object: {}", e)))?;

    let Value::Map(map) = value else {
        return Err(VerifyError::Malformed(
            "attestation object is not a CBOR map".to_string(),
        ));
    };

    let fmt = match map.get(&Value::Text("fmt".to_string())) {
        Some(Value::Text(fmt)) => fmt.clone(),
        _ => {
            return Err(VerifyError::Malformed(
                "attestation object missing fmt".to_string(),
            ))
        }
    };

    let auth_data = match map.get(&Value::Text("authData".to_string())) {
        Some(Value::Bytes(bytes)) => bytes.clone(),
        _ => {
            return Err(VerifyError::Malformed(
                "attestation object missing authData".to_string(),
            ))
        }
    };

    Ok(AttestationObject { fmt, auth_data })
}
