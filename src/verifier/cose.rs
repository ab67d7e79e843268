//! COSE public keys and signature verification
//!
//! Credentials store their public key as the raw COSE bytes captured at
//! registration. This module parses those bytes into one of the supported
//! key types and verifies assertion signatures with the matching algorithm:
//! ES256 (COSE −7), RS256 (−257) or EdDSA (−8).
//!
//! ES256 signatures arrive ASN.1 DER encoded on the wire; a raw 64-byte
//! `r || s` encoding is accepted as a fallback.

use p256::ecdsa::signature::Verifier;
use p256::elliptic_curve::generic_array::GenericArray;
use rsa::pkcs1v15::Pkcs1v15Sign;
use serde_cbor::Value;
use sha2::{Digest, Sha256};

use super::{CheckFailure, VerifyError};

pub const ALG_EDDSA: i64 = -8;
pub const ALG_ES256: i64 = -7;
pub const ALG_RS256: i64 = -257;

// COSE key type registry values
const KTY_OKP: i128 = 1;
const KTY_EC2: i128 = 2;
const KTY_RSA: i128 = 3;

// Curve registry values
const CRV_P256: i128 = 1;
const CRV_ED25519: i128 = 6;

/// A parsed COSE public key
#[derive(Debug, Clone)]
pub enum CoseKey {
    Es256 { x: Vec<u8>, y: Vec<u8> },
    Rs256 { n: Vec<u8>, e: Vec<u8> },
    Ed25519 { x: Vec<u8> },
}

fn get_int(map: &std::collections::BTreeMap<Value, Value>, label: i128) -> Option<i128> {
    match map.get(&Value::Integer(label)) {
        Some(Value::Integer(v)) => Some(*v),
        _ => None,
    }
}

fn get_bytes(map: &std::collections::BTreeMap<Value, Value>, label: i128) -> Option<Vec<u8>> {
    match map.get(&Value::Integer(label)) {
        Some(Value::Bytes(b)) => Some(b.clone()),
        _ => None,
    }
}

impl CoseKey {
    /// Parse COSE key bytes, rejecting key types and algorithms outside the
    /// supported set
    pub fn parse(bytes: &[u8]) -> Result<Self, VerifyError> {
        let value: Value = serde_cbor::from_slice(bytes)
            .map_err(|e| VerifyError::Malformed(format!("COSE key: {}", e)))?;
        let Value::Map(map) = value else {
            return Err(VerifyError::Malformed("COSE key is not a map".to_string()));
        };

        let kty = get_int(&map, 1)
            .ok_or_else(|| VerifyError::Malformed("COSE key missing kty".to_string()))?;
        let alg = get_int(&map, 3)
            .ok_or_else(|| VerifyError::Malformed("COSE key missing alg".to_string()))?;

        match (kty, alg as i64) {
            (KTY_EC2, ALG_ES256) => {
                if get_int(&map, -1) != Some(CRV_P256) {
                    return Err(CheckFailure::UnsupportedAlgorithm.into());
                }
                let x = get_bytes(&map, -2)
                    .ok_or_else(|| VerifyError::Malformed("EC2 key missing x".to_string()))?;
                let y = get_bytes(&map, -3)
                    .ok_or_else(|| VerifyError::Malformed("EC2 key missing y".to_string()))?;
                if x.len() != 32 || y.len() != 32 {
                    return Err(VerifyError::Malformed(
                        "EC2 coordinates must be 32 bytes".to_string(),
                    ));
                }
                Ok(CoseKey::Es256 { x, y })
            }
            (KTY_RSA, ALG_RS256) => {
                let n = get_bytes(&map, -1)
                    .ok_or_else(|| VerifyError::Malformed("RSA key missing n".to_string()))?;
                let e = get_bytes(&map, -2)
                    .ok_or_else(|| VerifyError::Malformed("RSA key missing e".to_string()))?;
                Ok(CoseKey::Rs256 { n, e })
            }
            (KTY_OKP, ALG_EDDSA) => {
                if get_int(&map, -1) != Some(CRV_ED25519) {
                    return Err(CheckFailure::UnsupportedAlgorithm.into());
                }
                let x = get_bytes(&map, -2)
                    .ok_or_else(|| VerifyError::Malformed("OKP key missing x".to_string()))?;
                if x.len() != 32 {
                    return Err(VerifyError::Malformed(
                        "Ed25519 key must be 32 bytes".to_string(),
                    ));
                }
                Ok(CoseKey::Ed25519 { x })
            }
            _ => Err(CheckFailure::UnsupportedAlgorithm.into()),
        }
    }

    /// Registered algorithm number for this key
    pub fn algorithm(&self) -> i64 {
        match self {
            CoseKey::Es256 { .. } => ALG_ES256,
            CoseKey::Rs256 { .. } => ALG_RS256,
            CoseKey::Ed25519 { .. } => ALG_EDDSA,
        }
    }

    /// Verify `signature` over `message` with this key
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), VerifyError> {
        match self {
            CoseKey::Es256 { x, y } => {
                let point = p256::EncodedPoint::from_affine_coordinates(
                    GenericArray::from_slice(x),
                    GenericArray::from_slice(y),
                    false,
                );
                let key = p256::ecdsa::VerifyingKey::from_encoded_point(&point)
                    .map_err(|_| VerifyError::Malformed("invalid P-256 point".to_string()))?;
                let sig = p256::ecdsa::Signature::from_der(signature)
                    .or_else(|_| p256::ecdsa::Signature::from_slice(signature))
                    .map_err(|_| VerifyError::from(CheckFailure::BadSignature))?;
                key.verify(message, &sig)
                    .map_err(|_| CheckFailure::BadSignature.into())
            }
            CoseKey::Rs256 { n, e } => {
                let key = rsa::RsaPublicKey::new(
                    rsa::BigUint::from_bytes_be(n),
                    rsa::BigUint::from_bytes_be(e),
                )
                .map_err(|_| VerifyError::Malformed("invalid RSA public key".to_string()))?;
                let hashed = Sha256::digest(message);
                key.verify(Pkcs1v15Sign::new::<Sha256>(), &hashed, signature)
                    .map_err(|_| CheckFailure::BadSignature.into())
            }
            CoseKey::Ed25519 { x } => {
                let key_bytes: [u8; 32] = x
                    .as_slice()
                    .try_into()
                    .map_err(|_| VerifyError::Malformed("invalid Ed25519 key".to_string()))?;
                let key = ed25519_dalek::VerifyingKey::from_bytes(&key_bytes)
                    .map_err(|_| VerifyError::Malformed("invalid Ed25519 key".to_string()))?;
                let sig = ed25519_dalek::Signature::from_slice(signature)
                    .map_err(|_| VerifyError::from(CheckFailure::BadSignature))?;
                key.verify(message, &sig)
                    .map_err(|_| CheckFailure::BadSignature.into())
            }
        }
    }
}
