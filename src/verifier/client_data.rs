//! clientDataJSON parsing and context checks
//!
//! The client data carries the ceremony type, the challenge the client
//! believes it answered, and the origin the browser reports. All three are
//! checked against server-side expectations; challenge and origin are
//! compared byte-exact.

use base64::prelude::*;
use serde::Deserialize;

use super::{CheckFailure, Expected, VerifyError};

/// Ceremony type embedded by the client during credential creation
pub const TYPE_CREATE: &str = "webauthn.create";
/// Ceremony type embedded by the client during assertion
pub const TYPE_GET: &str = "webauthn.get";

/// The parsed clientDataJSON structure
#[derive(Debug, Deserialize)]
pub struct CollectedClientData {
    #[serde(rename = "type")]
    pub ty: String,
    /// Challenge as the client saw it: unpadded base64url
    pub challenge: String,
    pub origin: String,
    #[serde(default, rename = "crossOrigin")]
    pub cross_origin: bool,
}

pub fn parse(raw: &[u8]) -> Result<CollectedClientData, VerifyError> {
    serde_json::from_slice(raw)
        .map_err(|e| VerifyError::Malformed(format!("clientDataJSON: {}", e)))
}

/// Check type, challenge and origin against expectations
///
/// A challenge field that does not decode as base64url cannot match and is
/// reported as a challenge mismatch rather than a malformed request.
pub fn check(
    data: &CollectedClientData,
    expected_type: &str,
    expected: &Expected,
) -> Result<(), VerifyError> {
    if data.ty != expected_type {
        return Err(CheckFailure::TypeMismatch.into());
    }

    let challenge = BASE64_URL_SAFE_NO_PAD
        .decode(&data.challenge)
        .map_err(|_| VerifyError::from(CheckFailure::ChallengeMismatch))?;
    if challenge != expected.challenge {
        return Err(CheckFailure::ChallengeMismatch.into());
    }

    if data.origin != expected.origin {
        return Err(CheckFailure::OriginMismatch.into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected() -> Expected {
        Expected {
            challenge: b"test-challenge".to_vec(),
            origin: "http://localhost:8080".to_string(),
            rp_id: "localhost".to_string(),
            require_user_verification: false,
        }
    }

    fn client_data(ty: &str, challenge: &[u8], origin: &str) -> CollectedClientData {
        CollectedClientData {
            ty: ty.to_string(),
            challenge: BASE64_URL_SAFE_NO_PAD.encode(challenge),
            origin: origin.to_string(),
            cross_origin: false,
        }
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        assert!(matches!(
            parse(b"not json"),
            Err(VerifyError::Malformed(_))
        ));
    }

    #[test]
    fn test_check_accepts_matching_data() {
        let data = client_data(TYPE_CREATE, b"test-challenge", "http://localhost:8080");
        assert!(check(&data, TYPE_CREATE, &expected()).is_ok());
    }

    #[test]
    fn test_check_rejects_wrong_type() {
        let data = client_data(TYPE_GET, b"test-challenge", "http://localhost:8080");
        assert!(matches!(
            check(&data, TYPE_CREATE, &expected()),
            Err(VerifyError::Check(CheckFailure::TypeMismatch))
        ));
    }

    #[test]
    fn test_check_rejects_wrong_challenge() {
        let data = client_data(TYPE_CREATE, b"other-challenge", "http://localhost:8080");
        assert!(matches!(
            check(&data, TYPE_CREATE, &expected()),
            Err(VerifyError::Check(CheckFailure::ChallengeMismatch))
        ));
    }

    #[test]
    fn test_check_rejects_undecodable_challenge() {
        let mut data = client_data(TYPE_CREATE, b"test-challenge", "http://localhost:8080");
        data.challenge = "!!not base64url!!".to_string();
        assert!(matches!(
            check(&data, TYPE_CREATE, &expected()),
            Err(VerifyError::Check(CheckFailure::ChallengeMismatch))
        ));
    }

    #[test]
    fn test_check_rejects_wrong_origin() {
        let data = client_data(TYPE_CREATE, b"test-challenge", "https://evil.example");
        assert!(matches!(
            check(&data, TYPE_CREATE, &expected()),
            Err(VerifyError::Check(CheckFailure::OriginMismatch))
        ));
    }
}
