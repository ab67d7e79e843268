//! Production ceremony verifier
//!
//! Composes the parsing and crypto submodules into the two verification
//! entry points. Context checks shared by both ceremonies: the rpId hash in
//! the authenticator data must equal SHA-256 of the configured rpId, the
//! user-presence flag must be set, and the user-verification flag must be
//! set whenever the active policy demands it.

use base64::prelude::*;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::store::models::CredentialEntry;
use crate::webauthn::types::{AuthenticationResponse, RegistrationResponse};

use super::authenticator_data::AuthenticatorData;
use super::cose::CoseKey;
use super::{
    attestation, authenticator_data, client_data, AuthenticationInfo, CeremonyVerifier,
    CheckFailure, Expected, RegistrationInfo, VerifyError,
};

/// Verifier backed by the in-process WebAuthn parsing and crypto stack
#[derive(Debug, Default)]
pub struct WebauthnVerifier;

impl WebauthnVerifier {
    pub fn new() -> Self {
        Self
    }
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, VerifyError> {
    BASE64_URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|_| VerifyError::Malformed(format!("{} is not valid base64url", name)))
}

fn check_context(auth: &AuthenticatorData, expected: &Expected) -> Result<(), VerifyError> {
    let expected_hash = Sha256::digest(expected.rp_id.as_bytes());
    if auth.rp_id_hash != expected_hash.as_slice() {
        return Err(CheckFailure::RpIdHashMismatch.into());
    }
    if !auth.user_present {
        return Err(CheckFailure::UserNotPresent.into());
    }
    if expected.require_user_verification && !auth.user_verified {
        return Err(CheckFailure::UserNotVerified.into());
    }
    Ok(())
}

impl CeremonyVerifier for WebauthnVerifier {
    fn verify_registration(
        &self,
        response: &RegistrationResponse,
        expected: &Expected,
    ) -> Result<RegistrationInfo, VerifyError> {
        let client_bytes = decode_field("clientDataJSON", &response.response.client_data_json)?;
        let client = client_data::parse(&client_bytes)?;
        client_data::check(&client, client_data::TYPE_CREATE, expected)?;

        let att_bytes = decode_field("attestationObject", &response.response.attestation_object)?;
        let att = attestation::parse(&att_bytes)?;
        let auth = authenticator_data::parse(&att.auth_data)?;
        check_context(&auth, expected)?;

        let attested = auth.attested_credential.ok_or_else(|| {
            VerifyError::Malformed("attested credential data missing".to_string())
        })?;

        // The outer credential id must be the one inside the authenticator data
        let raw_id = decode_field("rawId", &response.raw_id)?;
        if raw_id != attested.credential_id {
            return Err(CheckFailure::CredentialMismatch.into());
        }

        // Reject unsupported key types before anything reaches the store
        CoseKey::parse(&attested.public_key)?;

        Ok(RegistrationInfo {
            credential_id: attested.credential_id,
            public_key: attested.public_key,
            counter: auth.sign_count,
            aaguid: Uuid::from_bytes(attested.aaguid).to_string(),
            attestation_format: att.fmt,
            backup_eligible: auth.backup_eligible,
            backed_up: auth.backup_state,
            user_verified: auth.user_verified,
        })
    }

    fn verify_authentication(
        &self,
        response: &AuthenticationResponse,
        expected: &Expected,
        credential: &CredentialEntry,
    ) -> Result<AuthenticationInfo, VerifyError> {
        let client_bytes = decode_field("clientDataJSON", &response.response.client_data_json)?;
        let client = client_data::parse(&client_bytes)?;
        client_data::check(&client, client_data::TYPE_GET, expected)?;

        let auth_bytes = decode_field("authenticatorData", &response.response.authenticator_data)?;
        let auth = authenticator_data::parse(&auth_bytes)?;
        check_context(&auth, expected)?;

        let signature = decode_field("signature", &response.response.signature)?;
        let key = CoseKey::parse(&credential.public_key)?;

        // Signed message: authenticatorData || SHA-256(clientDataJSON)
        let mut message = auth_bytes;
        message.extend_from_slice(&Sha256::digest(&client_bytes));
        key.verify(&message, &signature)?;

        Ok(AuthenticationInfo {
            new_counter: auth.sign_count,
            user_verified: auth.user_verified,
            backed_up: auth.backup_state,
        })
    }
}
