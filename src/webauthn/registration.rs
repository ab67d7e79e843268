//! # Passkey Registration Logic
//!
//! Server-side logic for creating new passkey credentials. Registration is
//! a two-step process: start and finish.
//!
//! ## Registration Flow
//! 1. **Start**: ensure the user record exists, mint a challenge, record it
//!    in the ledger, send creation options
//! 2. **Finish**: pop the challenge, verify the attestation response, store
//!    the public key
//!
//! The private key never leaves the user's device; only the public key and
//! registration metadata are stored.

use base64::prelude::*;
use chrono::Utc;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::store::models::{CredentialEntry, DeviceType};
use crate::store::Store;
use crate::validation;
use crate::verifier::{Expected, RegistrationInfo, VerifyError};
use crate::webauthn::types::*;

/// Start the passkey registration ceremony
///
/// Ensures a user record exists (create-if-absent), mints a fresh challenge
/// and records it in the ledger for this username, overwriting any previous
/// one. The returned options carry the relying-party identity, the user's
/// opaque handle, the acceptable algorithms, the attestation preference,
/// the user-verification requirement from the active policy, and an
/// exclusion list of already-registered credential ids so one authenticator
/// cannot double-register for the same account.
pub async fn start_registration(
    state: &AppState,
    username: &str,
    display_name: Option<&str>,
) -> AppResult<RegistrationOptions> {
    let username = validation::normalize_username(username)?;
    let display_name = validation::normalize_display_name(display_name, &username);

    let lock = state.locks.get(&username);
    let _guard = lock.lock().await;

    let user = state.store.upsert_user(&username, &display_name).await?;

    let challenge = super::mint_challenge();
    state.store.set_challenge(&username, &challenge).await?;

    tracing::debug!(username = %username, "issued registration challenge");

    Ok(RegistrationOptions {
        rp: RelyingPartyEntity {
            id: state.rp.id.clone(),
            name: state.rp.name.clone(),
        },
        user: UserEntity {
            id: BASE64_URL_SAFE_NO_PAD.encode(user.id.as_bytes()),
            name: user.username.clone(),
            display_name: user.display_name.clone(),
        },
        challenge: BASE64_URL_SAFE_NO_PAD.encode(&challenge),
        pub_key_cred_params: SUPPORTED_ALGORITHMS
            .iter()
            .map(|&alg| CredentialParameters {
                ty: "public-key".to_string(),
                alg,
            })
            .collect(),
        timeout: CEREMONY_TIMEOUT_MS,
        attestation: state.rp.attestation.clone(),
        exclude_credentials: user
            .credentials
            .iter()
            .map(CredentialDescriptor::from_credential)
            .collect(),
        authenticator_selection: AuthenticatorSelection {
            user_verification: state.policy.mode().requirement().to_string(),
        },
    })
}

/// Finish the passkey registration ceremony
///
/// Pops the expected challenge first — a missing challenge (never issued,
/// already consumed, or overwritten) fails with `ChallengeExpired` before
/// any cryptographic work, and the pop is final either way. The verifier
/// then checks the embedded challenge, origin and rpId hash, the
/// user-verification flag per the active policy, and extracts the new
/// credential. A failed check is a normal `verified: false` outcome.
///
/// Appending is idempotent by credential id: a duplicate registration
/// attempt is absorbed without growing the credential set.
pub async fn finish_registration(
    state: &AppState,
    username: &str,
    response: &RegistrationResponse,
) -> AppResult<VerificationResult> {
    let username = validation::normalize_username(username)?;

    let lock = state.locks.get(&username);
    let _guard = lock.lock().await;

    let challenge = state
        .store
        .pop_challenge(&username)
        .await?
        .ok_or(AppError::ChallengeExpired)?;

    let mut user = state
        .store
        .get_user(&username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User '{}' not found", username)))?;

    let expected = Expected {
        challenge,
        origin: state.rp.origin.clone(),
        rp_id: state.rp.id.clone(),
        require_user_verification: state.policy.mode().requires_verification(),
    };

    let info = match state.verifier.verify_registration(response, &expected) {
        Ok(info) => info,
        Err(VerifyError::Malformed(reason)) => return Err(AppError::BadRequest(reason)),
        Err(VerifyError::Check(check)) => {
            tracing::info!(username = %username, %check, "registration verification failed");
            return Ok(VerificationResult::failed());
        }
    };

    let summary = summarize(&info);

    if user.has_credential(&info.credential_id) {
        // Same authenticator registered again; absorb silently
        tracing::debug!(username = %username, "credential already registered");
        return Ok(VerificationResult::registered(summary));
    }

    user.credentials.push(CredentialEntry {
        credential_id: info.credential_id,
        public_key: info.public_key,
        counter: info.counter,
        transports: response.response.transports.clone(),
        device_type: summary.device_type,
        backed_up: info.backed_up,
        aaguid: info.aaguid,
        created_at: Utc::now().to_rfc3339(),
        last_used_at: None,
    });
    state.store.save_user(&user).await?;

    tracing::info!(username = %username, "registered new credential");

    Ok(VerificationResult::registered(summary))
}

fn device_type(info: &RegistrationInfo) -> DeviceType {
    if info.backup_eligible {
        DeviceType::MultiDevice
    } else {
        DeviceType::SingleDevice
    }
}

fn summarize(info: &RegistrationInfo) -> RegistrationSummary {
    RegistrationSummary {
        credential_id: BASE64_URL_SAFE_NO_PAD.encode(&info.credential_id),
        device_type: device_type(info),
        backed_up: info.backed_up,
        aaguid: info.aaguid.clone(),
        attestation_format: info.attestation_format.clone(),
        user_verified: info.user_verified,
    }
}
