//! Passkey authentication logic
//!
//! Two-step assertion ceremony against credentials stored at registration.
//! The allow-list, challenge binding and counter handling live here; the
//! signature itself is checked by the injected verifier.

use base64::prelude::*;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::store::Store;
use crate::validation;
use crate::verifier::{Expected, VerifyError};
use crate::webauthn::types::*;

/// One opaque message for "unknown user" and "user without credentials", so
/// the response shape does not reveal which usernames exist
const NO_CREDENTIALS: &str = "No passkeys registered for this username";

/// Start the authentication ceremony
///
/// Mints a fresh challenge, records it in the ledger, and returns it with
/// an allow-list of the user's credential ids: the client must prove
/// possession of exactly one of these.
pub async fn start_authentication(
    state: &AppState,
    username: &str,
) -> AppResult<AuthenticationOptions> {
    let username = validation::normalize_username(username)?;

    let lock = state.locks.get(&username);
    let _guard = lock.lock().await;

    let user = match state.store.get_user(&username).await? {
        Some(user) if !user.credentials.is_empty() => user,
        // Unknown user and credential-less user get the same answer
        _ => return Err(AppError::NotFound(NO_CREDENTIALS.to_string())),
    };

    let challenge = super::mint_challenge();
    state.store.set_challenge(&username, &challenge).await?;

    tracing::debug!(username = %username, "issued authentication challenge");

    Ok(AuthenticationOptions {
        challenge: BASE64_URL_SAFE_NO_PAD.encode(&challenge),
        timeout: CEREMONY_TIMEOUT_MS,
        rp_id: state.rp.id.clone(),
        user_verification: state.policy.mode().requirement().to_string(),
        allow_credentials: user
            .credentials
            .iter()
            .map(CredentialDescriptor::from_credential)
            .collect(),
    })
}

/// Finish the authentication ceremony
///
/// Pops the expected challenge (absent → `ChallengeExpired`), locates the
/// claimed credential (absent → `CredentialNotFound`, before any signature
/// work, since the verifier needs the stored public key), then verifies the
/// assertion. On success the reported counter must be strictly greater than
/// the stored one, or both must be zero for authenticators that never
/// implement counters; anything else is treated as a possible clone and
/// yields `verified: false`. The new counter and last-used timestamp are
/// persisted on success.
pub async fn finish_authentication(
    state: &AppState,
    username: &str,
    response: &AuthenticationResponse,
) -> AppResult<VerificationResult> {
    let username = validation::normalize_username(username)?;

    let lock = state.locks.get(&username);
    let _guard = lock.lock().await;

    let challenge = state
        .store
        .pop_challenge(&username)
        .await?
        .ok_or(AppError::ChallengeExpired)?;

    let mut user = match state.store.get_user(&username).await? {
        Some(user) if !user.credentials.is_empty() => user,
        _ => return Err(AppError::NotFound(NO_CREDENTIALS.to_string())),
    };

    let credential_id = BASE64_URL_SAFE_NO_PAD
        .decode(&response.raw_id)
        .map_err(|_| AppError::BadRequest("rawId is not valid base64url".to_string()))?;

    let index = user
        .credentials
        .iter()
        .position(|c| c.credential_id == credential_id)
        .ok_or(AppError::CredentialNotFound)?;

    let expected = Expected {
        challenge,
        origin: state.rp.origin.clone(),
        rp_id: state.rp.id.clone(),
        require_user_verification: state.policy.mode().requires_verification(),
    };

    let info = match state
        .verifier
        .verify_authentication(response, &expected, &user.credentials[index])
    {
        Ok(info) => info,
        Err(VerifyError::Malformed(reason)) => return Err(AppError::BadRequest(reason)),
        Err(VerifyError::Check(check)) => {
            tracing::info!(username = %username, %check, "authentication verification failed");
            return Ok(VerificationResult::failed());
        }
    };

    let stored_counter = user.credentials[index].counter;
    if !counter_is_acceptable(stored_counter, info.new_counter) {
        tracing::warn!(
            username = %username,
            stored = stored_counter,
            reported = info.new_counter,
            "signature counter did not advance; possible cloned credential"
        );
        return Ok(VerificationResult::failed());
    }

    let credential = &mut user.credentials[index];
    credential.counter = info.new_counter;
    credential.mark_used();
    state.store.save_user(&user).await?;

    tracing::info!(username = %username, counter = info.new_counter, "authentication verified");

    Ok(VerificationResult::authenticated(AuthenticationSummary {
        credential_id: response.raw_id.clone(),
        new_counter: info.new_counter,
        user_verified: info.user_verified,
    }))
}

/// Counter acceptance: strictly increasing, except that counter-less
/// authenticators report zero forever and are tolerated
fn counter_is_acceptable(stored: u32, reported: u32) -> bool {
    reported > stored || (stored == 0 && reported == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_must_advance() {
        assert!(counter_is_acceptable(0, 1));
        assert!(counter_is_acceptable(5, 6));
        assert!(counter_is_acceptable(5, 100));

        assert!(!counter_is_acceptable(5, 5));
        assert!(!counter_is_acceptable(5, 4));
        assert!(!counter_is_acceptable(1, 0));
    }

    #[test]
    fn test_zero_counter_authenticators_are_tolerated() {
        assert!(counter_is_acceptable(0, 0));
    }
}
