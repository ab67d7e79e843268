//! End-to-end ceremony tests driven by a simulated authenticator.
//!
//! The soft key below holds a real P-256 keypair and produces genuine
//! attestation objects and signed assertions, so these tests run the full
//! protocol — challenge ledger, options building, verification engine and
//! counter handling — against the production verifier.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::prelude::*;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::SigningKey;
use rand::RngCore;
use serde_cbor::Value;
use sha2::{Digest, Sha256};

use passkey_gate::error::AppError;
use passkey_gate::state::{AppState, RelyingParty};
use passkey_gate::store::{MemoryStore, Store};
use passkey_gate::verifier::WebauthnVerifier;
use passkey_gate::webauthn::authentication::{finish_authentication, start_authentication};
use passkey_gate::webauthn::policy::{PolicyHandle, UvMode};
use passkey_gate::webauthn::registration::{finish_registration, start_registration};
use passkey_gate::webauthn::types::{
    AssertionPayload, AttestationPayload, AuthenticationOptions, AuthenticationResponse,
    RegistrationOptions, RegistrationResponse, VerificationResult,
};

const RP_ID: &str = "localhost";
const ORIGIN: &str = "http://localhost:8080";

const FLAG_UP: u8 = 0b0000_0001;
const FLAG_UV: u8 = 0b0000_0100;
const FLAG_AT: u8 = 0b0100_0000;

fn test_state(mode: UvMode) -> AppState {
    AppState::with_parts(
        Arc::new(MemoryStore::new()),
        Arc::new(WebauthnVerifier::new()),
        RelyingParty {
            id: RP_ID.to_string(),
            name: "Passkey Gate".to_string(),
            origin: ORIGIN.to_string(),
            attestation: "none".to_string(),
        },
        PolicyHandle::new(mode, false),
    )
}

/// A software stand-in for a hardware security key
struct SoftKey {
    signing: SigningKey,
    credential_id: Vec<u8>,
}

impl SoftKey {
    fn new() -> Self {
        let mut credential_id = vec![0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut credential_id);
        Self {
            signing: SigningKey::random(&mut rand::rngs::OsRng),
            credential_id,
        }
    }

    fn encoded_id(&self) -> String {
        BASE64_URL_SAFE_NO_PAD.encode(&self.credential_id)
    }

    fn cose_public_key(&self) -> Vec<u8> {
        let point = self.signing.verifying_key().to_encoded_point(false);
        let mut map = BTreeMap::new();
        map.insert(Value::Integer(1), Value::Integer(2)); // kty: EC2
        map.insert(Value::Integer(3), Value::Integer(-7)); // alg: ES256
        map.insert(Value::Integer(-1), Value::Integer(1)); // crv: P-256
        map.insert(
            Value::Integer(-2),
            Value::Bytes(point.x().unwrap().to_vec()),
        );
        map.insert(
            Value::Integer(-3),
            Value::Bytes(point.y().unwrap().to_vec()),
        );
        serde_cbor::to_vec(&Value::Map(map)).unwrap()
    }

    fn client_data(&self, ty: &str, challenge_b64: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "type": ty,
            "challenge": challenge_b64,
            "origin": ORIGIN,
            "crossOrigin": false,
        }))
        .unwrap()
    }

    /// Produce a registration (attestation) response for the given options
    fn attest(&self, options: &RegistrationOptions, user_verified: bool) -> RegistrationResponse {
        let client_data = self.client_data("webauthn.create", &options.challenge);

        let mut auth_data = Sha256::digest(options.rp.id.as_bytes()).to_vec();
        let mut flags = FLAG_UP | FLAG_AT;
        if user_verified {
            flags |= FLAG_UV;
        }
        auth_data.push(flags);
        auth_data.extend_from_slice(&0u32.to_be_bytes());
        auth_data.extend_from_slice(&[0u8; 16]); // aaguid
        auth_data.extend_from_slice(&(self.credential_id.len() as u16).to_be_bytes());
        auth_data.extend_from_slice(&self.credential_id);
        auth_data.extend_from_slice(&self.cose_public_key());

        let mut map = BTreeMap::new();
        map.insert(
            Value::Text("fmt".to_string()),
            Value::Text("none".to_string()),
        );
        map.insert(
            Value::Text("attStmt".to_string()),
            Value::Map(BTreeMap::new()),
        );
        map.insert(
            Value::Text("authData".to_string()),
            Value::Bytes(auth_data),
        );
        let attestation_object = serde_cbor::to_vec(&Value::Map(map)).unwrap();

        RegistrationResponse {
            id: self.encoded_id(),
            raw_id: self.encoded_id(),
            ty: "public-key".to_string(),
            response: AttestationPayload {
                client_data_json: BASE64_URL_SAFE_NO_PAD.encode(&client_data),
                attestation_object: BASE64_URL_SAFE_NO_PAD.encode(&attestation_object),
                transports: vec!["usb".to_string()],
            },
        }
    }

    /// Produce a signed assertion reporting the given counter
    fn assert_with(
        &self,
        options: &AuthenticationOptions,
        counter: u32,
        user_verified: bool,
    ) -> AuthenticationResponse {
        let client_data = self.client_data("webauthn.get", &options.challenge);

        let mut auth_data = Sha256::digest(options.rp_id.as_bytes()).to_vec();
        let mut flags = FLAG_UP;
        if user_verified {
            flags |= FLAG_UV;
        }
        auth_data.push(flags);
        auth_data.extend_from_slice(&counter.to_be_bytes());

        let mut message = auth_data.clone();
        message.extend_from_slice(&Sha256::digest(&client_data));
        let signature: p256::ecdsa::Signature = self.signing.sign(&message);

        AuthenticationResponse {
            id: self.encoded_id(),
            raw_id: self.encoded_id(),
            ty: "public-key".to_string(),
            response: AssertionPayload {
                client_data_json: BASE64_URL_SAFE_NO_PAD.encode(&client_data),
                authenticator_data: BASE64_URL_SAFE_NO_PAD.encode(&auth_data),
                signature: BASE64_URL_SAFE_NO_PAD.encode(signature.to_der().as_bytes()),
                user_handle: None,
            },
        }
    }
}

async fn register(state: &AppState, key: &SoftKey, username: &str) -> VerificationResult {
    let options = start_registration(state, username, Some("Test User"))
        .await
        .unwrap();
    finish_registration(state, username, &key.attest(&options, true))
        .await
        .unwrap()
}

async fn authenticate(
    state: &AppState,
    key: &SoftKey,
    username: &str,
    counter: u32,
) -> VerificationResult {
    let options = start_authentication(state, username).await.unwrap();
    finish_authentication(state, username, &key.assert_with(&options, counter, true))
        .await
        .unwrap()
}

#[tokio::test]
async fn registration_round_trip_stores_credential() {
    let state = test_state(UvMode::Preferred);
    let key = SoftKey::new();

    let result = register(&state, &key, "alice").await;
    assert!(result.verified);

    let info = result.registration_info.unwrap();
    assert_eq!(info.credential_id, key.encoded_id());

    let user = state.store.get_user("alice").await.unwrap().unwrap();
    assert_eq!(user.credentials.len(), 1);
    assert_eq!(user.credentials[0].credential_id, key.credential_id);
    assert_eq!(user.credentials[0].counter, 0);
    assert_eq!(user.credentials[0].transports, vec!["usb".to_string()]);
}

#[tokio::test]
async fn reregistering_same_credential_is_idempotent() {
    let state = test_state(UvMode::Preferred);
    let key = SoftKey::new();

    assert!(register(&state, &key, "alice").await.verified);
    assert!(register(&state, &key, "alice").await.verified);

    let user = state.store.get_user("alice").await.unwrap().unwrap();
    assert_eq!(user.credentials.len(), 1);
}

#[tokio::test]
async fn exclude_list_names_registered_credentials() {
    let state = test_state(UvMode::Preferred);
    let key = SoftKey::new();
    assert!(register(&state, &key, "alice").await.verified);

    let options = start_registration(&state, "alice", None).await.unwrap();
    let excluded: Vec<&str> = options
        .exclude_credentials
        .iter()
        .map(|c| c.id.as_str())
        .collect();
    assert_eq!(excluded, vec![key.encoded_id().as_str()]);
}

#[tokio::test]
async fn counter_lifecycle_with_replay_detection() {
    let state = test_state(UvMode::Preferred);
    let key = SoftKey::new();

    // Register with the authenticator reporting counter 0
    assert!(register(&state, &key, "alice").await.verified);

    // Counter-less authenticator: 0 after 0 is tolerated
    let result = authenticate(&state, &key, "alice", 0).await;
    assert!(result.verified);
    let user = state.store.get_user("alice").await.unwrap().unwrap();
    assert_eq!(user.credentials[0].counter, 0);

    // Counter advances to 5
    let result = authenticate(&state, &key, "alice", 5).await;
    assert!(result.verified);
    assert_eq!(result.authentication_info.unwrap().new_counter, 5);
    let user = state.store.get_user("alice").await.unwrap().unwrap();
    assert_eq!(user.credentials[0].counter, 5);
    assert!(user.credentials[0].last_used_at.is_some());

    // Replay of counter 5 must fail and leave the stored counter alone
    let result = authenticate(&state, &key, "alice", 5).await;
    assert!(!result.verified);
    let user = state.store.get_user("alice").await.unwrap().unwrap();
    assert_eq!(user.credentials[0].counter, 5);

    // A regressed counter fails too
    let result = authenticate(&state, &key, "alice", 3).await;
    assert!(!result.verified);
}

#[tokio::test]
async fn unissued_challenge_is_rejected_before_verification() {
    let state = test_state(UvMode::Preferred);
    let key = SoftKey::new();

    // Build an otherwise-valid response against fabricated options: no
    // challenge was ever issued for this username
    let options = RegistrationOptions {
        challenge: BASE64_URL_SAFE_NO_PAD.encode(b"never-issued-challenge-bytes"),
        ..start_registration(&state, "bystander", None).await.unwrap()
    };
    let response = key.attest(&options, true);

    let err = finish_registration(&state, "alice", &response)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ChallengeExpired));
}

#[tokio::test]
async fn challenge_is_consumed_even_when_verification_fails() {
    let state = test_state(UvMode::Preferred);
    let key = SoftKey::new();
    assert!(register(&state, &key, "alice").await.verified);

    let options = start_authentication(&state, "alice").await.unwrap();

    // First attempt answers the wrong challenge: verified=false
    let mut wrong = options.clone();
    wrong.challenge = BASE64_URL_SAFE_NO_PAD.encode(b"something-else-entirely");
    let result = finish_authentication(&state, "alice", &key.assert_with(&wrong, 1, true))
        .await
        .unwrap();
    assert!(!result.verified);

    // The pop was final: answering the real challenge now fails shape checks
    let err = finish_authentication(&state, "alice", &key.assert_with(&options, 1, true))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ChallengeExpired));
}

#[tokio::test]
async fn authentication_options_are_opaque_for_unknown_and_keyless_users() {
    let state = test_state(UvMode::Preferred);

    let unknown = start_authentication(&state, "ghost").await.unwrap_err();

    // A user that exists but holds no credentials gets the same answer
    state.store.upsert_user("keyless", "Keyless").await.unwrap();
    let keyless = start_authentication(&state, "keyless").await.unwrap_err();

    match (unknown, keyless) {
        (AppError::NotFound(a), AppError::NotFound(b)) => assert_eq!(a, b),
        other => panic!("expected matching NotFound errors, got {:?}", other),
    }
}

#[tokio::test]
async fn allow_list_contains_every_registered_credential() {
    let state = test_state(UvMode::Preferred);
    let first = SoftKey::new();
    let second = SoftKey::new();

    assert!(register(&state, &first, "alice").await.verified);
    assert!(register(&state, &second, "alice").await.verified);

    let options = start_authentication(&state, "alice").await.unwrap();
    let allowed: Vec<&str> = options
        .allow_credentials
        .iter()
        .map(|c| c.id.as_str())
        .collect();
    assert_eq!(allowed.len(), 2);
    assert!(allowed.contains(&first.encoded_id().as_str()));
    assert!(allowed.contains(&second.encoded_id().as_str()));
}

#[tokio::test]
async fn unknown_credential_id_is_rejected_before_signature_checks() {
    let state = test_state(UvMode::Preferred);
    let registered = SoftKey::new();
    let stranger = SoftKey::new();

    assert!(register(&state, &registered, "alice").await.verified);

    let options = start_authentication(&state, "alice").await.unwrap();
    let err = finish_authentication(&state, "alice", &stranger.assert_with(&options, 1, true))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CredentialNotFound));
}

#[tokio::test]
async fn signature_from_wrong_key_fails_verification() {
    let state = test_state(UvMode::Preferred);
    let registered = SoftKey::new();
    assert!(register(&state, &registered, "alice").await.verified);

    // Claims the registered credential id but signs with a different key
    let imposter = SoftKey {
        signing: SigningKey::random(&mut rand::rngs::OsRng),
        credential_id: registered.credential_id.clone(),
    };

    let options = start_authentication(&state, "alice").await.unwrap();
    let result = finish_authentication(&state, "alice", &imposter.assert_with(&options, 1, true))
        .await
        .unwrap();
    assert!(!result.verified);
}

#[tokio::test]
async fn pin_required_mode_demands_verification_flag() {
    let state = test_state(UvMode::PinRequired);
    let key = SoftKey::new();

    // Without the UV flag the ceremony fails as a normal negative outcome
    let options = start_registration(&state, "alice", None).await.unwrap();
    let result = finish_registration(&state, "alice", &key.attest(&options, false))
        .await
        .unwrap();
    assert!(!result.verified);

    // With the flag set it succeeds
    let options = start_registration(&state, "alice", None).await.unwrap();
    let result = finish_registration(&state, "alice", &key.attest(&options, true))
        .await
        .unwrap();
    assert!(result.verified);

    // Assertions are held to the same requirement
    let options = start_authentication(&state, "alice").await.unwrap();
    let result = finish_authentication(&state, "alice", &key.assert_with(&options, 1, false))
        .await
        .unwrap();
    assert!(!result.verified);
}

#[tokio::test]
async fn touch_only_mode_accepts_unverified_responses() {
    let state = test_state(UvMode::TouchOnly);
    let key = SoftKey::new();

    let options = start_registration(&state, "alice", None).await.unwrap();
    assert_eq!(options.authenticator_selection.user_verification, "discouraged");

    let result = finish_registration(&state, "alice", &key.attest(&options, false))
        .await
        .unwrap();
    assert!(result.verified);

    let options = start_authentication(&state, "alice").await.unwrap();
    let result = finish_authentication(&state, "alice", &key.assert_with(&options, 1, false))
        .await
        .unwrap();
    assert!(result.verified);
}

#[tokio::test]
async fn usernames_are_case_normalized_across_ceremonies() {
    let state = test_state(UvMode::Preferred);
    let key = SoftKey::new();

    let options = start_registration(&state, "  Alice ", None).await.unwrap();
    assert_eq!(options.user.name, "alice");
    let result = finish_registration(&state, "ALICE", &key.attest(&options, true))
        .await
        .unwrap();
    assert!(result.verified);

    assert!(authenticate(&state, &key, "Alice", 1).await.verified);
}

#[tokio::test]
async fn invalid_username_never_reaches_the_ledger() {
    let state = test_state(UvMode::Preferred);

    let err = start_registration(&state, "not a valid name!", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidUsername(_)));
    assert!(state.store.list_users().await.unwrap().is_empty());
}
