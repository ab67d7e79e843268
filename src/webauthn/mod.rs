//! # WebAuthn Protocol Module
//!
//! The challenge-response protocol core: ceremony options building and
//! verification for both registration and authentication, plus the
//! process-wide user-verification policy.
//!
//! ## Ceremony Flow
//!
//! ### Registration (creating a passkey)
//! 1. Client requests options → `registration::start_registration()`
//! 2. Server mints a challenge, records it in the ledger, sends options
//! 3. Client creates a credential with its authenticator
//! 4. Client sends the attestation back → `registration::finish_registration()`
//! 5. Server pops the challenge, verifies, stores the public key
//!
//! ### Authentication (logging in)
//! 1. Client requests options → `authentication::start_authentication()`
//! 2. Server mints a challenge and lists the user's credential ids
//! 3. Client signs the challenge with its authenticator
//! 4. Client sends the assertion back → `authentication::finish_authentication()`
//! 5. Server pops the challenge, verifies the signature with the stored
//!    public key, and advances the signature counter
//!
//! A popped challenge is gone regardless of verification outcome, so a
//! failed attempt can never be replayed. Every step takes the username's
//! lock so two concurrent ceremonies for one account cannot interleave on
//! the challenge slot.

pub mod authentication;
pub mod policy;
pub mod registration;
pub mod types;

use rand::RngCore;

/// Challenge size in bytes; the protocol requires at least 16
pub(crate) const CHALLENGE_LEN: usize = 32;

/// Mint a fresh random challenge
pub(crate) fn mint_challenge() -> Vec<u8> {
    let mut challenge = vec![0u8; CHALLENGE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut challenge);
    challenge
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenges_are_fresh_per_call() {
        let a = mint_challenge();
        let b = mint_challenge();
        assert_eq!(a.len(), CHALLENGE_LEN);
        assert_ne!(a, b);
    }
}
