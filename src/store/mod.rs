//! # Storage Module
//!
//! Durable state behind the protocol: the credential store (username → user
//! record) and the challenge ledger (username → outstanding challenge).
//! Both sit behind the [`Store`] trait so the protocol core never assumes a
//! particular persistence mechanism; it only requires that operations for a
//! single username are applied atomically and in the order issued.
//!
//! Two backends are provided:
//! - [`SqliteStore`]: SQLite via `sqlx`, survives restarts
//! - [`MemoryStore`]: in-process maps, useful for development and tests
//!
//! Challenge expiry is the store's concern, not the protocol's: the core
//! only relies on pop-once semantics, while each backend additionally
//! refuses to return challenges older than [`CHALLENGE_TTL_SECS`].

pub mod locks;
pub mod memory;
pub mod models;
pub mod sqlite;

pub use locks::UserLocks;
pub use memory::MemoryStore;
pub use models::{CredentialEntry, DeviceType, User};
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use thiserror::Error;

/// Maximum age of an outstanding challenge before the store treats it as
/// gone (5 minutes)
pub const CHALLENGE_TTL_SECS: u64 = 300;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Credential store + challenge ledger contract
///
/// Implementations must make each operation atomic per username: concurrent
/// calls for different usernames must not corrupt each other. Callers
/// serialize same-username ceremonies with [`UserLocks`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch a user by (normalized) username
    async fn get_user(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Idempotent create-or-fetch: returns the existing user if present,
    /// otherwise creates one with the given display name
    async fn upsert_user(&self, username: &str, display_name: &str) -> Result<User, StoreError>;

    /// Full replace of a user record by username, all-or-nothing
    async fn save_user(&self, user: &User) -> Result<(), StoreError>;

    /// All users, ordered by username
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Record the outstanding challenge for a username, silently replacing
    /// any previous one
    async fn set_challenge(&self, username: &str, challenge: &[u8]) -> Result<(), StoreError>;

    /// Atomic read-and-delete of the outstanding challenge. Returns `None`
    /// when no challenge is outstanding or the outstanding one has aged out.
    async fn pop_challenge(&self, username: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Drop challenges older than the TTL. Returns the number removed.
    /// Backends without background-prunable state can keep the default.
    async fn expire_challenges(&self) -> Result<u64, StoreError> {
        Ok(0)
    }
}
