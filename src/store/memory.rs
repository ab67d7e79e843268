//! In-memory storage backend
//!
//! Users, credentials and challenges live in process-wide concurrent maps
//! and are lost on restart. Challenge entries carry their creation instant;
//! a pop that finds an entry older than the TTL reports it as absent, which
//! is the same outcome a persistent backend reaches via its `expires_at`
//! column.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::models::User;
use super::{Store, StoreError, CHALLENGE_TTL_SECS};

struct ChallengeEntry {
    challenge: Vec<u8>,
    issued_at: Instant,
}

impl ChallengeEntry {
    fn is_fresh(&self) -> bool {
        self.issued_at.elapsed() < Duration::from_secs(CHALLENGE_TTL_SECS)
    }
}

/// In-process store for development and tests
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    challenges: DashMap<String, ChallengeEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(username).map(|entry| entry.value().clone()))
    }

    async fn upsert_user(&self, username: &str, display_name: &str) -> Result<User, StoreError> {
        let entry = self
            .users
            .entry(username.to_string())
            .or_insert_with(|| User::new(username.to_string(), display_name.to_string()));
        Ok(entry.value().clone())
    }

    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        self.users.insert(user.username.clone(), user.clone());
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn set_challenge(&self, username: &str, challenge: &[u8]) -> Result<(), StoreError> {
        self.challenges.insert(
            username.to_string(),
            ChallengeEntry {
                challenge: challenge.to_vec(),
                issued_at: Instant::now(),
            },
        );
        Ok(())
    }

    async fn pop_challenge(&self, username: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match self.challenges.remove(username) {
            Some((_, entry)) if entry.is_fresh() => Ok(Some(entry.challenge)),
            _ => Ok(None),
        }
    }

    async fn expire_challenges(&self) -> Result<u64, StoreError> {
        let before = self.challenges.len();
        self.challenges.retain(|_, entry| entry.is_fresh());
        Ok(before.saturating_sub(self.challenges.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pop_challenge_is_single_use() {
        let store = MemoryStore::new();
        store.set_challenge("alice", b"challenge-1").await.unwrap();

        assert_eq!(
            store.pop_challenge("alice").await.unwrap(),
            Some(b"challenge-1".to_vec())
        );
        assert_eq!(store.pop_challenge("alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_challenge_replaces_previous() {
        let store = MemoryStore::new();
        store.set_challenge("alice", b"old").await.unwrap();
        store.set_challenge("alice", b"new").await.unwrap();

        assert_eq!(
            store.pop_challenge("alice").await.unwrap(),
            Some(b"new".to_vec())
        );
        assert_eq!(store.pop_challenge("alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_challenges_are_per_username() {
        let store = MemoryStore::new();
        store.set_challenge("alice", b"a").await.unwrap();
        store.set_challenge("bob", b"b").await.unwrap();

        assert_eq!(
            store.pop_challenge("bob").await.unwrap(),
            Some(b"b".to_vec())
        );
        assert_eq!(
            store.pop_challenge("alice").await.unwrap(),
            Some(b"a".to_vec())
        );
    }

    #[tokio::test]
    async fn test_upsert_user_is_idempotent() {
        let store = MemoryStore::new();
        let first = store.upsert_user("alice", "Alice").await.unwrap();
        let second = store.upsert_user("alice", "Someone Else").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.display_name, "Alice");
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_user_replaces_record() {
        let store = MemoryStore::new();
        let mut user = store.upsert_user("alice", "Alice").await.unwrap();
        user.display_name = "Alice Smith".to_string();
        store.save_user(&user).await.unwrap();

        let loaded = store.get_user("alice").await.unwrap().unwrap();
        assert_eq!(loaded.display_name, "Alice Smith");
    }
}
