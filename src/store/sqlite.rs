//! SQLite storage backend
//!
//! Persists users, credentials and challenges in SQLite via `sqlx`, with
//! the schema embedded as migrations. `save_user` runs in a transaction so
//! a user record is replaced completely or not at all; `pop_challenge`
//! reads and deletes in one transaction to keep challenges single-use under
//! concurrent requests.

use async_trait::async_trait;
use base64::prelude::*;
use chrono::Utc;
use sqlx::sqlite::SqlitePool;

use super::models::{CredentialEntry, DeviceType, User};
use super::{Store, StoreError, CHALLENGE_TTL_SECS};

/// SQLite-backed store
pub struct SqliteStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    display_name: String,
    created_at: String,
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: String,
    public_key: Vec<u8>,
    counter: i64,
    transports: Option<String>,
    device_type: String,
    backed_up: bool,
    aaguid: String,
    created_at: String,
    last_used_at: Option<String>,
}

impl CredentialRow {
    fn into_entry(self) -> Result<CredentialEntry, StoreError> {
        let credential_id = BASE64_URL_SAFE_NO_PAD
            .decode(&self.id)
            .map_err(|_| StoreError::Corrupt(format!("credential id '{}'", self.id)))?;
        let device_type = DeviceType::parse(&self.device_type)
            .ok_or_else(|| StoreError::Corrupt(format!("device type '{}'", self.device_type)))?;
        let transports = match self.transports {
            Some(json) => serde_json::from_str(&json)
                .map_err(|_| StoreError::Corrupt("transports list".to_string()))?,
            None => Vec::new(),
        };

        Ok(CredentialEntry {
            credential_id,
            public_key: self.public_key,
            counter: self.counter as u32,
            transports,
            device_type,
            backed_up: self.backed_up,
            aaguid: self.aaguid,
            created_at: self.created_at,
            last_used_at: self.last_used_at,
        })
    }
}

impl SqliteStore {
    /// Connect to the database and run pending migrations
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePool::connect(database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// The underlying connection pool, shared with the session store
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load_credentials(&self, user_id: &str) -> Result<Vec<CredentialEntry>, StoreError> {
        let rows = sqlx::query_as::<_, CredentialRow>(
            "SELECT id, public_key, counter, transports, device_type, backed_up, aaguid,
                    created_at, last_used_at
             FROM credentials WHERE user_id = ? ORDER BY created_at, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CredentialRow::into_entry).collect()
    }

    fn user_from_row(row: UserRow, credentials: Vec<CredentialEntry>) -> User {
        User {
            id: row.id,
            username: row.username,
            display_name: row.display_name,
            created_at: row.created_at,
            credentials,
        }
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn get_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, display_name, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let credentials = self.load_credentials(&row.id).await?;
                Ok(Some(Self::user_from_row(row, credentials)))
            }
            None => Ok(None),
        }
    }

    async fn upsert_user(&self, username: &str, display_name: &str) -> Result<User, StoreError> {
        if let Some(user) = self.get_user(username).await? {
            return Ok(user);
        }

        let user = User::new(username.to_string(), display_name.to_string());
        sqlx::query(
            "INSERT INTO users (id, username, display_name, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(username) DO NOTHING",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(&user.created_at)
        .execute(&self.pool)
        .await?;

        // Re-read so a concurrent insert of the same username still yields
        // the single canonical record
        self.get_user(username)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("user '{}' vanished after upsert", username)))
    }

    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE users SET display_name = ? WHERE username = ?")
            .bind(&user.display_name)
            .bind(&user.username)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            sqlx::query(
                "INSERT INTO users (id, username, display_name, created_at)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&user.id)
            .bind(&user.username)
            .bind(&user.display_name)
            .bind(&user.created_at)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM credentials WHERE user_id = ?")
            .bind(&user.id)
            .execute(&mut *tx)
            .await?;

        for cred in &user.credentials {
            let transports_json = if cred.transports.is_empty() {
                None
            } else {
                Some(
                    serde_json::to_string(&cred.transports)
                        .map_err(|e| StoreError::Corrupt(e.to_string()))?,
                )
            };

            sqlx::query(
                "INSERT INTO credentials
                 (id, user_id, public_key, counter, transports, device_type, backed_up,
                  aaguid, created_at, last_used_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(BASE64_URL_SAFE_NO_PAD.encode(&cred.credential_id))
            .bind(&user.id)
            .bind(&cred.public_key)
            .bind(cred.counter as i64)
            .bind(transports_json)
            .bind(cred.device_type.as_str())
            .bind(cred.backed_up)
            .bind(&cred.aaguid)
            .bind(&cred.created_at)
            .bind(&cred.last_used_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, display_name, created_at FROM users ORDER BY username",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            let credentials = self.load_credentials(&row.id).await?;
            users.push(Self::user_from_row(row, credentials));
        }
        Ok(users)
    }

    async fn set_challenge(&self, username: &str, challenge: &[u8]) -> Result<(), StoreError> {
        let now = Utc::now();
        let expires = now + chrono::Duration::seconds(CHALLENGE_TTL_SECS as i64);

        sqlx::query(
            "INSERT INTO challenges (username, challenge, created_at, expires_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(username) DO UPDATE SET
                 challenge = excluded.challenge,
                 created_at = excluded.created_at,
                 expires_at = excluded.expires_at",
        )
        .bind(username)
        .bind(challenge)
        .bind(now.to_rfc3339())
        .bind(expires.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn pop_challenge(&self, username: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, (Vec<u8>, String)>(
            "SELECT challenge, expires_at FROM challenges WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((challenge, expires_at)) = row else {
            tx.commit().await?;
            return Ok(None);
        };

        sqlx::query("DELETE FROM challenges WHERE username = ?")
            .bind(username)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let expires_at = chrono::DateTime::parse_from_rfc3339(&expires_at)
            .map_err(|_| StoreError::Corrupt("challenge expiry timestamp".to_string()))?;
        if Utc::now() > expires_at {
            return Ok(None);
        }

        Ok(Some(challenge))
    }

    async fn expire_challenges(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM challenges WHERE expires_at < ?")
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
