//! API key issuance, persistence and verification.
//! Keys are `ong-<id>_<secret>`; only the Argon2id hash of `<secret>` is
//! ever persisted, following the same `hash_password`/`verify_password`
//! shape as the pack's `moltis-gateway::auth::CredentialStore`.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use rand::RngCore;
use sqlx::SqlitePool;

use ongarde_core::Sid;

const KEY_PREFIX: &str = "ong-";

#[derive(Clone, Debug, serde::Serialize)]
pub struct ApiKeyEntry {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

pub struct KeyStore {
    pool: SqlitePool,
}

impl KeyStore {
    pub fn new(pool: SqlitePool) -> Self {
        KeyStore { pool }
    }

    /// True when no key has ever been issued, which gates the unauthenticated
    /// bootstrap create call — the store being empty is the only condition
    /// checked, nothing stricter.
    pub async fn is_empty(&self) -> anyhow::Result<bool> {
        let row: (i64,) = sqlx::query_as("SELECT count(*) FROM keys").fetch_one(&self.pool).await?;
        Ok(row.0 == 0)
    }

    /// Issues a new key, returning the plaintext exactly once. Nothing else
    /// in the system can reconstruct it afterward.
    pub async fn create(&self, name: &str) -> anyhow::Result<(ApiKeyEntry, String)> {
        let id = Sid::new().to_string();
        let secret = generate_secret();
        let hash = hash_secret(&secret)?;
        let now = Utc::now();

        sqlx::query("INSERT INTO keys (id, name, secret_hash, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(name)
            .bind(&hash)
            .bind(now.to_rfc3339())
            .execute(&self.pool)
            .await?;

        let entry = ApiKeyEntry { id: id.clone(), name: name.to_string(), created_at: now, last_used_at: None, revoked_at: None };
        let plaintext = format!("{KEY_PREFIX}{id}_{secret}");
        Ok((entry, plaintext))
    }

    pub async fn list(&self) -> anyhow::Result<Vec<ApiKeyEntry>> {
        let rows: Vec<(String, String, String, Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT id, name, created_at, last_used_at, revoked_at FROM keys ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_entry).collect())
    }

    pub async fn revoke(&self, id: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE keys SET revoked_at = ? WHERE id = ? AND revoked_at IS NULL")
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Verifies a presented `ong-<id>_<secret>` key. Looks up by `id`,
    /// confirms non-revoked, and verifies `secret` against the stored hash
    /// in constant time via `argon2::Argon2::verify_password`.
    pub async fn verify(&self, presented: &str) -> anyhow::Result<bool> {
        let Some((id, secret)) = split_key(presented) else {
            return Ok(false);
        };
        let row: Option<(String, Option<String>)> =
            sqlx::query_as("SELECT secret_hash, revoked_at FROM keys WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        let Some((hash, revoked_at)) = row else {
            return Ok(false);
        };
        if revoked_at.is_some() {
            return Ok(false);
        }
        if !verify_secret(secret, &hash) {
            return Ok(false);
        }
        sqlx::query("UPDATE keys SET last_used_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }
}

fn row_to_entry(row: (String, String, String, Option<String>, Option<String>)) -> ApiKeyEntry {
    let (id, name, created_at, last_used_at, revoked_at) = row;
    ApiKeyEntry {
        id,
        name,
        created_at: DateTime::parse_from_rfc3339(&created_at).map(|d| d.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now()),
        last_used_at: last_used_at.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|d| d.with_timezone(&Utc)),
        revoked_at: revoked_at.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|d| d.with_timezone(&Utc)),
    }
}

/// Splits `ong-<id>_<secret>` at the first `_` after the `ong-` prefix.
fn split_key(presented: &str) -> Option<(&str, &str)> {
    let rest = presented.strip_prefix(KEY_PREFIX)?;
    rest.split_once('_')
}

/// The `id` half of a presented key, for audit/logging purposes where the
/// secret itself must never be retained.
pub fn key_id(presented: &str) -> Option<&str> {
    split_key(presented).map(|(id, _)| id)
}

fn generate_secret() -> String {
    let mut bytes = [0u8; 20]; // 160 bits, well above the 128-bit floor
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn hash_secret(secret: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash api key secret: {e}"))?;
    Ok(hash.to_string())
}

fn verify_secret(secret: &str, hash_str: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash_str) else {
        return false;
    };
    Argon2::default().verify_password(secret.as_bytes(), &parsed).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn store() -> (tempfile::TempDir, KeyStore) {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::open(&dir.path().join("audit.db")).await.unwrap();
        (dir, KeyStore::new(pool))
    }

    #[test]
    fn splits_key_at_first_underscore() {
        let (id, secret) = split_key("ong-01ABCXYZ_deadbeef").unwrap();
        assert_eq!(id, "01ABCXYZ");
        assert_eq!(secret, "deadbeef");
    }

    #[test]
    fn rejects_key_without_prefix() {
        assert!(split_key("sk-not-ongarde").is_none());
    }

    #[tokio::test]
    async fn create_then_verify_round_trips() {
        let (_dir, store) = store().await;
        assert!(store.is_empty().await.unwrap());
        let (_entry, plaintext) = store.create("test key").await.unwrap();
        assert!(!store.is_empty().await.unwrap());
        assert!(store.verify(&plaintext).await.unwrap());
    }

    #[tokio::test]
    async fn revoked_key_fails_verification() {
        let (_dir, store) = store().await;
        let (entry, plaintext) = store.create("revoke me").await.unwrap();
        store.revoke(&entry.id).await.unwrap();
        assert!(!store.verify(&plaintext).await.unwrap());
    }

    #[tokio::test]
    async fn wrong_secret_fails_verification() {
        let (_dir, store) = store().await;
        let (entry, _) = store.create("test key").await.unwrap();
        assert!(!store.verify(&format!("ong-{}_wrongsecret", entry.id)).await.unwrap());
    }
}
