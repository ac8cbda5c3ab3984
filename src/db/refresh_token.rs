//! Refresh tokens backing API sessions.

use super::DbPool;
use crate::{GraphAuthError, Result};

/// Refresh token entity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    /// Token ID.
    pub id: i64,
    /// User ID.
    pub user_id: i64,
    /// Token string.
    pub token: String,
    /// Expiration timestamp (`YYYY-MM-DD HH:MM:SS`, UTC).
    pub expires_at: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Revocation timestamp (None if not revoked).
    pub revoked_at: Option<String>,
}

/// New refresh token for creation.
pub struct NewRefreshToken {
    /// User ID.
    pub user_id: i64,
    /// Token string.
    pub token: String,
    /// Expiration timestamp.
    pub expires_at: String,
}

/// Repository for refresh token operations.
pub struct RefreshTokenRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> RefreshTokenRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new refresh token.
    pub async fn create(&self, new_token: &NewRefreshToken) -> Result<RefreshToken> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO refresh_tokens (user_id, token, expires_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(new_token.user_id)
        .bind(&new_token.token)
        .bind(&new_token.expires_at)
        .fetch_one(self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| GraphAuthError::NotFound("refresh token".into()))
    }

    /// Get a refresh token by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<RefreshToken>> {
        let token = sqlx::query_as::<_, RefreshToken>(
            "SELECT id, user_id, token, expires_at, created_at, revoked_at
             FROM refresh_tokens WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(token)
    }

    /// Get a refresh token by token string, valid or not.
    pub async fn get_by_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        let result = sqlx::query_as::<_, RefreshToken>(
            "SELECT id, user_id, token, expires_at, created_at, revoked_at
             FROM refresh_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(result)
    }

    /// Get a valid (not expired, not revoked) refresh token.
    pub async fn get_valid_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        let result = sqlx::query_as::<_, RefreshToken>(
            "SELECT id, user_id, token, expires_at, created_at, revoked_at
             FROM refresh_tokens
             WHERE token = ?
               AND revoked_at IS NULL
               AND expires_at > datetime('now')",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(result)
    }

    /// Revoke a refresh token. Returns false if it was unknown or already revoked.
    pub async fn revoke(&self, token: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = datetime('now')
             WHERE token = ? AND revoked_at IS NULL",
        )
        .bind(token)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete expired and revoked tokens.
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM refresh_tokens
             WHERE expires_at < datetime('now') OR revoked_at IS NOT NULL",
        )
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, UserRepository};

    async fn setup_db() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        sqlx::query("INSERT INTO users (username, email, password) VALUES (?, ?, ?)")
            .bind("testuser")
            .bind("test@example.com")
            .bind("hashedpassword")
            .execute(db.pool())
            .await
            .unwrap();
        db
    }

    fn token(value: &str, expires_at: &str) -> NewRefreshToken {
        NewRefreshToken {
            user_id: 1,
            token: value.to_string(),
            expires_at: expires_at.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_refresh_token() {
        let db = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());

        let created = repo
            .create(&token("test-token-123", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        assert_eq!(created.user_id, 1);
        assert_eq!(created.token, "test-token-123");
        assert!(created.revoked_at.is_none());

        let found = repo.get_by_token("test-token-123").await.unwrap();
        assert_eq!(found.map(|t| t.id), Some(created.id));
        assert!(repo.get_by_token("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_valid_token() {
        let db = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());

        repo.create(&token("valid-token", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        repo.create(&token("expired-token", "2000-01-01 00:00:00"))
            .await
            .unwrap();

        assert!(repo.get_valid_token("valid-token").await.unwrap().is_some());
        assert!(repo.get_valid_token("expired-token").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_token() {
        let db = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());

        repo.create(&token("revoke-me", "2099-12-31 23:59:59"))
            .await
            .unwrap();

        assert!(repo.revoke("revoke-me").await.unwrap());
        assert!(!repo.revoke("revoke-me").await.unwrap());
        assert!(repo.get_valid_token("revoke-me").await.unwrap().is_none());

        let exists = repo.get_by_token("revoke-me").await.unwrap().unwrap();
        assert!(exists.revoked_at.is_some());
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let db = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());

        repo.create(&token("old-expired", "2000-01-01 00:00:00"))
            .await
            .unwrap();
        repo.create(&token("revoked", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        repo.create(&token("still-valid", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        repo.revoke("revoked").await.unwrap();

        assert_eq!(repo.cleanup_expired().await.unwrap(), 2);
        assert!(repo.get_by_token("old-expired").await.unwrap().is_none());
        assert!(repo.get_by_token("revoked").await.unwrap().is_none());
        assert!(repo.get_by_token("still-valid").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_tokens_removed_with_user() {
        let db = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());
        repo.create(&token("owned", "2099-12-31 23:59:59"))
            .await
            .unwrap();

        UserRepository::new(db.pool()).delete(1).await.unwrap();

        assert!(repo.get_by_token("owned").await.unwrap().is_none());
    }
}
