//! User repository.

use super::user::User;
use super::DbPool;
use crate::Result;

/// Repository for user queries.
pub struct UserRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let result = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password, created_at, last_login
             FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(result)
    }

    /// Get a user by username (case-insensitive).
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let result = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password, created_at, last_login
             FROM users WHERE username = ? COLLATE NOCASE",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(result)
    }

    /// Check if a username exists (case-insensitive).
    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ? COLLATE NOCASE)",
        )
        .bind(username)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Check if an email is already registered (case-insensitive).
    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ? COLLATE NOCASE)")
                .bind(email)
                .fetch_one(self.pool)
                .await?;

        Ok(exists)
    }

    /// Update the last login timestamp for a user.
    pub async fn update_last_login(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = datetime('now') WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Delete a user. Dependent rows go with it through `ON DELETE CASCADE`.
    ///
    /// Returns true if a user was deleted.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count all users.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn insert_user(db: &Database, username: &str, email: &str) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO users (username, email, password) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(username)
        .bind(email)
        .bind("$argon2id$hash")
        .fetch_one(db.pool())
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_by_id_and_username() {
        let db = Database::open_in_memory().await.unwrap();
        let id = insert_user(&db, "alice", "alice@example.com").await;
        let repo = UserRepository::new(db.pool());

        let user = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "alice@example.com");
        assert!(user.last_login.is_none());

        let by_name = repo.get_by_username("ALICE").await.unwrap().unwrap();
        assert_eq!(by_name.id, id);

        assert!(repo.get_by_id(999).await.unwrap().is_none());
        assert!(repo.get_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exists_checks() {
        let db = Database::open_in_memory().await.unwrap();
        insert_user(&db, "alice", "alice@example.com").await;
        let repo = UserRepository::new(db.pool());

        assert!(repo.username_exists("alice").await.unwrap());
        assert!(repo.username_exists("Alice").await.unwrap());
        assert!(!repo.username_exists("bob").await.unwrap());

        assert!(repo.email_exists("ALICE@example.com").await.unwrap());
        assert!(!repo.email_exists("bob@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_last_login() {
        let db = Database::open_in_memory().await.unwrap();
        let id = insert_user(&db, "alice", "alice@example.com").await;
        let repo = UserRepository::new(db.pool());

        repo.update_last_login(id).await.unwrap();

        let user = repo.get_by_id(id).await.unwrap().unwrap();
        assert!(user.last_login.is_some());
    }

    #[tokio::test]
    async fn test_delete_and_count() {
        let db = Database::open_in_memory().await.unwrap();
        let id = insert_user(&db, "alice", "alice@example.com").await;
        insert_user(&db, "bob", "bob@example.com").await;
        let repo = UserRepository::new(db.pool());

        assert_eq!(repo.count().await.unwrap(), 2);
        assert!(repo.delete(id).await.unwrap());
        assert!(!repo.delete(id).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
