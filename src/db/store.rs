//! Credential store port.
//!
//! Registration and login only need a narrow view of persistence: save a user
//! together with its graphical password, look a user up by name, and a few
//! existence checks. [`CredentialStore`] captures that view so the auth
//! service can run against SQLite in production and an in-memory map in tests.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::graphical_password::{GraphicalPassword, GraphicalPasswordRepository, NewGraphicalPassword};
use super::repository::UserRepository;
use super::user::{NewUser, User};
use super::DbPool;
use crate::{GraphAuthError, Result};

/// A user with its graphical password record, if any.
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    /// The user row.
    pub user: User,
    /// The graphical password row.
    pub graphical: Option<GraphicalPassword>,
}

/// Persistence port for credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Persist a user and its graphical password atomically.
    ///
    /// A username or email collision yields [`GraphAuthError::UniqueViolation`]
    /// naming the column (`users.username` / `users.email`), and nothing is
    /// written.
    async fn save(&self, user: &NewUser, graphical: &NewGraphicalPassword) -> Result<User>;

    /// Look up a user (case-insensitive) together with its graphical password.
    async fn find_by_username(&self, username: &str) -> Result<Option<StoredCredentials>>;

    /// Look up a user by ID.
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Whether the username is taken (case-insensitive).
    async fn username_exists(&self, username: &str) -> Result<bool>;

    /// Whether the email is already registered (case-insensitive).
    async fn email_exists(&self, email: &str) -> Result<bool>;

    /// Record a successful login.
    async fn record_login(&self, user_id: i64) -> Result<()>;
}

/// SQLite-backed credential store.
#[derive(Debug, Clone)]
pub struct SqliteCredentialStore {
    pool: DbPool,
}

impl SqliteCredentialStore {
    /// Create a store over an existing pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn save(&self, user: &NewUser, graphical: &NewGraphicalPassword) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let user_id: i64 = sqlx::query_scalar(
            "INSERT INTO users (username, email, password) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO graphical_passwords (user_id, salt, hash, algorithm) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&graphical.salt)
        .bind(&graphical.hash)
        .bind(&graphical.algorithm)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        UserRepository::new(&self.pool)
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| GraphAuthError::NotFound("user".to_string()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<StoredCredentials>> {
        let Some(user) = UserRepository::new(&self.pool)
            .get_by_username(username)
            .await?
        else {
            return Ok(None);
        };

        let graphical = GraphicalPasswordRepository::new(&self.pool)
            .get_by_user_id(user.id)
            .await?;

        Ok(Some(StoredCredentials { user, graphical }))
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        UserRepository::new(&self.pool).get_by_id(id).await
    }

    async fn username_exists(&self, username: &str) -> Result<bool> {
        UserRepository::new(&self.pool)
            .username_exists(username)
            .await
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        UserRepository::new(&self.pool).email_exists(email).await
    }

    async fn record_login(&self, user_id: i64) -> Result<()> {
        UserRepository::new(&self.pool)
            .update_last_login(user_id)
            .await
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    entries: Vec<StoredCredentials>,
}

impl MemoryState {
    fn find_index(&self, username: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.user.username.eq_ignore_ascii_case(username))
    }

    fn email_taken(&self, email: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.user.email.eq_ignore_ascii_case(email))
    }
}

/// In-memory credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    state: Mutex<MemoryState>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a user and its graphical password.
    pub async fn delete_user(&self, id: i64) -> bool {
        let mut state = self.state.lock().await;
        let before = state.entries.len();
        state.entries.retain(|e| e.user.id != id);
        state.entries.len() != before
    }
}

fn now() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn save(&self, user: &NewUser, graphical: &NewGraphicalPassword) -> Result<User> {
        let mut state = self.state.lock().await;

        if state.find_index(&user.username).is_some() {
            return Err(GraphAuthError::UniqueViolation("users.username".to_string()));
        }
        if state.email_taken(&user.email) {
            return Err(GraphAuthError::UniqueViolation("users.email".to_string()));
        }

        state.next_id += 1;
        let id = state.next_id;
        let created_at = now();

        let stored = User {
            id,
            username: user.username.clone(),
            email: user.email.clone(),
            password: user.password.clone(),
            created_at: created_at.clone(),
            last_login: None,
        };
        let record = GraphicalPassword {
            id,
            user_id: id,
            salt: graphical.salt.clone(),
            hash: graphical.hash.clone(),
            algorithm: graphical.algorithm.clone(),
            created_at,
        };

        state.entries.push(StoredCredentials {
            user: stored.clone(),
            graphical: Some(record),
        });

        Ok(stored)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<StoredCredentials>> {
        let state = self.state.lock().await;
        Ok(state
            .find_index(username)
            .map(|i| state.entries[i].clone()))
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let state = self.state.lock().await;
        Ok(state
            .entries
            .iter()
            .find(|e| e.user.id == id)
            .map(|e| e.user.clone()))
    }

    async fn username_exists(&self, username: &str) -> Result<bool> {
        Ok(self.state.lock().await.find_index(username).is_some())
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self.state.lock().await.email_taken(email))
    }

    async fn record_login(&self, user_id: i64) -> Result<()> {
        let mut state = self.state.lock().await;
        match state.entries.iter_mut().find(|e| e.user.id == user_id) {
            Some(entry) => {
                entry.user.last_login = Some(now());
                Ok(())
            }
            None => Err(GraphAuthError::NotFound("user".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn new_graphical() -> NewGraphicalPassword {
        NewGraphicalPassword {
            salt: "00112233445566778899aabbccddeeff".to_string(),
            hash: "ab".repeat(32),
            algorithm: "sha256".to_string(),
        }
    }

    async fn exercise_store(store: &dyn CredentialStore) {
        let user = store
            .save(
                &NewUser::new("alice", "alice@example.com", "$argon2id$hash"),
                &new_graphical(),
            )
            .await
            .unwrap();
        assert_eq!(user.username, "alice");

        let found = store.find_by_username("ALICE").await.unwrap().unwrap();
        assert_eq!(found.user.id, user.id);
        let graphical = found.graphical.unwrap();
        assert_eq!(graphical.user_id, user.id);
        assert_eq!(graphical.salt, new_graphical().salt);
        assert_eq!(graphical.algorithm, "sha256");

        assert!(store.username_exists("Alice").await.unwrap());
        assert!(store.email_exists("alice@EXAMPLE.com").await.unwrap());
        assert!(!store.username_exists("bob").await.unwrap());
        assert!(store.find_by_username("bob").await.unwrap().is_none());

        let dup_name = store
            .save(
                &NewUser::new("Alice", "other@example.com", "x"),
                &new_graphical(),
            )
            .await;
        assert!(
            matches!(dup_name, Err(GraphAuthError::UniqueViolation(ref c)) if c == "users.username")
        );

        let dup_email = store
            .save(&NewUser::new("bob", "alice@example.com", "x"), &new_graphical())
            .await;
        assert!(
            matches!(dup_email, Err(GraphAuthError::UniqueViolation(ref c)) if c == "users.email")
        );
        assert!(!store.username_exists("bob").await.unwrap());

        store.record_login(user.id).await.unwrap();
        let reloaded = store.find_user_by_id(user.id).await.unwrap().unwrap();
        assert!(reloaded.last_login.is_some());
    }

    #[tokio::test]
    async fn test_sqlite_store() {
        let db = Database::open_in_memory().await.unwrap();
        let store = SqliteCredentialStore::new(db.pool().clone());
        exercise_store(&store).await;
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryCredentialStore::new();
        exercise_store(&store).await;
    }

    #[tokio::test]
    async fn test_sqlite_save_is_atomic() {
        let db = Database::open_in_memory().await.unwrap();
        let store = SqliteCredentialStore::new(db.pool().clone());

        // Make the second insert fail; the user row must not survive.
        sqlx::query("CREATE TRIGGER reject_graphical BEFORE INSERT ON graphical_passwords BEGIN SELECT RAISE(ABORT, 'rejected'); END")
            .execute(db.pool())
            .await
            .unwrap();

        let result = store
            .save(
                &NewUser::new("alice", "alice@example.com", "$argon2id$hash"),
                &new_graphical(),
            )
            .await;
        assert!(matches!(result, Err(GraphAuthError::Database(_))));
        assert!(!store.username_exists("alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_sqlite_cascade_delete() {
        let db = Database::open_in_memory().await.unwrap();
        let store = SqliteCredentialStore::new(db.pool().clone());
        let user = store
            .save(
                &NewUser::new("alice", "alice@example.com", "$argon2id$hash"),
                &new_graphical(),
            )
            .await
            .unwrap();

        let graphical = GraphicalPasswordRepository::new(db.pool());
        assert_eq!(graphical.count().await.unwrap(), 1);

        assert!(UserRepository::new(db.pool()).delete(user.id).await.unwrap());

        assert!(graphical.get_by_user_id(user.id).await.unwrap().is_none());
        assert_eq!(graphical.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_memory_delete_user() {
        let store = MemoryCredentialStore::new();
        let user = store
            .save(
                &NewUser::new("alice", "alice@example.com", "$argon2id$hash"),
                &new_graphical(),
            )
            .await
            .unwrap();

        assert!(store.delete_user(user.id).await);
        assert!(store.find_by_username("alice").await.unwrap().is_none());
        assert!(!store.delete_user(user.id).await);
    }
}
