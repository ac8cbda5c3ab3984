//! Graphical password records.

use std::fmt;

use super::DbPool;
use crate::auth::Enrollment;
use crate::Result;

/// Stored graphical password for a user.
#[derive(Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct GraphicalPassword {
    /// Record ID.
    pub id: i64,
    /// Owning user.
    pub user_id: i64,
    /// Hex-encoded salt.
    pub salt: String,
    /// Hex-encoded digest.
    pub hash: String,
    /// Digest algorithm name.
    pub algorithm: String,
    /// Creation timestamp.
    pub created_at: String,
}

impl fmt::Debug for GraphicalPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphicalPassword")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("algorithm", &self.algorithm)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Graphical password data to persist with a new user.
#[derive(Clone)]
pub struct NewGraphicalPassword {
    /// Hex-encoded salt.
    pub salt: String,
    /// Hex-encoded digest.
    pub hash: String,
    /// Digest algorithm name.
    pub algorithm: String,
}

impl From<&Enrollment> for NewGraphicalPassword {
    fn from(enrollment: &Enrollment) -> Self {
        Self {
            salt: enrollment.salt_hex(),
            hash: enrollment.hash_hex(),
            algorithm: enrollment.algorithm.as_str().to_string(),
        }
    }
}

impl fmt::Debug for NewGraphicalPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewGraphicalPassword")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Read access to graphical password records.
///
/// Records are written together with their user by the credential store and
/// removed only through the `ON DELETE CASCADE` on `users`.
pub struct GraphicalPasswordRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> GraphicalPasswordRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Get the graphical password of a user.
    pub async fn get_by_user_id(&self, user_id: i64) -> Result<Option<GraphicalPassword>> {
        let record = sqlx::query_as::<_, GraphicalPassword>(
            "SELECT id, user_id, salt, hash, algorithm, created_at
             FROM graphical_passwords WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    /// Count stored graphical passwords.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM graphical_passwords")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{GraphicalVerifier, ImagePool};

    #[test]
    fn test_from_enrollment() {
        let verifier = GraphicalVerifier::new(ImagePool::builtin());
        let enrollment = verifier
            .enroll(&["bitcoin.png", "ethereum.png", "dogecoin.png", "litecoin.png"])
            .unwrap();

        let record = NewGraphicalPassword::from(&enrollment);
        assert_eq!(record.salt.len(), 32);
        assert_eq!(record.hash.len(), 64);
        assert_eq!(record.algorithm, "sha256");
        assert_eq!(hex::decode(&record.salt).unwrap(), enrollment.salt);
    }

    #[test]
    fn test_debug_hides_secret_material() {
        let record = GraphicalPassword {
            id: 1,
            user_id: 2,
            salt: "00ff".to_string(),
            hash: "deadbeef".to_string(),
            algorithm: "sha256".to_string(),
            created_at: "2024-01-01 00:00:00".to_string(),
        };
        let debug = format!("{record:?}");
        assert!(!debug.contains("deadbeef"));
        assert!(debug.contains("sha256"));
    }
}
