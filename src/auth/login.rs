//! Two-factor login: text password, then graphical password.

use std::sync::OnceLock;

use thiserror::Error;
use tracing::{info, warn};

use super::graphical::{DigestAlgorithm, GraphicalVerifier};
use super::password::{hash_password, verify_password, PasswordError};
use crate::db::{CredentialStore, GraphicalPassword, User};
use crate::GraphAuthError;

/// Login errors.
///
/// Every credential failure collapses into [`LoginError::AuthenticationFailed`]
/// so callers cannot tell which factor was wrong.
#[derive(Error, Debug)]
pub enum LoginError {
    /// No images were submitted.
    #[error("please select your graphical password")]
    MissingGraphicalPassword,

    /// Unknown user, wrong text password or wrong image sequence.
    #[error("invalid credentials")]
    AuthenticationFailed,

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

impl From<GraphAuthError> for LoginError {
    fn from(e: GraphAuthError) -> Self {
        LoginError::Database(e.to_string())
    }
}

/// Login request data.
#[derive(Clone)]
pub struct LoginRequest {
    /// Username.
    pub username: String,
    /// Text password.
    pub password: String,
    /// Ordered image sequence.
    pub images: Vec<String>,
}

impl LoginRequest {
    /// Create a new login request.
    pub fn new<I, S>(username: impl Into<String>, password: impl Into<String>, images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            username: username.into(),
            password: password.into(),
            images: images.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Check a submitted sequence against a stored record.
///
/// Undecodable records and unknown algorithms count as a mismatch.
pub fn verify_graphical(images: &[String], record: &GraphicalPassword) -> bool {
    let Ok(algorithm) = record.algorithm.parse::<DigestAlgorithm>() else {
        warn!(user_id = record.user_id, algorithm = %record.algorithm, "Unknown digest algorithm on record");
        return false;
    };
    let (Ok(salt), Ok(hash)) = (hex::decode(&record.salt), hex::decode(&record.hash)) else {
        warn!(user_id = record.user_id, "Graphical password record is not valid hex");
        return false;
    };
    if hash.len() != algorithm.output_len() {
        warn!(
            user_id = record.user_id,
            algorithm = %algorithm,
            "Graphical password digest has the wrong length"
        );
        return false;
    }

    GraphicalVerifier::verify_with(algorithm, images, &salt, &hash)
}

/// Argon2 hash checked when the username is unknown, so that path costs
/// the same as a wrong password.
fn decoy_password_hash() -> Option<&'static str> {
    static DECOY: OnceLock<Option<String>> = OnceLock::new();
    DECOY
        .get_or_init(|| hash_password("graphauth-decoy-password").ok())
        .as_deref()
}

/// Run Argon2 off the async runtime. `None` checks against the decoy hash.
async fn check_text_password(
    password: String,
    password_hash: Option<String>,
) -> Result<Result<(), PasswordError>, LoginError> {
    tokio::task::spawn_blocking(move || match password_hash {
        Some(hash) => verify_password(&password, &hash),
        None => match decoy_password_hash() {
            Some(decoy) => {
                let _ = verify_password(&password, decoy);
                Err(PasswordError::VerificationFailed)
            }
            None => Err(PasswordError::VerificationFailed),
        },
    })
    .await
    .map_err(|e| LoginError::Database(e.to_string()))
}

/// Authenticate a user with both factors.
///
/// On success the user's `last_login` is updated and the user returned.
pub async fn authenticate(
    store: &dyn CredentialStore,
    request: LoginRequest,
) -> Result<User, LoginError> {
    if request.images.is_empty() {
        return Err(LoginError::MissingGraphicalPassword);
    }

    let Some(stored) = store.find_by_username(&request.username).await? else {
        let _ = check_text_password(request.password, None).await?;
        warn!(username = %request.username, "Login failed: unknown user");
        return Err(LoginError::AuthenticationFailed);
    };

    let text_ok =
        check_text_password(request.password, Some(stored.user.password.clone())).await?;

    match text_ok {
        Ok(()) => {}
        Err(PasswordError::VerificationFailed) => {
            warn!(username = %request.username, "Login failed: wrong text password");
            return Err(LoginError::AuthenticationFailed);
        }
        Err(e) => {
            warn!(username = %request.username, error = %e, "Login failed: unusable password hash");
            return Err(LoginError::AuthenticationFailed);
        }
    }

    let Some(graphical) = stored.graphical else {
        warn!(username = %request.username, "Login failed: no graphical password on record");
        return Err(LoginError::AuthenticationFailed);
    };

    if !verify_graphical(&request.images, &graphical) {
        warn!(username = %request.username, "Login failed: wrong graphical password");
        return Err(LoginError::AuthenticationFailed);
    }

    store.record_login(stored.user.id).await?;

    info!(username = %stored.user.username, user_id = stored.user.id, "User logged in");

    Ok(stored.user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{register, ImagePool, RegistrationRequest};
    use crate::db::MemoryCredentialStore;

    const ALICE_IMAGES: [&str; 4] = ["btc", "eth", "doge", "ltc"];

    async fn store_with_alice() -> MemoryCredentialStore {
        let store = MemoryCredentialStore::new();
        let verifier =
            GraphicalVerifier::new(ImagePool::new(["btc", "eth", "doge", "ltc", "xmr"]).unwrap());
        register(
            &store,
            &verifier,
            RegistrationRequest::new("alice", "alice@example.com", "P@ss1", ALICE_IMAGES),
        )
        .await
        .unwrap();
        store
    }

    #[tokio::test]
    async fn test_login_success() {
        let store = store_with_alice().await;

        let user = authenticate(&store, LoginRequest::new("alice", "P@ss1", ALICE_IMAGES))
            .await
            .unwrap();
        assert_eq!(user.username, "alice");

        let reloaded = store.find_user_by_id(user.id).await.unwrap().unwrap();
        assert!(reloaded.last_login.is_some());
    }

    #[tokio::test]
    async fn test_login_username_case_insensitive() {
        let store = store_with_alice().await;
        assert!(
            authenticate(&store, LoginRequest::new("Alice", "P@ss1", ALICE_IMAGES))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_login_wrong_order() {
        let store = store_with_alice().await;

        let result = authenticate(
            &store,
            LoginRequest::new("alice", "P@ss1", ["eth", "btc", "doge", "ltc"]),
        )
        .await;
        assert!(matches!(result, Err(LoginError::AuthenticationFailed)));

        let user = store.find_user_by_id(1).await.unwrap().unwrap();
        assert!(user.last_login.is_none());
    }

    #[tokio::test]
    async fn test_login_every_factor_fails_the_same_way() {
        let store = store_with_alice().await;

        for request in [
            LoginRequest::new("mallory", "P@ss1", ALICE_IMAGES),
            LoginRequest::new("alice", "wrong", ALICE_IMAGES),
            LoginRequest::new("alice", "P@ss1", ["btc", "eth", "doge"]),
            LoginRequest::new("alice", "P@ss1", ["btc", "eth", "doge", "xmr"]),
        ] {
            let result = authenticate(&store, request).await;
            assert!(matches!(result, Err(LoginError::AuthenticationFailed)));
        }
    }

    #[tokio::test]
    async fn test_login_without_images() {
        let store = store_with_alice().await;
        let empty: [&str; 0] = [];

        let result = authenticate(&store, LoginRequest::new("alice", "P@ss1", empty)).await;
        assert!(matches!(result, Err(LoginError::MissingGraphicalPassword)));
    }

    #[test]
    fn test_verify_graphical_bad_records() {
        let images: Vec<String> = ALICE_IMAGES.iter().map(|s| s.to_string()).collect();
        let mut record = GraphicalPassword {
            id: 1,
            user_id: 1,
            salt: "zz".to_string(),
            hash: "00".to_string(),
            algorithm: "sha256".to_string(),
            created_at: String::new(),
        };
        assert!(!verify_graphical(&images, &record));

        record.salt = "00".to_string();
        record.algorithm = "md5".to_string();
        assert!(!verify_graphical(&images, &record));
    }

    #[test]
    fn test_verify_graphical_rejects_truncated_digest() {
        let images: Vec<String> = ALICE_IMAGES.iter().map(|s| s.to_string()).collect();
        let salt = [9u8; 16];
        let hash = DigestAlgorithm::Sha256.digest(&salt, &images);
        let mut record = GraphicalPassword {
            id: 1,
            user_id: 1,
            salt: hex::encode(salt),
            hash: hex::encode(&hash),
            algorithm: "sha256".to_string(),
            created_at: String::new(),
        };
        assert!(verify_graphical(&images, &record));

        record.hash = hex::encode(&hash[..16]);
        assert!(!verify_graphical(&images, &record));

        // A SHA-256 digest stored under the SHA-512 label
        record.hash = hex::encode(&hash);
        record.algorithm = "sha512".to_string();
        assert!(!verify_graphical(&images, &record));
    }

    #[test]
    fn test_decoy_hash_is_argon2id() {
        let decoy = decoy_password_hash().unwrap();
        assert!(decoy.starts_with("$argon2id$"));
        assert!(verify_password("graphauth-decoy-password", decoy).is_ok());
    }

    #[tokio::test]
    async fn test_unknown_user_pays_for_argon2() {
        let store = store_with_alice().await;
        // Build the decoy hash outside the timed section
        let _ = check_text_password("warm".to_string(), None).await;

        let start = std::time::Instant::now();
        let result =
            authenticate(&store, LoginRequest::new("alice", "wrong", ALICE_IMAGES)).await;
        let known_user = start.elapsed();
        assert!(matches!(result, Err(LoginError::AuthenticationFailed)));

        let start = std::time::Instant::now();
        let result =
            authenticate(&store, LoginRequest::new("mallory", "wrong", ALICE_IMAGES)).await;
        let unknown_user = start.elapsed();
        assert!(matches!(result, Err(LoginError::AuthenticationFailed)));

        assert!(
            unknown_user * 4 >= known_user,
            "unknown user took {unknown_user:?}, known user {known_user:?}"
        );
    }

    #[tokio::test]
    async fn test_unknown_user_with_decoy_password_fails() {
        let store = store_with_alice().await;
        let result = authenticate(
            &store,
            LoginRequest::new("mallory", "graphauth-decoy-password", ALICE_IMAGES),
        )
        .await;
        assert!(matches!(result, Err(LoginError::AuthenticationFailed)));
    }

    #[test]
    fn test_verify_graphical_uses_record_algorithm() {
        let images: Vec<String> = ALICE_IMAGES.iter().map(|s| s.to_string()).collect();
        let salt = [9u8; 16];
        let hash = DigestAlgorithm::Sha512.digest(&salt, &images);
        let record = GraphicalPassword {
            id: 1,
            user_id: 1,
            salt: hex::encode(salt),
            hash: hex::encode(hash),
            algorithm: "sha512".to_string(),
            created_at: String::new(),
        };
        assert!(verify_graphical(&images, &record));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(LoginError::AuthenticationFailed.to_string(), "invalid credentials");
    }
}
