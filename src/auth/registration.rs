//! User registration.
//!
//! A registration creates the user and its graphical password in one atomic
//! write, after both the text password and the image sequence have been
//! processed.

use thiserror::Error;
use tracing::info;

use super::graphical::{GraphicalError, GraphicalVerifier};
use super::password::{hash_password, PasswordError};
use super::validation::{validate_registration, ValidationError};
use crate::db::{CredentialStore, NewGraphicalPassword, NewUser, User};
use crate::GraphAuthError;

/// Registration-specific errors.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// A text field failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The image sequence was rejected.
    #[error("graphical password error: {0}")]
    Graphical(#[from] GraphicalError),

    /// Username already exists.
    #[error("username already exists")]
    DuplicateUsername,

    /// Email already registered.
    #[error("email already registered")]
    DuplicateEmail,

    /// Password hashing failed.
    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

impl From<GraphAuthError> for RegistrationError {
    fn from(e: GraphAuthError) -> Self {
        match e {
            GraphAuthError::UniqueViolation(column) if column.ends_with("email") => {
                RegistrationError::DuplicateEmail
            }
            GraphAuthError::UniqueViolation(column) if column.ends_with("username") => {
                RegistrationError::DuplicateUsername
            }
            other => RegistrationError::Database(other.to_string()),
        }
    }
}

/// Registration request data.
#[derive(Clone)]
pub struct RegistrationRequest {
    /// Desired username.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Text password.
    pub password: String,
    /// Ordered image sequence.
    pub images: Vec<String>,
}

impl RegistrationRequest {
    /// Create a new registration request.
    pub fn new<I, S>(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        images: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            images: images.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Register a new user.
///
/// This function:
/// 1. Validates username, email and text password
/// 2. Enrolls the image sequence
/// 3. Rejects a taken username or email
/// 4. Hashes the text password
/// 5. Saves user and graphical password in one transaction
pub async fn register(
    store: &dyn CredentialStore,
    verifier: &GraphicalVerifier,
    request: RegistrationRequest,
) -> Result<User, RegistrationError> {
    validate_registration(&request.username, &request.email, &request.password)?;

    let enrollment = verifier.enroll(&request.images)?;

    if store.username_exists(&request.username).await? {
        return Err(RegistrationError::DuplicateUsername);
    }
    if store.email_exists(&request.email).await? {
        return Err(RegistrationError::DuplicateEmail);
    }

    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| PasswordError::HashError(e.to_string()))??;

    let new_user = NewUser::new(request.username, request.email, password_hash);
    let user = store
        .save(&new_user, &NewGraphicalPassword::from(&enrollment))
        .await?;

    info!(
        username = %user.username,
        user_id = user.id,
        images = request.images.len(),
        "New user registered"
    );

    Ok(user)
}
