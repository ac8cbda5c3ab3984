//! Input validation for user registration.
//!
//! This module provides validation functions for usernames, text passwords,
//! and email addresses.

use thiserror::Error;

use super::password::MAX_PASSWORD_LENGTH;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 150;

/// Maximum email length.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Username is empty.
    #[error("username is required")]
    UsernameEmpty,

    /// Username is too long.
    #[error("username must be at most {MAX_USERNAME_LENGTH} characters")]
    UsernameTooLong,

    /// Username contains invalid characters.
    #[error("username may contain only letters, digits and @/./+/-/_ characters")]
    UsernameInvalidChars,

    /// Password is empty.
    #[error("password is required")]
    PasswordEmpty,

    /// Password is too long.
    #[error("password must be at most {MAX_PASSWORD_LENGTH} characters")]
    PasswordTooLong,

    /// Email is too long.
    #[error("email must be at most {MAX_EMAIL_LENGTH} characters")]
    EmailTooLong,

    /// Email format is invalid.
    #[error("enter a valid email address")]
    EmailInvalidFormat,
}

impl ValidationError {
    /// Name of the request field this error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::UsernameEmpty
            | ValidationError::UsernameTooLong
            | ValidationError::UsernameInvalidChars => "username",
            ValidationError::PasswordEmpty | ValidationError::PasswordTooLong => "password",
            ValidationError::EmailTooLong | ValidationError::EmailInvalidFormat => "email",
        }
    }
}

/// Validate a username.
///
/// Requirements:
/// - Length: 1-150 characters
/// - Characters: ASCII letters, digits and `@ . + - _`
///
/// # Examples
///
/// ```
/// use graphauth::auth::validation::validate_username;
///
/// assert!(validate_username("alice").is_ok());
/// assert!(validate_username("alice@example.com").is_ok());
/// assert!(validate_username("").is_err());
/// assert!(validate_username("alice smith").is_err());
/// ```
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::UsernameEmpty);
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::UsernameTooLong);
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(ValidationError::UsernameInvalidChars);
    }

    Ok(())
}

/// Validate a text password for registration (1-128 characters).
pub fn validate_registration_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::PasswordEmpty);
    }
    if password.chars().count() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooLong);
    }
    Ok(())
}

/// Validate an email address.
///
/// Email is required. The check is a basic shape check, not RFC 5322.
///
/// ```
/// use graphauth::auth::validation::validate_email;
///
/// assert!(validate_email("user@example.com").is_ok());
/// assert!(validate_email("").is_err());
/// assert!(validate_email("invalid").is_err());
/// ```
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::EmailTooLong);
    }

    if email.chars().any(|c| c.is_whitespace()) {
        return Err(ValidationError::EmailInvalidFormat);
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::EmailInvalidFormat);
    };

    if local.is_empty() || domain.contains('@') {
        return Err(ValidationError::EmailInvalidFormat);
    }

    // Domain needs at least one dot with text on both sides of every dot
    if !domain.contains('.') || domain.split('.').any(|p| p.is_empty()) {
        return Err(ValidationError::EmailInvalidFormat);
    }

    Ok(())
}

/// Validate all registration fields at once.
///
/// Returns the first validation error encountered, or Ok if all fields are valid.
pub fn validate_registration(
    username: &str,
    email: &str,
    password: &str,
) -> Result<(), ValidationError> {
    validate_username(username)?;
    validate_email(email)?;
    validate_registration_password(password)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username_valid() {
        assert!(validate_username("a").is_ok());
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("Alice_99").is_ok());
        assert!(validate_username("first.last+tag@host-name").is_ok());
    }

    #[test]
    fn test_validate_username_empty() {
        assert_eq!(validate_username(""), Err(ValidationError::UsernameEmpty));
    }

    #[test]
    fn test_validate_username_lengths() {
        assert!(validate_username(&"a".repeat(150)).is_ok());
        assert_eq!(
            validate_username(&"a".repeat(151)),
            Err(ValidationError::UsernameTooLong)
        );
    }

    #[test]
    fn test_validate_username_invalid_chars() {
        for name in ["alice smith", "alice!", "a/b", "ユーザー", "tab\tname"] {
            assert_eq!(
                validate_username(name),
                Err(ValidationError::UsernameInvalidChars),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_registration_password("P@ss1").is_ok());
        assert_eq!(
            validate_registration_password(""),
            Err(ValidationError::PasswordEmpty)
        );
        assert_eq!(
            validate_registration_password(&"x".repeat(129)),
            Err(ValidationError::PasswordTooLong)
        );
    }

    #[test]
    fn test_validate_email_valid() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("user.name@example.co.jp").is_ok());
        assert!(validate_email("user+tag@example.com").is_ok());
    }

    #[test]
    fn test_validate_email_invalid_format() {
        for email in [
            "",
            "invalid",
            "@example.com",
            "user@",
            "user@example",
            "user@@example.com",
            "user @example.com",
            "user@example..com",
        ] {
            assert_eq!(
                validate_email(email),
                Err(ValidationError::EmailInvalidFormat),
                "{email:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_email_too_long() {
        let long_email = format!("{}@example.com", "a".repeat(250));
        assert_eq!(
            validate_email(&long_email),
            Err(ValidationError::EmailTooLong)
        );
    }

    #[test]
    fn test_validate_registration_order() {
        assert!(validate_registration("alice", "alice@example.com", "P@ss1").is_ok());
        assert_eq!(
            validate_registration("", "bad", ""),
            Err(ValidationError::UsernameEmpty)
        );
        assert_eq!(
            validate_registration("alice", "bad", ""),
            Err(ValidationError::EmailInvalidFormat)
        );
    }

    #[test]
    fn test_error_fields() {
        assert_eq!(ValidationError::UsernameTooLong.field(), "username");
        assert_eq!(ValidationError::EmailInvalidFormat.field(), "email");
        assert_eq!(ValidationError::PasswordEmpty.field(), "password");
    }
}
