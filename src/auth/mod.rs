//! Authentication module for graphauth.
//!
//! This module provides text-password hashing, graphical password enrollment
//! and verification, the image pool, registration, and login.

mod graphical;
mod images;
mod login;
mod password;
mod registration;
pub mod validation;

pub use graphical::{DigestAlgorithm, Enrollment, GraphicalError, GraphicalVerifier};
pub use images::{validate_identifier, ImagePool, BUILTIN_IMAGES, MAX_IDENTIFIER_LENGTH};
pub use login::{authenticate, verify_graphical, LoginError, LoginRequest};
pub use password::{hash_password, validate_password, verify_password, PasswordError};
pub use registration::{register, RegistrationError, RegistrationRequest};
pub use validation::ValidationError;
