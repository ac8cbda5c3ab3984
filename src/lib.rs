//! graphauth - Graphical Password Authentication
//!
//! Username/password login backed by a second factor: an ordered sequence of
//! images picked from a fixed pool, stored as a salted digest.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod web;

pub use auth::{
    authenticate, hash_password, register, validate_password, verify_graphical, verify_password,
    DigestAlgorithm, Enrollment, GraphicalError, GraphicalVerifier, ImagePool, LoginError,
    LoginRequest, PasswordError, RegistrationError, RegistrationRequest, ValidationError,
};
pub use config::Config;
pub use db::{
    CredentialStore, Database, GraphicalPassword, MemoryCredentialStore, NewUser,
    SqliteCredentialStore, User, UserRepository,
};
pub use error::{GraphAuthError, Result};
pub use web::WebServer;
