//! API handlers.

pub mod auth;
pub mod images;

pub use auth::*;
pub use images::*;
