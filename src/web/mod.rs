//! Web API module.
//!
//! Registration, login and token management over JSON, plus the image pool
//! the browser renders the graphical password grid from.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::create_router;
pub use server::WebServer;
