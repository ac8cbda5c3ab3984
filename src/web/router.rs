//! Router configuration for Web API.

use axum::{
    body::Body,
    http::Request,
    middleware::{self, Next},
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

use super::handlers::{list_images, login, logout, me, refresh, register, AppState};
use super::middleware::{
    api_rate_limit, create_cors_layer, jwt_auth, login_rate_limit, security_headers, JwtState,
    RateLimitState,
};

/// Create the main API router.
///
/// Registration and login share the stricter login quota; every other API
/// route counts against the general quota.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    rate_limit: Arc<RateLimitState>,
    cors_origins: &[String],
) -> Router {
    let login_limit = rate_limit.clone();
    let credential_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route_layer(middleware::from_fn(
            move |req: Request<Body>, next: Next| {
                let state = login_limit.clone();
                login_rate_limit(state, req, next)
            },
        ));

    let session_routes = Router::new()
        .route("/logout", post(logout))
        .route("/refresh", post(refresh))
        .route("/me", get(me));

    let api_limit = rate_limit;
    let api_routes = Router::new()
        .nest(
            "/auth",
            Router::new().merge(credential_routes).merge(session_routes),
        )
        .route("/images", get(list_images))
        .route_layer(middleware::from_fn(
            move |req: Request<Body>, next: Next| {
                let state = api_limit.clone();
                api_rate_limit(state, req, next)
            },
        ));

    let jwt_state_for_middleware = jwt_state.clone();

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(security_headers))
                .layer(middleware::from_fn(move |req, next| {
                    let state = jwt_state_for_middleware.clone();
                    jwt_auth(state, req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Serve the image pool under `/images` when the directory exists.
pub fn create_static_router(static_path: &str) -> Option<Router> {
    if !Path::new(static_path).is_dir() {
        tracing::warn!("Image directory not found: {}", static_path);
        return None;
    }

    tracing::info!("Serving images from: {}", static_path);
    Some(
        Router::new()
            .nest_service("/images", ServeDir::new(static_path))
            .layer(middleware::from_fn(security_headers)),
    )
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
