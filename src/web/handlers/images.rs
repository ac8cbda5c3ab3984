//! Image pool handler.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::web::dto::{ApiResponse, ImagePoolResponse};

use super::AppState;

/// GET /api/images - Selectable images and the sequence length bounds.
pub async fn list_images(State(state): State<Arc<AppState>>) -> Json<ApiResponse<ImagePoolResponse>> {
    let verifier = &state.verifier;

    Json(ApiResponse::new(ImagePoolResponse {
        images: verifier.pool().as_slice().to_vec(),
        min_images: verifier.min_images(),
        max_images: verifier.max_images(),
    }))
}
