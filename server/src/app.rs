use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer};

use crate::{handlers, state::AppState, storage::MAX_UPLOAD_SIZE};

// Room for the multipart framing and text fields around a maximum-size file.
const BODY_LIMIT: usize = MAX_UPLOAD_SIZE + 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/works", get(handlers::list_works))
        .route("/api/works/:id", delete(handlers::delete_work))
        .route("/api/upload", post(handlers::upload_work))
        .route("/api/spotify", get(handlers::spotify_currently_playing))
        .route("/api/spotify/now-playing", get(handlers::spotify_now_playing))
        .route("/api/health", get(handlers::health_check))
        .route("/health", get(handlers::health_check))
        .route("/uploads/*path", get(handlers::serve_upload))
        .fallback(handlers::serve_site)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::new())
        .with_state(state)
}
