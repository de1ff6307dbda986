pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

// Re-export the handlers so the router below and the binaries can reach them directly.
pub use rest::{create_lesson_handler, get_lesson_handler, health_handler, list_lessons_handler};
pub use ws_handler::ws_handler;

use crate::web::{rest::ApiDoc, state::AppState};
use axum::{
    extract::DefaultBodyLimit,
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Room for multipart boundaries and headers on top of the image itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Builds the complete application: lesson routes, the WebSocket endpoint and Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Router {
    let body_limit = app_state
        .config
        .max_image_bytes
        .saturating_add(MULTIPART_OVERHEAD);

    let api_router = Router::new()
        .route(
            "/lessons",
            get(list_lessons_handler).post(create_lesson_handler),
        )
        .route("/lessons/{id}", get(get_lesson_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(&app_state.config.cors_origin))
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    if origin.trim() == "*" {
        return layer.allow_origin(Any);
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            warn!("CORS_ORIGIN '{}' is not a valid origin; allowing any origin.", origin);
            layer.allow_origin(Any)
        }
    }
}
