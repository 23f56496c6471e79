//! REST API for the sales dashboard
//!
//! Serves the computed dashboard views as JSON for the presentation layer.

pub mod handlers;
pub mod service;

pub use service::DashboardService;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn router(service: Arc<DashboardService>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/options", get(handlers::get_options))
        .route("/api/v1/dashboard", get(handlers::get_dashboard))
        .route("/api/v1/segments", get(handlers::get_segments))
        .route("/api/v1/reload", post(handlers::reload))
        // State and middleware
        .with_state(service)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
