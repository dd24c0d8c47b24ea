use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use super::{bindings, handlers, review};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Dashboard static files path (configurable via env)
    let dashboard_dir =
        std::env::var("DASHBOARD_DIR").unwrap_or_else(|_| "crates/dashboard/dist".to_string());

    // API routes
    let api_routes = Router::new()
        // Health, config, metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        // Bindings
        .route("/bindings", get(bindings::list_bindings))
        .route(
            "/bindings/{kind}/{website_id}/{entity_id}",
            get(bindings::get_binding),
        )
        .route(
            "/bindings/{kind}/{website_id}/{entity_id}/work",
            post(bindings::set_work),
        )
        .route(
            "/bindings/{kind}/{website_id}/{entity_id}/fields",
            post(bindings::content_changed),
        )
        // Reconciler
        .route("/reconciler/status", get(handlers::reconciler_status))
        // Task review
        .route("/review/tasks", get(review::list_tasks))
        .route("/review/approve", post(review::approve))
        .route("/review/revise", post(review::request_revision))
        .route("/review/reject", post(review::reject))
        .route("/review/delete", post(review::delete))
        .route("/review/reasons", get(review::reasons))
        .with_state(state);

    // Serve dashboard with SPA fallback
    let index_path = format!("{}/index.html", dashboard_dir);
    let serve_dir = ServeDir::new(&dashboard_dir).fallback(ServeFile::new(&index_path));

    Router::new()
        .nest("/api/v1", api_routes)
        .fallback_service(serve_dir)
        .layer(TraceLayer::new_for_http())
}
