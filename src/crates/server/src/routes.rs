//! Route table for the `/api/runs/...` surface (§6.3), mirroring pcastone-orca's
//! `api::routes::create_router` shape (one `Router::new()` chain, `.with_state` at the end).

use crate::handlers;
use crate::state::AppState;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/runs/:run_id", get(handlers::get_run))
        .route("/api/runs/:run_id/node-statuses", get(handlers::node_statuses))
        .route("/api/runs/:run_id/stream", get(handlers::stream))
        .route("/api/runs/:run_id/continue", post(handlers::continue_run))
        .route("/api/runs/:run_id/pause", post(handlers::pause_run))
        .route("/api/runs/:run_id/stop", post(handlers::stop_run))
        .route("/api/runs/:run_id/step", post(handlers::step_run))
        .route(
            "/api/runs/:run_id/breakpoints",
            post(handlers::set_breakpoint).delete(handlers::clear_all_breakpoints),
        )
        .route("/api/runs/:run_id/breakpoints/:flow_index", delete(handlers::clear_breakpoint))
        .route("/api/runs/:run_id/reference/:concept_name", get(handlers::get_reference))
        .route("/api/runs/:run_id/references", get(handlers::list_references))
        .route("/api/runs/:run_id/concept-statuses", get(handlers::concept_statuses))
        .route("/api/runs/:run_id/override/:concept_name", post(handlers::override_concept))
        .route("/api/runs/:run_id/logs", get(handlers::logs))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
