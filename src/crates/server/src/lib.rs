//! `flowboard-server`: the `axum`-based HTTP/SSE surface (§6.3) that `flowboard serve` starts.
//!
//! Read endpoints serve snapshot-consistent data from the attached `CheckpointSaver` rather than
//! reaching into a live orchestrator's state directly, per the concurrency model in §5 ("External
//! readers ... tolerate snapshot-consistent reads"). Control endpoints (pause/step/stop/
//! breakpoints/override) act on a `RunControl` handle shared with the orchestrator's own task.

pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod state;

use flowboard_checkpoint::CheckpointSaver;
use flowboard_core::orchestrator::Orchestrator;
use state::{AppState, RunRegistry};
use std::net::SocketAddr;
use std::sync::Arc;

/// Registers `orchestrator` as a live run under `run_id` and spawns it onto its own task. The
/// returned `RunRegistry` should be wrapped in an `AppState` and handed to `serve`.
pub fn launch_run(registry: &Arc<RunRegistry>, run_id: String, orchestrator: Orchestrator) {
    let (orchestrator, _control) = registry.prepare(orchestrator, run_id.clone());
    state::spawn_run(registry.clone(), run_id, orchestrator);
}

pub fn new_registry(saver: Arc<dyn CheckpointSaver>) -> Arc<RunRegistry> {
    Arc::new(RunRegistry::new(saver))
}

/// Binds and serves the API router until the process is interrupted.
pub async fn serve(bind: SocketAddr, registry: Arc<RunRegistry>) -> anyhow::Result<()> {
    let app = routes::create_router(AppState { registry });
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(%bind, "flowboard-server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
