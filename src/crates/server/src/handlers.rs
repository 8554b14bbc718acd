//! Route handlers for the `/api/runs/{run_id}/...` surface (§6.3).
//!
//! Read endpoints are served from the latest checkpoint for `run_id`, live or historical alike
//! (§5: external readers tolerate snapshot-consistent reads); control endpoints require a live
//! run's `RunControl` handle and 404 otherwise.

use crate::error::{ApiError, ApiResult};
use crate::response::ok;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use flowboard_checkpoint::Checkpoint;
use flowboard_core::PendingOverride;
use futures::stream::{self, Stream};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::convert::Infallible;
use std::time::Duration;

async fn latest_checkpoint(state: &AppState, run_id: &str) -> ApiResult<Checkpoint> {
    state
        .registry
        .saver()
        .latest(run_id)
        .await?
        .ok_or_else(|| ApiError::RunNotFound(run_id.to_string()))
}

fn live_control(state: &AppState, run_id: &str) -> ApiResult<std::sync::Arc<flowboard_core::RunControl>> {
    state
        .registry
        .live_run(run_id)
        .map(|live| live.control.clone())
        .ok_or_else(|| ApiError::RunNotLive(run_id.to_string()))
}

#[derive(Serialize)]
struct RunStatus {
    run_id: String,
    cycle: u64,
    completed_items: usize,
    total_items: usize,
    paused: bool,
    stopped: bool,
    breakpoints: Vec<String>,
}

pub async fn get_run(State(state): State<AppState>, Path(run_id): Path<String>) -> ApiResult<impl IntoResponse> {
    let checkpoint = latest_checkpoint(&state, &run_id).await?;
    let (paused, stopped, breakpoints) = match state.registry.live_run(&run_id) {
        Some(live) => (live.control.is_paused(), live.control.is_stopped(), live.control.breakpoints()),
        None => (false, false, Vec::new()),
    };
    let completed_items = checkpoint.items.iter().filter(|i| i.status == "completed").count();
    Ok(ok(RunStatus {
        run_id,
        cycle: checkpoint.cycle,
        completed_items,
        total_items: checkpoint.items.len(),
        paused,
        stopped,
        breakpoints,
    }))
}

pub async fn node_statuses(State(state): State<AppState>, Path(run_id): Path<String>) -> ApiResult<impl IntoResponse> {
    let checkpoint = latest_checkpoint(&state, &run_id).await?;
    let map: std::collections::BTreeMap<String, String> =
        checkpoint.items.into_iter().map(|item| (item.flow_index, item.status)).collect();
    Ok(ok(map))
}

pub async fn concept_statuses(State(state): State<AppState>, Path(run_id): Path<String>) -> ApiResult<impl IntoResponse> {
    let checkpoint = latest_checkpoint(&state, &run_id).await?;
    let map: std::collections::BTreeMap<String, String> =
        checkpoint.concepts.into_iter().map(|c| (c.name, c.status)).collect();
    Ok(ok(map))
}

pub async fn list_references(State(state): State<AppState>, Path(run_id): Path<String>) -> ApiResult<impl IntoResponse> {
    let checkpoint = latest_checkpoint(&state, &run_id).await?;
    let map: std::collections::BTreeMap<String, Option<Value>> =
        checkpoint.concepts.into_iter().map(|c| (c.name, c.reference_data)).collect();
    Ok(ok(map))
}

pub async fn get_reference(
    State(state): State<AppState>,
    Path((run_id, concept_name)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let checkpoint = latest_checkpoint(&state, &run_id).await?;
    let concept = checkpoint
        .concepts
        .into_iter()
        .find(|c| c.name == concept_name)
        .ok_or_else(|| ApiError::ConceptNotFound(concept_name.clone()))?;
    Ok(ok(concept.reference_data))
}

#[derive(Deserialize)]
pub struct LogsQuery {
    limit: Option<usize>,
    flow_index: Option<String>,
}

pub async fn logs(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> ApiResult<impl IntoResponse> {
    let live = state.registry.live_run(&run_id).ok_or_else(|| ApiError::RunNotLive(run_id.clone()))?;
    let limit = query.limit.unwrap_or(100);
    Ok(ok(live.logs(limit, query.flow_index.as_deref())))
}

pub async fn continue_run(State(state): State<AppState>, Path(run_id): Path<String>) -> ApiResult<impl IntoResponse> {
    live_control(&state, &run_id)?.resume();
    Ok(ok(Value::Null))
}

pub async fn pause_run(State(state): State<AppState>, Path(run_id): Path<String>) -> ApiResult<impl IntoResponse> {
    live_control(&state, &run_id)?.pause();
    Ok(ok(Value::Null))
}

pub async fn stop_run(State(state): State<AppState>, Path(run_id): Path<String>) -> ApiResult<impl IntoResponse> {
    live_control(&state, &run_id)?.stop();
    Ok(ok(Value::Null))
}

pub async fn step_run(State(state): State<AppState>, Path(run_id): Path<String>) -> ApiResult<impl IntoResponse> {
    live_control(&state, &run_id)?.step();
    Ok(ok(Value::Null))
}

#[derive(Deserialize)]
pub struct BreakpointRequest {
    flow_index: String,
    enabled: bool,
}

pub async fn set_breakpoint(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    Json(body): Json<BreakpointRequest>,
) -> ApiResult<impl IntoResponse> {
    live_control(&state, &run_id)?.set_breakpoint(body.flow_index, body.enabled);
    Ok(ok(Value::Null))
}

pub async fn clear_breakpoint(
    State(state): State<AppState>,
    Path((run_id, flow_index)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    live_control(&state, &run_id)?.clear_breakpoint(&flow_index);
    Ok(ok(Value::Null))
}

pub async fn clear_all_breakpoints(State(state): State<AppState>, Path(run_id): Path<String>) -> ApiResult<impl IntoResponse> {
    live_control(&state, &run_id)?.clear_all_breakpoints();
    Ok(ok(Value::Null))
}

#[derive(Deserialize)]
pub struct OverrideRequest {
    new_value: Value,
    #[serde(default)]
    rerun_dependents: bool,
}

pub async fn override_concept(
    State(state): State<AppState>,
    Path((run_id, concept_name)): Path<(String, String)>,
    Json(body): Json<OverrideRequest>,
) -> ApiResult<impl IntoResponse> {
    live_control(&state, &run_id)?.push_override(PendingOverride {
        concept_name,
        new_value: body.new_value,
        rerun_dependents: body.rerun_dependents,
    });
    Ok(ok(Value::Null))
}

fn sse_frame(value: &impl Serialize) -> SseEvent {
    SseEvent::default().data(serde_json::to_string(value).unwrap_or_else(|_| "null".to_string()))
}

pub async fn stream(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>> {
    let snapshot = state.registry.saver().latest(&run_id).await?;
    let connected = serde_json::json!({"tag": "connected", "payload": snapshot});
    let initial = stream::once(async move { Ok(sse_frame(&connected)) });

    let live_stream: std::pin::Pin<Box<dyn Stream<Item = Result<SseEvent, Infallible>> + Send>> =
        match state.registry.live_run(&run_id) {
            Some(live) => {
                let receiver = live.subscribe();
                Box::pin(tokio_stream::wrappers::BroadcastStream::new(receiver).filter_map(|item| async move {
                    match item {
                        Ok(event) => Some(Ok(sse_frame(&event))),
                        Err(_lagged) => None,
                    }
                }))
            }
            None => Box::pin(stream::empty()),
        };

    Ok(Sse::new(initial.chain(live_stream))
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("keepalive")))
}
