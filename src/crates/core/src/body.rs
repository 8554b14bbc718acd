//! `Body` — the pluggable bag of external collaborators (LLM client, script executor,
//! user-input channel) an inference's sequence kind may call into. Opaque to the scheduler
//! (SPEC_FULL.md §1 "Explicitly OUT OF SCOPE").
//!
//! Mirrors pcastone-orca's `NodeExecutor` trait: a thin `async_trait` seam so the
//! orchestrator core never depends on concrete LLM/tool crates.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// A single call into an external collaborator, keyed by the function concept's name (or a
/// sequence-kind-specific verb for `imperative_python`/`judgement` paradigms).
#[async_trait]
pub trait Body: Send + Sync {
    async fn invoke(&self, verb: &str, inputs: &HashMap<String, Value>) -> Result<Value, String>;

    /// Inject a user's response to a prior `NeedsUserInput` outcome (§7 item 6). Default is a
    /// no-op sink; real bodies override to route the value back to the waiting step.
    async fn inject_response(&self, _interaction_id: &str, _response: Value) {}
}

/// A body with no external collaborators: every `invoke` fails immediately. Used by `simple`
/// sequences (which never call it) and by tests exercising the scheduler in isolation.
pub struct NullBody;

#[async_trait]
impl Body for NullBody {
    async fn invoke(&self, verb: &str, _inputs: &HashMap<String, Value>) -> Result<Value, String> {
        Err(format!("NullBody cannot invoke '{verb}'"))
    }
}

/// A body that echoes its inputs back, useful for exercising `imperative`/`judgement`
/// dispatch without a real LLM/tool backend.
pub struct EchoBody;

#[async_trait]
impl Body for EchoBody {
    async fn invoke(&self, _verb: &str, inputs: &HashMap<String, Value>) -> Result<Value, String> {
        Ok(serde_json::to_value(inputs).unwrap_or(Value::Null))
    }
}
