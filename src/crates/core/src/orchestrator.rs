//! The scheduling engine (§4.7): owns the Waitlist, Blackboard, ProcessTracker, and Workspace,
//! and runs the cycle loop described in §4.7.6.

use crate::blackboard::{Blackboard, ItemStatus};
use crate::body::{Body, NullBody};
use crate::concept::ConceptRepo;
use crate::control::RunControl;
use crate::error::Result;
use crate::events::{Event, EventSink};
use crate::inference::{InferenceEntry, InferenceRepo};
use crate::outcome::{Outcome, OutcomeStatus};
use crate::sequence;
use crate::tracker::{AttemptRecord, ProcessTracker};
use crate::waitlist::Waitlist;
use crate::workspace::Workspace;
use chrono::Utc;
use flowboard_checkpoint::{Checkpoint, CheckpointSaver, ConceptSnapshot, ItemSnapshot, TrackerSnapshot};
use serde_json::Value;
use std::sync::Arc;

/// Cadence at which checkpoints are taken (SPEC_FULL.md §9 "Open question — checkpoint
/// cadence").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckpointCadence {
    #[default]
    CycleBoundary,
    EveryInference,
}

pub struct OrchestratorConfig {
    pub max_cycles: u64,
    pub run_id: String,
    pub checkpoint_cadence: CheckpointCadence,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_cycles: 20,
            run_id: uuid::Uuid::new_v4().to_string(),
            checkpoint_cadence: CheckpointCadence::default(),
        }
    }
}

/// The outcome of a full run (§4.7.6's `return` statement, extended with run-level bookkeeping
/// for the CLI/server ambient stack).
pub struct RunReport {
    pub run_id: String,
    pub cycles_run: u64,
    pub deadlocked: bool,
    pub final_concepts: Vec<(String, Option<Value>)>,
    pub tracker: ProcessTracker,
    pub stopped: bool,
}

/// The opaque `item_result` payload for a dispatch (§3 "last observed outcome payload"):
/// the attempt's status, plus its error if any.
fn result_summary(status: OutcomeStatus, outcome: &Outcome) -> String {
    match &outcome.error {
        Some(error) => format!("{status:?}: {error}"),
        None => format!("{status:?}"),
    }
}

pub struct Orchestrator {
    concepts: ConceptRepo,
    inferences: InferenceRepo,
    blackboard: Blackboard,
    waitlist: Waitlist,
    tracker: ProcessTracker,
    workspace: Workspace,
    body: Arc<dyn Body>,
    events: EventSink,
    config: OrchestratorConfig,
    saver: Option<Arc<dyn CheckpointSaver>>,
    control: Option<Arc<RunControl>>,
}

impl Orchestrator {
    pub fn new(concepts: ConceptRepo, inferences: InferenceRepo, config: OrchestratorConfig) -> Self {
        Self::with_body(concepts, inferences, config, Arc::new(NullBody))
    }

    pub fn with_body(
        concepts: ConceptRepo,
        inferences: InferenceRepo,
        config: OrchestratorConfig,
        body: Arc<dyn Body>,
    ) -> Self {
        let waitlist = Waitlist::from_repo(&inferences);
        let mut orchestrator = Self {
            concepts,
            inferences,
            blackboard: Blackboard::new(),
            waitlist,
            tracker: ProcessTracker::new(),
            workspace: Workspace::new(),
            body,
            events: EventSink::detached(),
            config,
            saver: None,
            control: None,
        };
        orchestrator.initialize();
        orchestrator
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Attach a checkpoint backend; the run loop writes a snapshot per §4.8.1 at the cadence
    /// configured on `OrchestratorConfig` (§4.7.6, §6.4).
    pub fn with_saver(mut self, saver: Arc<dyn CheckpointSaver>) -> Self {
        self.saver = Some(saver);
        self
    }

    /// Attach a remote control handle (§6.3): the run loop consults it at every dispatch
    /// boundary for pause/step/stop/breakpoint requests and applied concept overrides.
    pub fn with_control(mut self, control: Arc<RunControl>) -> Self {
        self.control = Some(control);
        self
    }

    pub fn run_id(&self) -> &str {
        &self.config.run_id
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn concepts(&self) -> &ConceptRepo {
        &self.concepts
    }

    pub fn tracker(&self) -> &ProcessTracker {
        &self.tracker
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Replace tracker/workspace wholesale, as restored by `reconcile::apply` (§4.7.1 step 4).
    pub fn restore_tracker_and_workspace(&mut self, tracker: ProcessTracker, workspace: Workspace) {
        self.tracker = tracker;
        self.workspace = workspace;
    }

    pub fn concepts_mut(&mut self) -> &mut ConceptRepo {
        &mut self.concepts
    }

    pub fn blackboard_mut(&mut self) -> &mut Blackboard {
        &mut self.blackboard
    }

    /// Split borrow of concepts/blackboard for callers (e.g. `reconcile::apply`) that need
    /// both mutably at once.
    pub fn concepts_and_blackboard_mut(&mut self) -> (&mut ConceptRepo, &mut Blackboard) {
        (&mut self.concepts, &mut self.blackboard)
    }

    /// §4.7.1: set initial concept/item statuses and promote protected concepts.
    fn initialize(&mut self) {
        for concept in self.concepts.all() {
            if concept.is_ground_concept {
                self.blackboard.set_concept_complete(&concept.name, Utc::now());
            } else {
                self.blackboard.set_concept_empty(&concept.name);
            }
        }
        for item in self.waitlist.iter() {
            self.blackboard.set_item_status(item.flow_index.as_str(), ItemStatus::Pending);
        }
        for name in self.inferences.primitive_function_concepts() {
            self.blackboard.set_concept_complete(&name, Utc::now());
        }
    }

    /// §4.7.2.
    fn is_ready(&self, entry: &InferenceEntry) -> bool {
        if self.blackboard.item_status(entry.flow_index.as_str()) != ItemStatus::Pending {
            return false;
        }
        let execution_count = self.blackboard.execution_count(entry.flow_index.as_str());

        let function_ready = match &entry.function_concept {
            None => true,
            Some(name) => {
                self.blackboard.is_concept_complete(name)
                    || entry.start_without_function
                    || (entry.start_without_function_only_once && execution_count == 0)
            }
        };

        let value_ready = entry.start_without_value
            || (entry.start_without_value_only_once && execution_count == 0)
            || entry.value_concepts.iter().all(|v| self.blackboard.is_concept_complete(v));

        function_ready && value_ready
    }

    /// §4.7.3–§4.7.4: dispatch one item and apply post-dispatch rules.
    async fn dispatch(&mut self, flow_index: &str, cycle: u64) {
        let entry = self.inferences.get_by_flow_index(flow_index).expect("waitlist/repo mismatch").clone();
        self.blackboard.set_item_status(flow_index, ItemStatus::InProgress);
        self.blackboard.increment_execution_count(flow_index);

        self.events.emit(Event::InferenceStarted {
            flow_index: flow_index.to_string(),
            kind: format!("{:?}", entry.inference_sequence),
        });

        let outcome = sequence::invoke(&entry, &self.concepts, &self.blackboard, &mut self.workspace, self.body.as_ref()).await;

        self.apply_post_dispatch(&entry, outcome, cycle);
    }

    fn apply_post_dispatch(&mut self, entry: &InferenceEntry, outcome: Outcome, cycle: u64) {
        let flow_index = entry.flow_index.as_str();

        if matches!(entry.inference_sequence, crate::inference::SequenceKind::Timing) {
            let status = if outcome.timing_ready {
                self.blackboard.set_item_status(flow_index, ItemStatus::Completed);
                OutcomeStatus::Completed
            } else {
                self.blackboard.set_item_status(flow_index, ItemStatus::Pending);
                OutcomeStatus::PendingRetry
            };
            self.blackboard.set_result(flow_index, result_summary(status, &outcome));
            self.record_attempt(entry, status, cycle);
            return;
        }

        if matches!(entry.inference_sequence, crate::inference::SequenceKind::Quantifying) {
            let complete = outcome.quantifying_complete.unwrap_or(false);
            if !complete {
                self.reset_supporting_items(flow_index);
            }
            for (name, reference) in &outcome.updated_references {
                self.write_concept(name, reference.clone());
            }
            let status = if complete {
                if let Some(produced) = &outcome.produced_reference {
                    self.write_concept(&entry.concept_to_infer, produced.clone());
                }
                self.blackboard.set_item_status(flow_index, ItemStatus::Completed);
                OutcomeStatus::Completed
            } else {
                self.blackboard.set_item_status(flow_index, ItemStatus::Pending);
                OutcomeStatus::PendingRetry
            };
            self.blackboard.set_result(flow_index, result_summary(status, &outcome));
            self.record_attempt(entry, status, cycle);
            return;
        }

        let status = outcome.status.unwrap_or(OutcomeStatus::Failed);
        match status {
            OutcomeStatus::Completed => {
                if let Some(produced) = &outcome.produced_reference {
                    self.write_concept(&entry.concept_to_infer, produced.clone());
                }
                for (name, reference) in &outcome.updated_references {
                    self.write_concept(name, reference.clone());
                }
                self.blackboard.set_item_status(flow_index, ItemStatus::Completed);
                self.events.emit(Event::InferenceCompleted {
                    flow_index: flow_index.to_string(),
                    result_summary: entry.concept_to_infer.clone(),
                });
            }
            OutcomeStatus::PendingRetry => {
                self.blackboard.set_item_status(flow_index, ItemStatus::Pending);
            }
            OutcomeStatus::Failed | OutcomeStatus::NeedsUserInput => {
                self.blackboard.set_item_status(flow_index, ItemStatus::Failed);
                if let Some(error) = &outcome.error {
                    self.blackboard.set_error(flow_index, error.clone());
                    self.events.emit(Event::InferenceFailed {
                        flow_index: flow_index.to_string(),
                        error: error.clone(),
                    });
                }
            }
        }
        self.blackboard.set_result(flow_index, result_summary(status, &outcome));
        self.record_attempt(entry, status, cycle);
    }

    fn write_concept(&mut self, name: &str, reference: crate::reference::Reference) {
        if let Some(concept) = self.concepts.get_mut(name) {
            concept.reference = Some(reference);
        }
        self.blackboard.set_concept_complete(name, Utc::now());
    }

    fn record_attempt(&mut self, entry: &InferenceEntry, status: OutcomeStatus, cycle: u64) {
        self.tracker.record(AttemptRecord {
            cycle,
            flow_index: entry.flow_index.as_str().to_string(),
            sequence_kind: entry.inference_sequence,
            status,
            concept_to_infer: entry.concept_to_infer.clone(),
        });
    }

    /// §4.7.5.
    fn reset_supporting_items(&mut self, parent: &str) {
        let parent_index = crate::flow_index::FlowIndex::parse(parent).expect("valid flow index");
        let supporters: Vec<String> = self
            .waitlist
            .supporting_items(&parent_index)
            .iter()
            .map(|item| item.flow_index.as_str().to_string())
            .collect();

        for flow_index in supporters {
            self.blackboard.set_item_status(&flow_index, ItemStatus::Pending);
            if let Some(entry) = self.inferences.get_by_flow_index(&flow_index) {
                let concept_name = entry.concept_to_infer.clone();
                let is_ground = self.concepts.get(&concept_name).map(|c| c.is_ground_concept).unwrap_or(true);
                if !is_ground {
                    self.blackboard.set_concept_empty(&concept_name);
                    if let Some(concept) = self.concepts.get_mut(&concept_name) {
                        concept.reference = None;
                    }
                }
            }
        }
    }

    /// Build a checkpoint from the live state (§4.8.1). `inference_count` is the running total
    /// of dispatches so far, used alongside `run_id`/`cycle` as the storage key (§6.4).
    fn build_checkpoint(&self, cycle: u64, inference_count: u64) -> Checkpoint {
        let concepts = self
            .concepts
            .all()
            .map(|concept| {
                let status = match self.blackboard.concept_status(&concept.name) {
                    crate::blackboard::ConceptStatus::Empty => "empty",
                    crate::blackboard::ConceptStatus::Pending => "pending",
                    crate::blackboard::ConceptStatus::Complete => "complete",
                };
                ConceptSnapshot {
                    name: concept.name.clone(),
                    status: status.to_string(),
                    concept_type: serde_json::to_value(concept.concept_type)
                        .ok()
                        .and_then(|v| v.as_str().map(str::to_string))
                        .unwrap_or_default(),
                    reference_data: concept.reference.as_ref().map(|r| {
                        Value::Array(r.data.iter().map(|cell| cell.clone().unwrap_or(Value::Null)).collect())
                    }),
                    reference_axes: concept.reference.as_ref().map(|r| r.axes.clone()),
                    reference_shape: concept.reference.as_ref().map(|r| r.shape.clone()),
                    is_ground_concept: concept.is_ground_concept,
                    is_final_concept: concept.is_final_concept,
                }
            })
            .collect();

        let items = self
            .waitlist
            .iter()
            .map(|item| {
                let flow_index = item.flow_index.as_str();
                let status = match self.blackboard.item_status(flow_index) {
                    ItemStatus::Pending => "pending",
                    ItemStatus::InProgress => "in_progress",
                    ItemStatus::Completed => "completed",
                    ItemStatus::Failed => "failed",
                };
                ItemSnapshot {
                    flow_index: flow_index.to_string(),
                    status: status.to_string(),
                    execution_count: self.blackboard.execution_count(flow_index),
                    result: self.blackboard.result(flow_index).map(str::to_string),
                }
            })
            .collect();

        let tracker = TrackerSnapshot {
            cycle_count: self.tracker.cycle_count,
            total_executions: self.tracker.total_executions,
            successful_executions: self.tracker.successful_executions,
            retry_count: self.tracker.retry_count,
            completion_order: self.tracker.completion_order.clone(),
            execution_history: serde_json::to_value(self.tracker.truncated_history(256)).unwrap_or(Value::Null),
        };

        Checkpoint {
            run_id: self.config.run_id.clone(),
            cycle,
            inference_count,
            at: Utc::now(),
            concepts,
            items,
            tracker,
            workspace: self.workspace.to_value(),
        }
    }

    /// Persist a checkpoint if a saver is attached, logging (but not failing the run on) a
    /// storage error — per §7 item 8, checkpoint-store trouble is recoverable, not fatal to the
    /// orchestrator's in-memory progress.
    async fn checkpoint_now(&self, cycle: u64) {
        let Some(saver) = &self.saver else { return };
        let checkpoint = self.build_checkpoint(cycle, self.tracker.total_executions);
        if let Err(error) = saver.put(checkpoint).await {
            tracing::warn!(%error, run_id = %self.config.run_id, "checkpoint write failed");
        }
    }

    /// Apply any concept overrides queued by the server's `POST .../override/{concept_name}`
    /// endpoint (§6.3). `rerun_dependents` resets the immediate consumers of the overridden
    /// concept back to `pending` so the next cycle recomputes them; it does not cascade
    /// transitively (see DESIGN.md for the rationale).
    fn apply_pending_overrides(&mut self) {
        let Some(control) = self.control.clone() else { return };
        for ov in control.drain_overrides() {
            let reference = crate::reference::Reference::from_json(ov.new_value, None);
            self.write_concept(&ov.concept_name, reference);
            if ov.rerun_dependents {
                let dependents: Vec<String> = self
                    .inferences
                    .all()
                    .filter(|entry| {
                        entry.value_concepts.contains(&ov.concept_name)
                            || entry.context_concepts.contains(&ov.concept_name)
                            || entry.function_concept.as_deref() == Some(ov.concept_name.as_str())
                    })
                    .map(|entry| entry.flow_index.as_str().to_string())
                    .collect();
                for flow_index in dependents {
                    self.blackboard.set_item_status(&flow_index, ItemStatus::Pending);
                }
            }
        }
    }

    fn all_items_completed(&self) -> bool {
        self.blackboard
            .all_items_completed(self.waitlist.iter().map(|item| item.flow_index.as_str()))
    }

    /// §4.7.6.
    pub async fn run(mut self) -> Result<RunReport> {
        self.events.emit(Event::RunStarted { run_id: self.config.run_id.clone(), plan_id: None, at: Utc::now() });

        let mut retries: Vec<String> = Vec::new();
        let mut cycle_count: u64 = 0;
        let mut deadlocked = false;
        let mut stopped = false;

        'cycles: while !self.all_items_completed() && cycle_count < self.config.max_cycles {
            cycle_count += 1;
            self.tracker.begin_cycle(cycle_count);
            self.events.emit(Event::CycleStarted { cycle: cycle_count });
            self.apply_pending_overrides();

            let mut this_cycle: Vec<String> = retries.drain(..).collect();
            for item in self.waitlist.iter() {
                let flow_index = item.flow_index.as_str().to_string();
                if !this_cycle.contains(&flow_index) {
                    this_cycle.push(flow_index);
                }
            }

            let mut progress = false;
            for flow_index in &this_cycle {
                if let Some(control) = self.control.clone() {
                    if control.has_breakpoint(flow_index) && self.blackboard.item_status(flow_index) == ItemStatus::Pending {
                        control.pause();
                        self.events.emit(Event::BreakpointHit { flow_index: flow_index.clone() });
                    }
                    control.wait_if_paused().await;
                    if control.is_stopped() {
                        stopped = true;
                        break 'cycles;
                    }
                }

                let entry = match self.inferences.get_by_flow_index(flow_index) {
                    Some(e) => e.clone(),
                    None => continue,
                };
                if self.blackboard.item_status(flow_index) == ItemStatus::Pending && self.is_ready(&entry) {
                    progress = true;
                    self.dispatch(flow_index, cycle_count).await;
                    if self.blackboard.item_status(flow_index) == ItemStatus::Pending {
                        retries.push(flow_index.clone());
                    }
                    if self.config.checkpoint_cadence == CheckpointCadence::EveryInference {
                        self.checkpoint_now(cycle_count).await;
                    }
                }
            }

            if self.config.checkpoint_cadence == CheckpointCadence::CycleBoundary {
                self.checkpoint_now(cycle_count).await;
            }

            let completed = self
                .waitlist
                .iter()
                .filter(|i| self.blackboard.is_complete(i.flow_index.as_str()))
                .count() as u64;
            self.events.emit(Event::ExecutionProgress {
                completed,
                total: self.waitlist.len() as u64,
                cycle: cycle_count,
            });

            if !progress {
                deadlocked = true;
                break;
            }
        }

        let final_concepts: Vec<(String, Option<Value>)> = self
            .concepts
            .final_concepts()
            .into_iter()
            .map(|c| (c.name.clone(), c.reference.as_ref().map(|r| Value::Array(r.leaves()))))
            .collect();

        if stopped {
            self.events.emit(Event::ExecutionStopped { run_id: self.config.run_id.clone() });
        } else if deadlocked {
            self.events.emit(Event::RunFailed {
                run_id: self.config.run_id.clone(),
                error: "deadlock: no progress in last cycle".to_string(),
            });
        } else {
            self.events.emit(Event::RunCompleted {
                run_id: self.config.run_id.clone(),
                final_concepts_summary: Value::Array(
                    final_concepts.iter().map(|(n, _)| Value::String(n.clone())).collect(),
                ),
            });
        }

        Ok(RunReport {
            run_id: self.config.run_id.clone(),
            cycles_run: cycle_count,
            deadlocked,
            final_concepts,
            tracker: self.tracker,
            stopped,
        })
    }
}

