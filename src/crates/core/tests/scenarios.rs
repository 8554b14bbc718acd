use flowboard_core::{
    ConceptRecord, ConceptRepo, ConceptType, FlowInfo, InferenceRecord, InferenceRepo,
    OrchestratorConfig, SequenceKind,
};
use flowboard_core::orchestrator::Orchestrator;
use serde_json::{json, Value};

fn concept(name: &str, concept_type: ConceptType, ground: bool, final_: bool, data: Option<Value>) -> ConceptRecord {
    ConceptRecord {
        id: name.to_string(),
        concept_name: name.to_string(),
        concept_type,
        axis_name: None,
        description: None,
        reference_data: data,
        reference_axis_names: None,
        is_ground_concept: ground,
        is_final_concept: final_,
        is_invariant: false,
    }
}

fn simple_inference(flow_index: &str, concept_to_infer: &str, value_concepts: Vec<&str>) -> InferenceRecord {
    InferenceRecord {
        id: flow_index.to_string(),
        inference_sequence: SequenceKind::Simple,
        concept_to_infer: concept_to_infer.to_string(),
        function_concept: None,
        value_concepts: value_concepts.into_iter().map(String::from).collect(),
        context_concepts: vec![],
        flow_info: FlowInfo { flow_index: flow_index.to_string(), support: vec![], target: vec![] },
        start_without_value: false,
        start_without_value_only_once: false,
        start_without_function: false,
        start_without_function_only_once: false,
        working_interpretation: Value::Null,
    }
}

/// Scenario A (§8.4): sequential pipeline `a -> b -> c`, flow-indexed with the consumer ahead
/// of its producer so the scheduler must carry the dependency into a second cycle.
#[tokio::test]
async fn scenario_a_sequential_pipeline_completes_in_two_cycles() {
    let concepts = ConceptRepo::from_records(vec![
        concept("a", ConceptType::Object, true, false, Some(json!([1, 2, 3]))),
        concept("b", ConceptType::Object, false, false, None),
        concept("c", ConceptType::Object, false, true, None),
    ])
    .unwrap();
    let inferences = InferenceRepo::from_records(
        vec![simple_inference("1", "c", vec!["b"]), simple_inference("2", "b", vec!["a"])],
        &concepts,
    )
    .unwrap();

    let orchestrator = Orchestrator::new(concepts, inferences, OrchestratorConfig::default());
    let report = orchestrator.run().await.unwrap();

    assert!(!report.deadlocked);
    assert_eq!(report.cycles_run, 2);
    assert_eq!(report.final_concepts.len(), 1);
    assert_eq!(report.final_concepts[0].0, "c");
    assert!(report.final_concepts[0].1.is_some());
}

/// Scenario D (§8.4): first dispatch `pending_retry`, second `completed`.
#[tokio::test]
async fn scenario_d_retry_then_success_tracks_counts() {
    use async_trait::async_trait;
    use flowboard_core::Body;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FlakyOnceBody(AtomicUsize);

    #[async_trait]
    impl Body for FlakyOnceBody {
        async fn invoke(&self, _verb: &str, _inputs: &HashMap<String, Value>) -> Result<Value, String> {
            if self.0.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("transient".to_string())
            } else {
                Ok(json!("ok"))
            }
        }
    }

    let concepts = ConceptRepo::from_records(vec![
        concept("a", ConceptType::Object, true, false, Some(json!(1))),
        concept("b", ConceptType::Function, false, true, None),
    ])
    .unwrap();

    let mut record = simple_inference("1", "b", vec!["a"]);
    record.inference_sequence = SequenceKind::Imperative;
    let inferences = InferenceRepo::from_records(vec![record], &concepts).unwrap();

    let orchestrator = Orchestrator::with_body(
        concepts,
        inferences,
        OrchestratorConfig::default(),
        Arc::new(FlakyOnceBody(AtomicUsize::new(0))),
    );
    let report = orchestrator.run().await.unwrap();

    assert!(!report.deadlocked);
    assert_eq!(report.tracker.retry_count, 1);
    assert_eq!(report.tracker.successful_executions, 1);
    assert_eq!(report.tracker.total_executions, 2);
}

/// Scenario E (§8.4): two items each depending on the other's output concept deadlock on cycle 1.
#[tokio::test]
async fn scenario_e_mutual_dependency_deadlocks() {
    let concepts = ConceptRepo::from_records(vec![
        concept("x", ConceptType::Object, false, true, None),
        concept("y", ConceptType::Object, false, true, None),
    ])
    .unwrap();
    let inferences = InferenceRepo::from_records(
        vec![simple_inference("1", "x", vec!["y"]), simple_inference("2", "y", vec!["x"])],
        &concepts,
    )
    .unwrap();

    let orchestrator = Orchestrator::new(concepts, inferences, OrchestratorConfig::default());
    let report = orchestrator.run().await.unwrap();

    assert!(report.deadlocked);
    assert_eq!(report.cycles_run, 1);
    assert!(report.final_concepts.iter().all(|(_, v)| v.is_none()));
}

/// Scenario C (§8.4): a quantifying loop over a 3-element base concept, with a supporting
/// imperative item producing one value per iteration. Each non-completing poll must reset the
/// supporter and retry, not record as a success.
#[tokio::test]
async fn scenario_c_quantifying_loop_processes_three_elements() {
    use async_trait::async_trait;
    use flowboard_core::{Body, OutcomeStatus};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct SequentialDigits(AtomicUsize);

    #[async_trait]
    impl Body for SequentialDigits {
        async fn invoke(&self, _verb: &str, _inputs: &HashMap<String, Value>) -> Result<Value, String> {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            Ok(json!((n as i64 + 1) * 10))
        }
    }

    let concepts = ConceptRepo::from_records(vec![
        concept("seq", ConceptType::Object, true, false, Some(json!(["A", "B", "C"]))),
        concept("digit", ConceptType::Object, false, false, None),
        concept("seq_out", ConceptType::Object, false, true, None),
    ])
    .unwrap();

    let quantifying = InferenceRecord {
        id: "1".into(),
        inference_sequence: SequenceKind::Quantifying,
        concept_to_infer: "seq_out".into(),
        function_concept: None,
        value_concepts: vec!["seq".into()],
        context_concepts: vec!["digit".into()],
        flow_info: FlowInfo { flow_index: "1".into(), support: vec![], target: vec![] },
        start_without_value: false,
        start_without_value_only_once: false,
        start_without_function: false,
        start_without_function_only_once: false,
        working_interpretation: Value::Null,
    };
    let mut digit_producer = simple_inference("1.1", "digit", vec![]);
    digit_producer.inference_sequence = SequenceKind::Imperative;
    digit_producer.start_without_value = true;

    let inferences = InferenceRepo::from_records(vec![quantifying, digit_producer], &concepts).unwrap();

    let orchestrator = Orchestrator::with_body(
        concepts,
        inferences,
        OrchestratorConfig::default(),
        Arc::new(SequentialDigits(AtomicUsize::new(0))),
    );
    let report = orchestrator.run().await.unwrap();

    assert!(!report.deadlocked);
    assert_eq!(report.cycles_run, 4);
    assert_eq!(report.final_concepts.len(), 1);
    assert_eq!(report.final_concepts[0].0, "seq_out");
    assert_eq!(report.final_concepts[0].1, Some(json!([[10], [20], [30]])));

    let digit_attempts: Vec<_> =
        report.tracker.execution_history.iter().filter(|a| a.flow_index == "1.1").collect();
    assert_eq!(digit_attempts.len(), 3);
    assert!(digit_attempts.iter().all(|a| a.status == OutcomeStatus::Completed));

    let loop_attempts: Vec<_> =
        report.tracker.execution_history.iter().filter(|a| a.flow_index == "1").collect();
    assert_eq!(loop_attempts.len(), 4);
    assert_eq!(loop_attempts.iter().filter(|a| a.status == OutcomeStatus::Completed).count(), 1);
    assert_eq!(loop_attempts.iter().filter(|a| a.status == OutcomeStatus::PendingRetry).count(), 3);

    // Only the 3 digit completions plus the single loop completion count as successes, not
    // every non-completing poll of the loop item.
    assert_eq!(report.tracker.successful_executions, 4);
    assert_eq!(report.tracker.completion_order.len(), 4);
}

/// Scenario F (§8.4): run a pipeline to completion while checkpointing every cycle, then fork
/// from the cycle-1 checkpoint with a concept recomputed under different logic. The carried-over
/// concept must come back unchanged and the original run's checkpoints must be untouched.
#[tokio::test]
async fn scenario_f_checkpoint_then_fork_recomputes_one_concept() {
    use async_trait::async_trait;
    use flowboard_core::{Body, CheckpointCadence};
    use flowboard_checkpoint::{CheckpointSaver, MemoryCheckpointSaver, ReconcileMode};
    use std::collections::HashMap;
    use std::sync::Arc;

    struct DoublingBody;

    #[async_trait]
    impl Body for DoublingBody {
        async fn invoke(&self, _verb: &str, inputs: &HashMap<String, Value>) -> Result<Value, String> {
            let items = inputs.get("b").and_then(Value::as_array).cloned().unwrap_or_default();
            Ok(Value::Array(items.iter().map(|v| json!(v.as_i64().unwrap_or(0) * 2)).collect()))
        }
    }

    let saver = MemoryCheckpointSaver::new();

    let concepts = ConceptRepo::from_records(vec![
        concept("a", ConceptType::Object, true, false, Some(json!([1, 2, 3]))),
        concept("b", ConceptType::Object, false, false, None),
        concept("c", ConceptType::Object, false, true, None),
    ])
    .unwrap();
    let inferences = InferenceRepo::from_records(
        vec![simple_inference("1", "c", vec!["b"]), simple_inference("2", "b", vec!["a"])],
        &concepts,
    )
    .unwrap();
    let orig_config = OrchestratorConfig {
        run_id: "orig".to_string(),
        checkpoint_cadence: CheckpointCadence::CycleBoundary,
        ..OrchestratorConfig::default()
    };
    let orig_orchestrator =
        Orchestrator::new(concepts, inferences, orig_config).with_saver(Arc::new(saver.clone()));
    let orig_report = orig_orchestrator.run().await.unwrap();

    assert!(!orig_report.deadlocked);
    assert_eq!(orig_report.cycles_run, 2);
    assert_eq!(orig_report.final_concepts[0].1, Some(json!([1, 2, 3])));

    let orig_checkpoints = saver.list_checkpoints("orig").await.unwrap();
    let checkpoint_cycle1 = orig_checkpoints.iter().find(|c| c.cycle == 1).unwrap().clone();
    let b_snapshot = checkpoint_cycle1.concepts.iter().find(|s| s.name == "b").unwrap();
    assert!(b_snapshot.reference_data.is_some());
    let c_snapshot = checkpoint_cycle1.concepts.iter().find(|s| s.name == "c").unwrap();
    assert!(c_snapshot.reference_data.is_none());

    let fork_concepts = ConceptRepo::from_records(vec![
        concept("a", ConceptType::Object, true, false, Some(json!([1, 2, 3]))),
        concept("b", ConceptType::Object, false, false, None),
        concept("c", ConceptType::Object, false, true, None),
    ])
    .unwrap();
    let mut c_entry = simple_inference("1", "c", vec!["b"]);
    c_entry.inference_sequence = SequenceKind::Imperative;
    let fork_inferences = InferenceRepo::from_records(
        vec![c_entry, simple_inference("2", "b", vec!["a"])],
        &fork_concepts,
    )
    .unwrap();
    let fork_config = OrchestratorConfig {
        run_id: "fork".to_string(),
        checkpoint_cadence: CheckpointCadence::CycleBoundary,
        ..OrchestratorConfig::default()
    };
    let mut fork_orchestrator = Orchestrator::with_body(
        fork_concepts,
        fork_inferences,
        fork_config,
        Arc::new(DoublingBody),
    )
    .with_saver(Arc::new(saver.clone()));
    let (tracker, workspace) = {
        let (concepts, blackboard) = fork_orchestrator.concepts_and_blackboard_mut();
        flowboard_core::reconcile::apply(&checkpoint_cycle1, ReconcileMode::Overwrite, concepts, blackboard)
    };
    fork_orchestrator.restore_tracker_and_workspace(tracker, workspace);

    assert_eq!(
        fork_orchestrator.concepts().get("b").unwrap().reference.as_ref().unwrap().leaves(),
        vec![json!(1), json!(2), json!(3)]
    );

    let fork_report = fork_orchestrator.run().await.unwrap();

    assert!(!fork_report.deadlocked);
    assert_eq!(fork_report.cycles_run, 1);
    assert_eq!(fork_report.final_concepts[0].0, "c");
    assert_eq!(fork_report.final_concepts[0].1, Some(json!([2, 4, 6])));

    let orig_checkpoints_after = saver.list_checkpoints("orig").await.unwrap();
    assert_eq!(orig_checkpoints_after.len(), orig_checkpoints.len());
    assert_eq!(saver.latest("orig").await.unwrap().unwrap().cycle, 2);
}

/// §8.3 boundary: zero inferences terminate immediately with no cycles.
#[tokio::test]
async fn zero_items_terminate_with_no_cycles() {
    let concepts = ConceptRepo::from_records(vec![concept("a", ConceptType::Object, true, true, Some(json!(1)))]).unwrap();
    let inferences = InferenceRepo::from_records(vec![], &concepts).unwrap();

    let orchestrator = Orchestrator::new(concepts, inferences, OrchestratorConfig::default());
    let report = orchestrator.run().await.unwrap();

    assert!(!report.deadlocked);
    assert_eq!(report.cycles_run, 0);
}

/// §8.3 boundary: `max_cycles = 1` against a pipeline needing two cycles leaves work unfinished.
#[tokio::test]
async fn max_cycles_one_leaves_pipeline_unfinished() {
    let concepts = ConceptRepo::from_records(vec![
        concept("a", ConceptType::Object, true, false, Some(json!(1))),
        concept("b", ConceptType::Object, false, false, None),
        concept("c", ConceptType::Object, false, true, None),
    ])
    .unwrap();
    let inferences = InferenceRepo::from_records(
        vec![simple_inference("1", "c", vec!["b"]), simple_inference("2", "b", vec!["a"])],
        &concepts,
    )
    .unwrap();

    let config = OrchestratorConfig { max_cycles: 1, ..OrchestratorConfig::default() };
    let orchestrator = Orchestrator::new(concepts, inferences, config);
    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.cycles_run, 1);
    assert!(report.final_concepts[0].1.is_none());
}
