use std::io::Write;
use std::process::Command;

fn write_json(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

fn binary() -> &'static str {
    env!("CARGO_BIN_EXE_flowboard")
}

#[test]
fn missing_required_flag_exits_with_code_two() {
    let output = Command::new(binary()).args(["run", "--concepts", "concepts.json"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn run_against_a_minimal_repository_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let concepts = write_json(
        &dir,
        "concepts.json",
        r#"[
            {"id": "1", "concept_name": "a", "type": "{}", "reference_data": [1, 2, 3], "is_ground_concept": true},
            {"id": "2", "concept_name": "b", "type": "{}", "is_final_concept": true}
        ]"#,
    );
    let inferences = write_json(
        &dir,
        "inferences.json",
        r#"[
            {"id": "1", "inference_sequence": "simple", "concept_to_infer": "b",
             "value_concepts": ["a"], "flow_info": {"flow_index": "1"}}
        ]"#,
    );

    let output = Command::new(binary())
        .args(["run", "--concepts", concepts.to_str().unwrap(), "--inferences", inferences.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
}
