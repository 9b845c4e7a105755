//! CLI integration tests
//!
//! Local commands run against the sample artifacts in `artifacts/`.

use std::path::PathBuf;
use std::process::{Command, Output};

fn artifacts_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../artifacts")
}

fn netclass(args: &[&str]) -> Output {
    let dir = artifacts_dir();
    Command::new(env!("CARGO_BIN_EXE_netclass"))
        .args(args)
        .env("NO_COLOR", "1")
        .env("NETCLASS_CONFIG", dir.join("no-such-config.json"))
        .env("NETCLASS_SCHEMA_PATH", dir.join("encoded_columns.txt"))
        .env("NETCLASS_MODEL_DIR", dir.join("models"))
        .env_remove("NETCLASS_API_URL")
        .output()
        .expect("Failed to execute command")
}

const EXAMPLE: [&str; 20] = [
    "--duration",
    "0",
    "--src-bytes",
    "181",
    "--dst-bytes",
    "5450",
    "--logged-in",
    "1",
    "--wrong-fragment",
    "0",
    "--same-srv-rate",
    "1.0",
    "--srv-count",
    "8",
    "--protocol-type",
    "tcp",
    "--service",
    "http",
    "--flag",
    "SF",
];

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = netclass(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Network Connection Classifier"),
        "Should show app name"
    );
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("classify"), "Should show classify command");
    assert!(stdout.contains("inspect"), "Should show inspect command");
    assert!(stdout.contains("status"), "Should show status command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = netclass(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("netclass"), "Should show binary name");
}

/// Test predict help lists every field
#[test]
fn test_predict_help() {
    let output = netclass(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Predict help should succeed");
    for flag in ["--duration", "--same-srv-rate", "--protocol-type", "--flag", "--input"] {
        assert!(stdout.contains(flag), "Should show {} option", flag);
    }
}

/// Test local classification of the example record
#[test]
fn test_classify_local_json() {
    let mut args = vec!["--format", "json", "classify"];
    args.extend(EXAMPLE);
    let output = netclass(&args);

    assert!(
        output.status.success(),
        "Classify should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["predictions"]["logistic_regression"], "normal");
    assert_eq!(body["predictions"]["random_forest"], "normal");
    assert_eq!(body["predictions"]["svm"], "normal");
    assert_eq!(body["majority"], "normal");
}

/// Test local classification renders a table
#[test]
fn test_classify_local_table() {
    let mut args = vec!["classify"];
    args.extend(EXAMPLE);
    let output = netclass(&args);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("Model"));
    assert!(stdout.contains("Majority: normal"));
}

/// Test a malformed number names the field and fails
#[test]
fn test_classify_invalid_number_fails() {
    let mut args = vec!["classify"];
    args.extend(EXAMPLE);
    args[2] = "abc";
    let output = netclass(&args);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Invalid input should fail");
    assert!(stderr.contains("duration"), "Should name the field: {}", stderr);
}

/// Test a missing field names the field and fails
#[test]
fn test_classify_missing_field_fails() {
    let mut args = vec!["classify"];
    args.extend(&EXAMPLE[..18]);
    let output = netclass(&args);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("flag"), "Should name the field: {}", stderr);
}

/// Test inspection of the sample artifacts
#[test]
fn test_inspect_json() {
    let output = netclass(&["--format", "json", "inspect"]);

    assert!(
        output.status.success(),
        "Inspect should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["schema_columns"], 26);

    let artifacts = report["artifacts"].as_array().unwrap();
    let names: Vec<&str> = artifacts
        .iter()
        .map(|a| a["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["scaler", "logistic_regression", "random_forest", "svm"]);
    assert_eq!(artifacts[2]["input"], "unscaled");
    assert_eq!(artifacts[3]["sha256"].as_str().unwrap().len(), 64);

    let categories = &report["categories"];
    assert_eq!(categories["protocol_type"], serde_json::json!(["tcp", "udp"]));
    let services: Vec<&str> = categories["service"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap())
        .collect();
    assert!(services.contains(&"http"));
    assert!(!services.contains(&"icmp"));
    assert_eq!(categories["flag"].as_array().unwrap().len(), 7);
}

/// Test inspection lists the encoded categories per field
#[test]
fn test_inspect_table_lists_categories() {
    let output = netclass(&["inspect"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("protocol_type"), "Should list the field: {}", stdout);
    assert!(stdout.contains("tcp, udp"), "Should list the categories: {}", stdout);
}

/// Test inspection fails for a missing model directory
#[test]
fn test_inspect_missing_artifacts_fails() {
    let output = netclass(&["inspect", "--model-dir", "/nonexistent/models"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("scaler.json"), "Should name the artifact: {}", stderr);
}
