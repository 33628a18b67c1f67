//! Integration tests for the stockaudit binary

use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const CSV_FIXTURE: &str = "tests/fixtures/movimentos.csv";
const JSON_FIXTURE: &str = "tests/fixtures/movimentos.json";

fn run_json(args: &[&str]) -> serde_json::Value {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("stockaudit");
    let output = cmd.args(args).output().unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_text_report_default() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("stockaudit");
    cmd.arg(CSV_FIXTURE);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("=== Stock Movement Anomaly Report ==="))
        .stdout(predicate::str::contains("Total records: 12"))
        .stdout(predicate::str::contains("Period: 02/01/2024 to 31/01/2024"))
        .stdout(predicate::str::contains("Flagged by IQR only:     1"))
        .stdout(predicate::str::contains("Seringa/Moema 500"))
        .stdout(predicate::str::contains("=== Financial Impact ==="));
}

#[test]
fn test_json_output_parses() {
    let parsed = run_json(&["--format", "json", CSV_FIXTURE]);

    assert_eq!(parsed["format"], "stockaudit-json-v1");
    assert_eq!(parsed["profile"]["total_records"], 12);
    assert_eq!(parsed["inconsistencies"]["missing_quantity"], 1);
    assert_eq!(parsed["inconsistencies"]["missing_owner"], 1);
    assert_eq!(parsed["inconsistencies"]["sign_mismatch"], 1);
    assert_eq!(parsed["detection"]["iqr_only"], 1);
    assert_eq!(parsed["detection"]["z_only"], 0);
    assert_eq!(parsed["detection"]["insufficient_baseline"], 1);
    assert_eq!(parsed["scores"].as_array().unwrap().len(), 12);
    assert!(parsed["baselines"]["Seringa/Moema"].is_object());
    assert!(parsed["impact"]["total_impact"].as_f64().unwrap() > 0.0);
}

#[test]
fn test_json_impact_categories_sum_to_total() {
    let parsed = run_json(&["--format", "json", CSV_FIXTURE]);
    let impact = &parsed["impact"];

    let sum: f64 = impact["categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["amount"].as_f64().unwrap())
        .sum();
    let total = impact["total_impact"].as_f64().unwrap();
    assert!((sum - total).abs() < 1e-6);
}

#[test]
fn test_csv_output_one_row_per_record() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("stockaudit");
    let output = cmd.args(["--format", "csv", CSV_FIXTURE]).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 13);
    assert!(lines[0].starts_with("index,data,unidade,material,tipo,quantidade"));
    assert!(lines[6].ends_with(",missing_quantity"));
    assert!(lines[12].ends_with(",insufficient_baseline"));
}

#[test]
fn test_json_input_detected_from_extension() {
    let parsed = run_json(&["--format", "json", JSON_FIXTURE]);
    assert_eq!(parsed["profile"]["total_records"], 4);
    assert_eq!(parsed["inconsistencies"]["missing_quantity"], 1);
}

#[test]
fn test_z_threshold_override() {
    // The 500-unit outflow sits about 1.79 sigma above its group mean
    let parsed = run_json(&["--format", "json", "--z-threshold", "1.5", CSV_FIXTURE]);
    assert_eq!(parsed["detection"]["both"], 1);
    assert_eq!(parsed["detection"]["iqr_only"], 0);
}

#[test]
fn test_config_file_overrides_indirect_costs() {
    let config = config_file(
        "[indirect_costs]\ncorrection_labor = 0.0\nprocedure_delays = 0.0\nemergency_purchases = 0.0\n",
    );
    let parsed = run_json(&[
        "--format",
        "json",
        "--config",
        config.path().to_str().unwrap(),
        CSV_FIXTURE,
    ]);
    assert_eq!(parsed["impact"]["indirect"]["total_indirect"], 0.0);
}

#[test]
fn test_validate_only() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("stockaudit");
    cmd.args(["--validate-only", CSV_FIXTURE]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("=== Data Quality ==="))
        .stdout(predicate::str::contains("Missing quantity:        1"))
        .stdout(predicate::str::contains("Operation/sign mismatch: 1"))
        .stdout(predicate::str::contains("Outlier Detection").not());
}

#[test]
fn test_validate_only_json() {
    let parsed = run_json(&["--validate-only", "--format", "json", CSV_FIXTURE]);
    assert_eq!(parsed["total_records"], 12);
    assert_eq!(parsed["issues"].as_array().unwrap().len(), 3);
}

#[test]
fn test_invalid_config_fails() {
    let config = config_file("z_threshold = -1.0\n");
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("stockaudit");
    cmd.args(["--config", config.path().to_str().unwrap(), CSV_FIXTURE]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("z_threshold"));
}

#[test]
fn test_invalid_threshold_override_fails() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("stockaudit");
    cmd.args(["--z-threshold", "0", CSV_FIXTURE]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
}

#[test]
fn test_iqr_multiplier_at_critical_fence_fails() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("stockaudit");
    cmd.args(["--iqr-multiplier", "3", CSV_FIXTURE]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("IQR multipliers must satisfy"));
}

#[test]
fn test_iqr_multiplier_with_raised_critical_fence() {
    let config = config_file("[severity]\niqr_critical = 4.0\n");
    let parsed = run_json(&[
        "--format",
        "json",
        "--config",
        config.path().to_str().unwrap(),
        "--iqr-multiplier",
        "3",
        CSV_FIXTURE,
    ]);
    assert_eq!(parsed["detection"]["iqr_only"], 1);
}

#[test]
fn test_help_documents_iqr_multiplier_range() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("stockaudit");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("iqr_critical"));
}

#[test]
fn test_partial_price_table_config() {
    let config = config_file("[prices]\nSeringa = 2.5\n");
    let parsed = run_json(&[
        "--format",
        "json",
        "--config",
        config.path().to_str().unwrap(),
        CSV_FIXTURE,
    ]);
    // only the Seringa records are valued: 542 units at 2.5
    assert_eq!(parsed["impact"]["total_value"], 1355.0);
}

#[test]
fn test_missing_input_file_fails() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("stockaudit");
    cmd.arg("tests/fixtures/does_not_exist.csv");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("failed to read records"));
}

#[test]
fn test_malformed_row_reports_line() {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "data,unidade,material,tipo,quantidade,responsavel").unwrap();
    writeln!(file, "2024-01-02,Moema,Seringa,saida,-10,Ana").unwrap();
    writeln!(file, "2024-01-03,Moema,Bisturi,saida,-10,Ana").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("stockaudit");
    cmd.arg(file.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("CSV line 3"));
}
