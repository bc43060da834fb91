//! CLI integration tests

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

const DATASET: &str = r#"{
  "lastUpdated": "2024-05-01T06:00:00Z",
  "data": [
    {"id": "lambda-h100", "provider": "Lambda Labs", "instanceName": "gpu_1x_h100_pcie",
     "model": "H100", "gpuCount": 1, "vram": 80, "cpu": 26, "ram": 200, "pricePerHour": 2.49,
     "region": "us-east-1", "commitment": "On-Demand", "availability": "High",
     "link": "https://lambdalabs.com/service/gpu-cloud", "lastUpdated": "2024-05-01T06:00:00Z"},
    {"id": "vast-4090", "provider": "Vast.ai", "instanceName": "1x RTX 4090",
     "model": "RTX 4090", "gpuCount": 1, "vram": 24, "cpu": 16, "ram": 64, "pricePerHour": 0.34,
     "region": "EU", "commitment": "Spot", "availability": "High",
     "link": "https://vast.ai", "lastUpdated": "2024-05-01T06:00:00Z"},
    {"id": "runpod-a100", "provider": "RunPod", "instanceName": "8x A100 SXM",
     "model": "A100 80GB", "gpuCount": 8, "vram": 80, "cpu": 128, "ram": 1024, "pricePerHour": 13.12,
     "region": "US", "commitment": "On-Demand", "availability": "Medium",
     "link": "https://runpod.io", "lastUpdated": "2024-05-01T06:00:00Z"},
    {"id": "broken", "provider": "Nowhere", "model": "H100", "gpuCount": 0, "vram": 80,
     "pricePerHour": 1.0, "region": "US", "commitment": "On-Demand", "availability": "High",
     "link": "", "lastUpdated": "2024-05-01T06:00:00Z"}
  ]
}"#;

const HISTORY: &str = r#"{
  "generated": "2024-05-01T06:00:00Z",
  "snapshots": [
    {"date": "2024-04-29", "models": {"H100": {"min": 2.99, "avg": 3.40, "p25": 3.0, "p75": 3.8, "count": 12}}},
    {"date": "2024-04-30", "models": {"H100": {"min": 2.79, "avg": 3.20, "p25": 2.9, "p75": 3.6, "count": 12}}},
    {"date": "2024-05-01", "models": {"H100": {"min": 2.49, "avg": 3.05, "p25": 2.8, "p75": 3.4, "count": 13}}}
  ]
}"#;

struct Fixture {
    dir: TempDir,
    data: PathBuf,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data = dir.path().join("gpu-data.json");
    std::fs::write(&data, DATASET).expect("Failed to write dataset");
    std::fs::write(dir.path().join("price-history.json"), HISTORY).expect("Failed to write history");
    Fixture { dir, data }
}

/// Run `gput` with an isolated home directory and no colors
fn gput(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gput"))
        .args(args)
        .env("HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("GPUT_DATA_URL")
        .env_remove("GPUT_API_URL")
        .env_remove("GPUT_HISTORY_URL")
        .output()
        .expect("Failed to execute command")
}

/// Run `gput` with `input` piped to stdin, then closed
fn gput_with_input(home: &Path, args: &[&str], input: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_gput"))
        .args(args)
        .env("HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("GPUT_DATA_URL")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute command");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(input.as_bytes())
        .expect("Failed to write stdin");
    child.wait_with_output().expect("Failed to wait for command")
}

fn json_of(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let home = tempfile::tempdir().unwrap();
    let output = gput(home.path(), &["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("GPU Tracker"), "Should show app name");
    for command in ["offers", "tmc", "share", "trend", "alerts"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let home = tempfile::tempdir().unwrap();
    let output = gput(home.path(), &["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("gput"), "Should show binary name");
}

/// Test offers list subcommand help
#[test]
fn test_offers_list_help() {
    let home = tempfile::tempdir().unwrap();
    let output = gput(home.path(), &["offers", "list", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    for flag in ["--sort", "--desc", "--rank", "--page", "--preset", "--share", "--from-share"] {
        assert!(stdout.contains(flag), "Should show {} option", flag);
    }
}

#[test]
fn test_offers_list_json_sorted_by_price() {
    let fx = fixture();
    let output = gput(
        fx.dir.path(),
        &["--data", fx.data.to_str().unwrap(), "--format", "json", "offers", "list"],
    );
    let body = json_of(&output);

    // The record with gpuCount 0 is dropped at load time
    assert_eq!(body["total"], 3);
    assert_eq!(body["page"], 1);
    assert_eq!(body["pageCount"], 1);
    let ids: Vec<&str> = body["offers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["vast-4090", "lambda-h100", "runpod-a100"]);
}

#[test]
fn test_offers_list_filters_and_share_roundtrip() {
    let fx = fixture();
    let data = fx.data.to_str().unwrap();

    let output = gput(
        fx.dir.path(),
        &[
            "--data", data, "--format", "json", "offers", "list", "--min-vram", "48",
            "--commitment", "on-demand", "--share",
        ],
    );
    let body = json_of(&output);
    assert_eq!(body["total"], 2);
    let share = body["share"].as_str().unwrap().to_string();
    assert!(share.starts_with("#q="));

    let output = gput(
        fx.dir.path(),
        &["--data", data, "--format", "json", "offers", "list", "--from-share", &share],
    );
    assert_eq!(json_of(&output)["total"], 2);

    let output = gput(fx.dir.path(), &["--format", "json", "share", "decode", &share]);
    let spec = json_of(&output);
    assert_eq!(spec["minVram"], 48.0);
    assert_eq!(spec["commitment"][0], "On-Demand");
}

#[test]
fn test_offers_list_budget_preset() {
    let fx = fixture();
    let output = gput(
        fx.dir.path(),
        &[
            "--data", fx.data.to_str().unwrap(), "--format", "json", "offers", "list",
            "--preset", "budget",
        ],
    );
    let body = json_of(&output);
    assert_eq!(body["total"], 1);
    assert_eq!(body["offers"][0]["id"], "vast-4090");
}

#[test]
fn test_offers_list_table() {
    let fx = fixture();
    let output = gput(
        fx.dir.path(),
        &["--data", fx.data.to_str().unwrap(), "offers", "list", "--provider", "RunPod"],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("1 offers matched"));
    assert!(stdout.contains("8x80GB"));
    assert!(stdout.contains("$13.1200"));
}

#[test]
fn test_offers_list_inference_estimates() {
    let fx = fixture();
    let data = fx.data.to_str().unwrap();

    let output = gput(
        fx.dir.path(),
        &["--data", data, "--format", "json", "offers", "list", "--params", "70"],
    );
    let body = json_of(&output);
    let by_id = |id: &str| {
        body["offers"]
            .as_array()
            .unwrap()
            .iter()
            .find(|o| o["id"] == id)
            .unwrap()["inference"]
            .clone()
    };

    let h100 = by_id("lambda-h100");
    assert_eq!(h100["paramsB"], 70.0);
    assert_eq!(h100["vramRequiredGb"], 140.0);
    assert_eq!(h100["fitsInVram"], false);
    assert!(h100["tokensPerSec"].as_f64().unwrap() > 0.0);
    assert!(h100["costPerMillionTokens"].as_f64().unwrap() > 0.0);
    assert_eq!(by_id("runpod-a100")["fitsInVram"], true);

    let plain = json_of(&gput(
        fx.dir.path(),
        &["--data", data, "--format", "json", "offers", "list"],
    ));
    assert!(plain["offers"][0].get("inference").is_none());
}

#[test]
fn test_offers_list_inference_table() {
    let fx = fixture();
    let output = gput(
        fx.dir.path(),
        &[
            "--data", fx.data.to_str().unwrap(), "offers", "list", "--provider", "RunPod",
            "--params", "70",
        ],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("Inference estimate: 70B parameters, FP16"));
    assert!(stdout.contains("Tokens/s"));
    assert!(stdout.contains("yes"));
}

#[test]
fn test_offers_search_reads_queries_from_stdin() {
    let fx = fixture();
    let output = gput_with_input(
        fx.dir.path(),
        &["--data", fx.data.to_str().unwrap(), "--format", "json", "offers", "search"],
        "h\nh1\nh100\n",
    );
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let results: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be JSON"))
        .collect();
    let last = results.last().expect("at least one settled query");
    assert_eq!(last["query"], "h100");
    assert_eq!(last["total"], 1);
    assert_eq!(last["offers"][0]["id"], "lambda-h100");
}

#[test]
fn test_offers_search_keeps_other_filters() {
    let fx = fixture();
    let output = gput_with_input(
        fx.dir.path(),
        &[
            "--data", fx.data.to_str().unwrap(), "--format", "json", "offers", "search",
            "--commitment", "spot",
        ],
        "",
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let last: serde_json::Value =
        serde_json::from_str(stdout.lines().last().expect("initial query result")).unwrap();

    assert_eq!(last["query"], "");
    assert_eq!(last["total"], 1);
    assert_eq!(last["offers"][0]["id"], "vast-4090");
}

#[test]
fn test_offers_export_csv() {
    let fx = fixture();
    let csv_path = fx.dir.path().join("out.csv");
    let output = gput(
        fx.dir.path(),
        &[
            "--data", fx.data.to_str().unwrap(), "offers", "export", "--output",
            csv_path.to_str().unwrap(),
        ],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let csv = std::fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("\"Provider\",\"Model\",\"GPU Count\""));
    assert!(lines[1].starts_with("\"Vast.ai\",\"RTX 4090\""));
}

#[test]
fn test_offers_export_stdout() {
    let fx = fixture();
    let output = gput(
        fx.dir.path(),
        &[
            "--data", fx.data.to_str().unwrap(), "offers", "export", "--output", "-",
            "--model", "H100",
        ],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert_eq!(stdout.lines().count(), 2);
    assert!(stdout.contains("\"Lambda Labs\""));
}

#[test]
fn test_offers_facets_json() {
    let fx = fixture();
    let output = gput(
        fx.dir.path(),
        &["--data", fx.data.to_str().unwrap(), "--format", "json", "offers", "facets"],
    );
    let body = json_of(&output);
    assert_eq!(
        body["providers"],
        serde_json::json!(["Lambda Labs", "RunPod", "Vast.ai"])
    );
    assert_eq!(body["regions"].as_array().unwrap().len(), 3);
}

#[test]
fn test_offers_picks_json() {
    let fx = fixture();
    let output = gput(
        fx.dir.path(),
        &["--data", fx.data.to_str().unwrap(), "--format", "json", "offers", "picks"],
    );
    let body = json_of(&output);
    assert_eq!(body["h100"]["id"], "lambda-h100");
    assert_eq!(body["spot"]["id"], "vast-4090");
}

#[test]
fn test_tmc_json() {
    let fx = fixture();
    let output = gput(
        fx.dir.path(),
        &[
            "--data", fx.data.to_str().unwrap(), "--format", "json", "tmc", "vast-4090",
            "--hours", "10", "--storage", "0", "--egress", "0",
        ],
    );
    let body = json_of(&output);
    let gpu_cost = body["gpuCostMonthly"].as_f64().unwrap();
    assert!((gpu_cost - 0.34 * 10.0 * 4.33).abs() < 1e-9);
    assert_eq!(body["usage"]["hoursPerWeek"], 10.0);
}

#[test]
fn test_tmc_unknown_offer() {
    let fx = fixture();
    let output = gput(
        fx.dir.path(),
        &["--data", fx.data.to_str().unwrap(), "tmc", "does-not-exist"],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("does-not-exist"));
}

#[test]
fn test_trend_json() {
    let fx = fixture();
    let history = fx.dir.path().join("price-history.json");
    let output = gput(
        fx.dir.path(),
        &["--format", "json", "trend", "H100", "--history", history.to_str().unwrap()],
    );
    let body = json_of(&output);
    assert_eq!(body["daysCovered"], 3);
    assert_eq!(body["isHistoricalLow"], true);
    assert_eq!(body["direction"], "falling");
}

#[test]
fn test_trend_requires_history_source() {
    let home = tempfile::tempdir().unwrap();
    let output = gput(home.path(), &["trend", "H100"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--history"));
}

#[test]
fn test_config_file_supplies_dataset() {
    let fx = fixture();
    let config_dir = fx.dir.path().join(".config").join("gput");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.json"),
        format!(r#"{{"data_url": {:?}}}"#, fx.data.to_str().unwrap()),
    )
    .unwrap();

    let output = gput(fx.dir.path(), &["--format", "json", "offers", "list"]);
    assert_eq!(json_of(&output)["total"], 3);
}

#[test]
fn test_share_decode_rejects_garbage() {
    let home = tempfile::tempdir().unwrap();
    let output = gput(home.path(), &["share", "decode", "#q=!!!"]);
    assert!(!output.status.success());
}

/// Test alerts subscribe subcommand help
#[test]
fn test_alerts_subscribe_help() {
    let home = tempfile::tempdir().unwrap();
    let output = gput(home.path(), &["alerts", "subscribe", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--email"));
    assert!(stdout.contains("--type"));
    assert!(stdout.contains("--target-price"));
}
