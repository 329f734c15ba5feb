use predicates::prelude::*;

use super::common::{TestEnv, fixture_path, stdout_json};

#[test]
fn leaks_lists_live_allocations() {
  let env = TestEnv::new();

  env
    .memtrace_cmd()
    .arg("leaks")
    .arg(fixture_path("allocations.json"))
    .assert()
    .success()
    .stdout(predicate::str::contains("Found 2 potential memory leaks."))
    .stdout(predicate::str::contains("demo::leak_block @ src/demo.rs:48 (200 bytes)"));
}

#[test]
fn leaks_json_output_is_valid() {
  let env = TestEnv::new();

  let output = env
    .memtrace_cmd()
    .args(["--output", "json", "leaks"])
    .arg(fixture_path("allocations.json"))
    .output()
    .unwrap();

  assert!(output.status.success());
  let json = stdout_json(&output);
  assert_eq!(json["count"], 2);
  assert_eq!(json["total_size"], 232);
}

#[test]
fn leaks_limit_truncates_listing() {
  let env = TestEnv::new();

  env
    .memtrace_cmd()
    .args(["leaks", "--limit", "1"])
    .arg(fixture_path("allocations.json"))
    .assert()
    .success()
    .stdout(predicate::str::contains("... and 1 more"));
}

#[test]
fn zero_address_records_count_as_freed() {
  let env = TestEnv::new();

  let output = env
    .memtrace_cmd()
    .args(["--output", "json", "query", "--function", "net::read_packet"])
    .arg(fixture_path("allocations.json"))
    .output()
    .unwrap();

  assert!(output.status.success());
  let json = stdout_json(&output);
  assert_eq!(json["total_count"], 1);
  assert_eq!(json["total_size"], 32);
}

#[test]
fn query_by_size_range_is_inclusive() {
  let env = TestEnv::new();

  let output = env
    .memtrace_cmd()
    .args(["--output", "json", "query", "--min-size", "32", "--max-size", "200"])
    .arg(fixture_path("allocations.json"))
    .output()
    .unwrap();

  assert!(output.status.success());
  let json = stdout_json(&output);
  assert_eq!(json["total_count"], 2);
  assert_eq!(json["peak_usage"], 200);
}

#[test]
fn query_by_time_range_includes_freed_records() {
  let env = TestEnv::new();

  let output = env
    .memtrace_cmd()
    .args(["--output", "json", "query"])
    .args(["--from", "1700000000000000000", "--to", "1700000000400000000"])
    .arg(fixture_path("allocations.json"))
    .output()
    .unwrap();

  assert!(output.status.success());
  let json = stdout_json(&output);
  assert_eq!(json["total_count"], 3);
  assert_eq!(json["total_size"], 200);
}

#[test]
fn query_requires_a_filter() {
  let env = TestEnv::new();

  env
    .memtrace_cmd()
    .arg("query")
    .arg(fixture_path("allocations.json"))
    .assert()
    .failure();
}

#[test]
fn query_rejects_inverted_size_range() {
  let env = TestEnv::new();

  env
    .memtrace_cmd()
    .args(["query", "--min-size", "500", "--max-size", "10"])
    .arg(fixture_path("allocations.json"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("larger than"));
}

#[test]
fn chart_function_draws_bars() {
  let env = TestEnv::new();

  env
    .memtrace_cmd()
    .args(["chart", "--kind", "function"])
    .arg(fixture_path("allocations.json"))
    .assert()
    .success()
    .stdout(predicate::str::contains("demo::build_strings"))
    .stdout(predicate::str::contains("█"));
}

#[test]
fn chart_timeline_reports_peak() {
  let env = TestEnv::new();

  env
    .memtrace_cmd()
    .args(["chart", "--kind", "timeline", "--bucket", "1s"])
    .arg(fixture_path("allocations.json"))
    .assert()
    .success()
    .stdout(predicate::str::contains("Peak usage"));
}

#[test]
fn chart_files_uses_file_names() {
  let env = TestEnv::new();

  env
    .memtrace_cmd()
    .args(["chart", "--kind", "files"])
    .arg(fixture_path("allocations.json"))
    .assert()
    .success()
    .stdout(predicate::str::contains("demo.rs"))
    .stdout(predicate::str::contains("net.rs"));
}

#[test]
fn chart_on_empty_document_says_so() {
  let env = TestEnv::new();
  let input = env.write_file("empty.json", r#"{"allocations": []}"#);

  env
    .memtrace_cmd()
    .args(["chart", "--kind", "hotspots"])
    .arg(&input)
    .assert()
    .success()
    .stdout(predicate::str::contains("No hotspot data available."));
}

#[test]
fn report_json_has_totals() {
  let env = TestEnv::new();

  let output = env
    .memtrace_cmd()
    .args(["--output", "json", "report"])
    .arg(fixture_path("allocations.json"))
    .output()
    .unwrap();

  assert!(output.status.success());
  let json = stdout_json(&output);
  assert_eq!(json["totals"]["total_allocations"], 5);
  assert_eq!(json["totals"]["unique_functions"], 4);
  assert_eq!(json["totals"]["unique_files"], 2);
}

#[test]
fn malformed_document_fails() {
  let env = TestEnv::new();
  let input = env.write_file("bad.json", "{ not json");

  env
    .memtrace_cmd()
    .arg("summary")
    .arg(&input)
    .assert()
    .failure()
    .stderr(predicate::str::contains("bad.json"));
}

#[test]
fn config_file_limits_records() {
  let env = TestEnv::new();
  let config = env.write_file("memtrace.json", r#"{ "max_allocations": 2, "log_level": "error" }"#);

  let output = env
    .memtrace_cmd()
    .arg("--config")
    .arg(&config)
    .args(["--output", "json", "summary"])
    .arg(fixture_path("allocations.json"))
    .output()
    .unwrap();

  assert!(output.status.success());
  let json = stdout_json(&output);
  assert_eq!(json["storage"]["total_allocations"], 2);
}

#[test]
fn log_file_receives_events() {
  let env = TestEnv::new();
  let log = env.path().join("logs").join("memtrace.log");

  env
    .memtrace_cmd()
    .args(["--log-level", "debug", "--log-file"])
    .arg(&log)
    .arg("summary")
    .arg(fixture_path("allocations.json"))
    .assert()
    .success();

  let content = std::fs::read_to_string(&log).unwrap();
  assert!(content.contains("session loaded"));
}

#[test]
fn oversized_sizes_saturate_instead_of_overflowing() {
  let env = TestEnv::new();
  let record = |address: u64| {
    serde_json::json!({
      "timestamp": address,
      "address": address,
      "size": u64::MAX / 2 + 1,
      "function": "huge",
      "file": "huge.rs",
      "line": 1,
      "thread_id": 1,
      "stack_trace": ["huge", "main"],
    })
  };
  let document = serde_json::json!({ "allocations": [record(16), record(32)] });
  let input = env.write_file("huge.json", &document.to_string());

  let output = env
    .memtrace_cmd()
    .args(["--output", "json", "summary"])
    .arg(&input)
    .output()
    .unwrap();
  assert!(output.status.success());
  let json = stdout_json(&output);
  assert_eq!(json["storage"]["by_function"]["huge"]["total_size"], u64::MAX);
  assert_eq!(json["totals"]["total_memory_allocated"], u64::MAX);
  assert_eq!(json["leaks"]["bytes"], u64::MAX);

  let output = env
    .memtrace_cmd()
    .args(["--output", "json", "leaks"])
    .arg(&input)
    .output()
    .unwrap();
  assert!(output.status.success());
  assert_eq!(stdout_json(&output)["total_size"], u64::MAX);
}
