use std::time::Duration;

use predicates::prelude::*;

use super::common::{TestEnv, stdout_json};

#[test]
fn demo_reports_and_saves() {
  let env = TestEnv::new();

  env
    .memtrace_cmd()
    .args(["--log-level", "warn", "demo", "--data-dir", "traces"])
    .assert()
    .success()
    .stdout(predicate::str::contains("=== Memory Statistics ==="))
    .stdout(predicate::str::contains("Memory Tracer Report"))
    .stdout(predicate::str::contains("potential memory leaks"))
    .stdout(predicate::str::contains("Demo complete"));

  assert!(env.path().join("memory_report.json").is_file());
  assert!(env.path().join("traces/allocations.json").is_file());
}

#[test]
fn demo_captures_the_deliberate_leak() {
  let env = TestEnv::new();

  let output = env
    .memtrace_cmd()
    .args(["--log-level", "warn", "--output", "json", "demo", "--report", "report.json"])
    .output()
    .unwrap();

  assert!(output.status.success());
  let json = stdout_json(&output);
  assert!(json["totals"]["total_allocations"].as_u64().unwrap() > 0);
  assert!(json["leaks"].as_u64().unwrap() >= 1);

  let report: serde_json::Value =
    serde_json::from_str(&std::fs::read_to_string(env.path().join("report.json")).unwrap()).unwrap();
  let leaked = report["allocations"]
    .as_array()
    .unwrap()
    .iter()
    .filter(|a| a.get("freed_at").is_none())
    .any(|a| a["size"] == 200);
  assert!(leaked, "the 50 x i32 leak should stay live");
}

#[test]
fn demo_with_monitor_completes() {
  let env = TestEnv::new();

  env
    .memtrace_cmd()
    .args(["--log-level", "warn", "demo", "--monitor", "--interval", "20ms"])
    .timeout(Duration::from_secs(60))
    .assert()
    .success()
    .stdout(predicate::str::contains("Realtime Memory Monitor"))
    .stdout(predicate::str::contains("Demo complete"));
}
