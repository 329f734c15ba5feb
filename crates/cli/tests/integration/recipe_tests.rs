use predicates::prelude::*;

use super::common::{TestEnv, stdout_json};

#[test]
fn configure_shared_propagates_to_spdlog_and_fmt() {
  let env = TestEnv::new();

  let output = env
    .memtrace_cmd()
    .args(["--output", "json", "recipe", "configure"])
    .output()
    .unwrap();

  assert!(output.status.success());
  let json = stdout_json(&output);
  assert_eq!(json["package"]["shared"], true);
  assert_eq!(json["dependencies"]["spdlog"]["shared"], true);
  assert_eq!(json["dependencies"]["fmt"]["shared"], true);
  assert_eq!(json["dependencies"]["nlohmann_json"]["shared"], false);
}

#[test]
fn configure_static_leaves_dependencies() {
  let env = TestEnv::new();

  let output = env
    .memtrace_cmd()
    .args(["--output", "json", "recipe", "configure", "-o", "shared=False"])
    .output()
    .unwrap();

  assert!(output.status.success());
  let json = stdout_json(&output);
  assert_eq!(json["package"]["shared"], false);
  assert_eq!(json["dependencies"]["spdlog"]["shared"], false);
  assert_eq!(json["dependencies"]["fmt"]["shared"], false);
}

#[test]
fn configure_rejects_unknown_dependency() {
  let env = TestEnv::new();

  env
    .memtrace_cmd()
    .args(["recipe", "configure", "-o", "zlib:shared=True"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown dependency: zlib"));
}

#[test]
fn imports_copies_shared_libraries() {
  let env = TestEnv::new();
  env.write_file("deps/spdlog/lib/libspdlog.so.1.12", "elf");
  env.write_file("deps/spdlog/lib/libspdlog.a", "archive");
  env.write_file("deps/fmt/bin/fmt.dll", "pe");
  env.write_file("deps/fmt/lib/libfmt.10.dylib", "macho");

  env
    .memtrace_cmd()
    .args(["recipe", "imports", "--dep", "deps/spdlog", "--dep", "fmt=deps/fmt", "--dest", "out"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Imported 3 file(s)"));

  let out = env.path().join("out");
  assert!(out.join("lib/libspdlog.so.1.12").is_file());
  assert!(out.join("lib/libfmt.10.dylib").is_file());
  assert!(out.join("bin/fmt.dll").is_file());
  assert!(!out.join("lib/libspdlog.a").exists());
}

#[cfg(unix)]
#[test]
fn imports_keep_library_symlinks() {
  use std::os::unix::fs::symlink;

  let env = TestEnv::new();
  let lib = env.write_file("deps/spdlog/lib/libspdlog.so.1.12.0", "elf");
  let dir = lib.parent().unwrap();
  symlink("libspdlog.so.1.12.0", dir.join("libspdlog.so.1.12")).unwrap();
  symlink("libspdlog.so.1.12", dir.join("libspdlog.so")).unwrap();

  env
    .memtrace_cmd()
    .args(["recipe", "imports", "--dep", "deps/spdlog", "--dest", "out"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Imported 3 file(s)"));

  let out = env.path().join("out/lib");
  for name in ["libspdlog.so", "libspdlog.so.1.12"] {
    let meta = std::fs::symlink_metadata(out.join(name)).unwrap();
    assert!(meta.file_type().is_symlink(), "{name} should stay a link");
  }
  assert_eq!(std::fs::read_to_string(out.join("libspdlog.so")).unwrap(), "elf");
}

#[test]
fn imports_with_nothing_to_copy_succeeds() {
  let env = TestEnv::new();
  env.write_file("deps/nlohmann_json/include/nlohmann/json.hpp", "");

  env
    .memtrace_cmd()
    .args(["recipe", "imports", "--dep", "deps/nlohmann_json", "--dest", "out"])
    .assert()
    .success()
    .stdout(predicate::str::contains("No shared libraries to import"));
}

#[test]
fn generate_writes_descriptors() {
  let env = TestEnv::new();

  env
    .memtrace_cmd()
    .args(["recipe", "generate", "--out", "gen"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Wrote 2 descriptor(s)"));

  let build = std::fs::read_to_string(env.path().join("gen/BUILD.bazel")).unwrap();
  assert_eq!(build.matches("cc_library(").count(), 4);
  let info: serde_json::Value =
    serde_json::from_str(&std::fs::read_to_string(env.path().join("gen/buildinfo.json")).unwrap()).unwrap();
  assert_eq!(info["package"], "memory_tracer");
  assert_eq!(info["version"], "1.0.0");
}

#[test]
fn generate_applies_setting_overrides() {
  let env = TestEnv::new();

  env
    .memtrace_cmd()
    .args(["recipe", "generate", "--out", "gen"])
    .args(["-s", "os=windows", "-s", "compiler=msvc", "-s", "build_type=Debug", "-s", "arch=armv7"])
    .assert()
    .success();

  let info: serde_json::Value =
    serde_json::from_str(&std::fs::read_to_string(env.path().join("gen/buildinfo.json")).unwrap()).unwrap();
  assert_eq!(info["platform"], "armv7-windows");
  assert_eq!(info["settings"]["os"], "windows");
  assert_eq!(info["settings"]["compiler"], "msvc");
  assert_eq!(info["settings"]["build_type"], "Debug");
  assert_eq!(info["settings"]["arch"], "armv7");
}

#[test]
fn generate_rejects_unknown_setting() {
  let env = TestEnv::new();

  env
    .memtrace_cmd()
    .args(["recipe", "generate", "--out", "gen", "-s", "libcxx=libstdc++11"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown setting: libcxx"));
  assert!(!env.path().join("gen").exists());
}

#[test]
fn show_json_lists_generators() {
  let env = TestEnv::new();

  let output = env
    .memtrace_cmd()
    .args(["--output", "json", "recipe", "show"])
    .output()
    .unwrap();

  assert!(output.status.success());
  let json = stdout_json(&output);
  assert_eq!(json["generators"], serde_json::json!(["bazel", "json"]));
  assert_eq!(json["requires"].as_array().unwrap().len(), 4);
  assert_eq!(json["options"]["fPIC"], true);
}
