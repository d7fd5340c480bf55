//! End-to-end runs of the spindle binary

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const PASSING_PAIR: &str = r#"
- describe: arithmetic
  body:
    - it: adds
      steps:
        - equal: [2, 2]
    - it: compares
      steps:
        - not_equal: [1, 2]
"#;

const ONE_PASSING: &str = "- it: passes\n  steps:\n    - contains: [\"haystack\", \"hay\"]\n";

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, content).unwrap();
    path
}

fn spindle(cwd: &Path, args: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_spindle"));
    for var in [
        "SPINDLE_DIR",
        "SPINDLE_PARALLEL",
        "SPINDLE_WORKERS",
        "SPINDLE_FORMAT",
        "SPINDLE_COLOR",
        "SPINDLE_CRASH_POLICY",
        "SPINDLE_CONFIG",
        "SPINDLE_LOG",
    ] {
        command.env_remove(var);
    }
    command.current_dir(cwd).args(args).output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn json(output: &Output) -> Value {
    serde_json::from_str(stdout(output).trim()).unwrap()
}

#[test]
fn test_sequential_run_of_three_files() {
    let tmp = TempDir::new().unwrap();
    for name in ["fib.spec.yaml", "closest.spec.yaml", "nested/frequent.spec.yaml"] {
        write(tmp.path(), name, PASSING_PAIR);
    }

    let output = spindle(tmp.path(), &["run", ".", "--no-color"]);
    let text = stdout(&output);

    assert!(output.status.success(), "{}", stderr(&output));
    assert!(text.contains("Suite: arithmetic"));
    assert!(text.contains("adds: Running"));
    assert!(text.contains("Total Tests: 6, Passed: 6, Failed: 0"));
    assert!(!text.contains('\x1b'));
}

#[test]
fn test_failing_case_sets_exit_code() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "boom.yaml",
        "- it: explodes\n  steps:\n    - fail: boom\n",
    );

    let output = spindle(tmp.path(), &["run", ".", "--no-color"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("Total Tests: 1, Passed: 0, Failed: 1"));
    assert!(stdout(&output).contains("explodes: \n\tboom"));

    let output = spindle(tmp.path(), &["run", ".", "--exit-zero"]);
    assert!(output.status.success());
}

#[test]
fn test_parallel_run_reports_json() {
    let tmp = TempDir::new().unwrap();
    for i in 0..4 {
        write(tmp.path(), &format!("file{i}.yaml"), ONE_PASSING);
    }

    let output = spindle(
        tmp.path(),
        &["run", ".", "--parallel", "--workers", "4", "--format", "json"],
    );
    assert!(output.status.success(), "{}", stderr(&output));

    let report = json(&output);
    assert_eq!(report["mode"], "parallel");
    assert_eq!(report["files"], 4);
    assert_eq!(report["summary"]["total"], 4);
    assert_eq!(report["summary"]["passed"], 4);
    assert_eq!(report["summary"]["failed"], 0);
    assert!(report["workers"].as_u64().unwrap() <= 4);
}

#[test]
fn test_worker_crash_is_dropped_with_diagnostic() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.yaml", ONE_PASSING);
    write(tmp.path(), "b.yaml", "- it: dies\n  steps:\n    - exit: 3\n");
    write(tmp.path(), "c.yaml", ONE_PASSING);

    let output = spindle(
        tmp.path(),
        &[
            "run",
            ".",
            "--parallel",
            "--workers",
            "2",
            "--crash-policy",
            "drop",
            "--format",
            "json",
        ],
    );

    let report = json(&output);
    assert_eq!(report["summary"]["total"], 2);
    assert_eq!(report["summary"]["passed"], 2);
    assert!(report["summary"]["errors"].as_array().unwrap().is_empty());
    assert!(report["crashed"][0].as_str().unwrap().ends_with("b.yaml"));
    assert!(stderr(&output).contains("Worker died"));
    assert!(output.status.success());
}

#[test]
fn test_worker_crash_is_recorded_by_default() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.yaml", ONE_PASSING);
    write(tmp.path(), "b.yaml", "- it: dies\n  steps:\n    - exit: 3\n");

    let output = spindle(
        tmp.path(),
        &["run", ".", "--parallel", "--workers", "2", "--format", "json"],
    );
    assert_eq!(output.status.code(), Some(1));

    let report = json(&output);
    let errors = report["summary"]["errors"].as_array().unwrap();
    assert_eq!(report["summary"]["total"], 1);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["kind"], "crash");
    assert!(errors[0]["message"]
        .as_str()
        .unwrap()
        .contains("exited with status 3"));
}

#[test]
fn test_isolated_workers_with_retry() {
    let tmp = TempDir::new().unwrap();
    for i in 0..3 {
        write(tmp.path(), &format!("file{i}.yaml"), PASSING_PAIR);
    }

    let output = spindle(
        tmp.path(),
        &[
            "run", ".", "--parallel", "--workers", "2", "--isolate", "--retry", "--format",
            "json",
        ],
    );
    assert!(output.status.success(), "{}", stderr(&output));

    let report = json(&output);
    assert_eq!(report["summary"]["total"], 6);
    assert_eq!(report["workers"], 3);
}

#[test]
fn test_unparseable_file_is_reported_by_path() {
    let tmp = TempDir::new().unwrap();
    let bad = write(tmp.path(), "bad.yaml", "- it: [unclosed");
    write(tmp.path(), "good.yaml", ONE_PASSING);

    let output = spindle(tmp.path(), &["run", ".", "--no-color"]);
    let text = stdout(&output);

    assert_eq!(output.status.code(), Some(1));
    assert!(text.contains("Total Tests: 1, Passed: 1, Failed: 0"));
    let canonical = bad.canonicalize().unwrap();
    assert!(text.contains(&format!("[file] Couldn't run {}", canonical.display())));
}

#[test]
fn test_list_applies_suffix() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.spec.yaml", ONE_PASSING);
    write(tmp.path(), "sub/b.spec.yaml", ONE_PASSING);
    write(tmp.path(), "notes.md", "not a test");

    let output = spindle(tmp.path(), &["list", ".", "--suffix", ".spec.yaml"]);
    let lines: Vec<_> = stdout(&output).lines().map(str::to_string).collect();

    assert!(output.status.success());
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("a.spec.yaml"));
    assert!(lines[1].ends_with("b.spec.yaml"));
}

#[test]
fn test_missing_directory_fails() {
    let tmp = TempDir::new().unwrap();
    let output = spindle(tmp.path(), &["run", "does-not-exist"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Test directory not found"));
}

#[test]
fn test_config_file_selects_parallel_mode() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "specs/a.yaml", ONE_PASSING);
    write(
        tmp.path(),
        "spindle.yaml",
        "harness:\n  test_dir: specs\n  mode: parallel\n  workers: 1\n  format: json\n",
    );

    let output = spindle(tmp.path(), &["run"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let report = json(&output);
    assert_eq!(report["mode"], "parallel");
    assert_eq!(report["summary"]["passed"], 1);
}
