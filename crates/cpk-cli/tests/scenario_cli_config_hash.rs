use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let p = dir.path().join(name);
    fs::write(&p, body).unwrap();
    p
}

fn cpk(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cpk").unwrap();
    // keep a developer's .env.local out of the run
    cmd.current_dir(dir.path());
    cmd
}

fn hash_line(stdout: &[u8]) -> String {
    String::from_utf8_lossy(stdout)
        .lines()
        .find(|l| l.starts_with("config_hash="))
        .unwrap()
        .to_string()
}

#[test]
fn layered_files_print_hash_and_canonical_json() {
    let dir = TempDir::new().unwrap();
    let base = write(&dir, "base.yaml", "alerts:\n  max_concurrency: 4\n");
    let env = write(&dir, "prod.yaml", "alerts:\n  max_concurrency: 2\n");

    let assert = cpk(&dir)
        .arg("config-hash")
        .arg(&base)
        .arg(&env)
        .assert()
        .success()
        .stdout(predicate::str::is_match("config_hash=[0-9a-f]{64}\n").unwrap())
        .stdout(predicate::str::contains(r#"{"alerts":{"max_concurrency":2}}"#));

    let line = hash_line(&assert.get_output().stdout);
    assert_eq!(line.len(), "config_hash=".len() + 64);
}

#[test]
fn hash_ignores_key_order_within_a_layer() {
    let dir = TempDir::new().unwrap();
    let a = write(
        &dir,
        "a.yaml",
        "reconcile:\n  amount_tolerance_cents: 5\n  date_tolerance_days: 3\n",
    );
    let b = write(
        &dir,
        "b.yaml",
        "reconcile:\n  date_tolerance_days: 3\n  amount_tolerance_cents: 5\n",
    );

    let out_a = cpk(&dir).arg("config-hash").arg(&a).output().unwrap();
    let out_b = cpk(&dir).arg("config-hash").arg(&b).output().unwrap();
    assert!(out_a.status.success() && out_b.status.success());
    assert_eq!(hash_line(&out_a.stdout), hash_line(&out_b.stdout));
}

#[test]
fn json_output_carries_hash_and_merged_document() {
    let dir = TempDir::new().unwrap();
    let base = write(&dir, "base.yaml", "cashflow:\n  horizon_months: 9\n");

    let output = cpk(&dir)
        .args(["--json", "config-hash"])
        .arg(&base)
        .output()
        .unwrap();
    assert!(output.status.success());

    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(v["config_hash"].as_str().unwrap().len(), 64);
    assert_eq!(v["config"]["cashflow"]["horizon_months"], 9);
}

#[test]
fn literal_connection_string_is_refused_without_echoing_it() {
    let dir = TempDir::new().unwrap();
    let bad = write(
        &dir,
        "bad.yaml",
        "database:\n  url_env: \"postgres://cash:hunter2@db/cash\"\n",
    );

    cpk(&dir)
        .arg("config-hash")
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"))
        .stderr(predicate::str::contains("hunter2").not());
}

#[test]
fn unused_keys_warn_by_default_and_fail_when_strict() {
    let dir = TempDir::new().unwrap();
    let cfg = write(&dir, "extra.yaml", "reporting:\n  theme: dark\n");

    cpk(&dir).arg("config-hash").arg(&cfg).assert().success();

    cpk(&dir)
        .args(["--strict-config", "config-hash"])
        .arg(&cfg)
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_UNUSED_KEYS"))
        .stderr(predicate::str::contains("/reporting/theme"));
}

#[test]
fn invalid_engine_values_get_no_hash() {
    let dir = TempDir::new().unwrap();
    let cfg = write(&dir, "zero.yaml", "alerts:\n  max_concurrency: 0\n");

    cpk(&dir)
        .arg("config-hash")
        .arg(&cfg)
        .assert()
        .failure()
        .stdout(predicate::str::contains("config_hash=").not())
        .stderr(predicate::str::contains("CONFIG_INVALID"));
}

#[test]
fn missing_layer_names_the_path() {
    let dir = TempDir::new().unwrap();

    cpk(&dir)
        .args(["config-hash", "does-not-exist.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read yaml path: does-not-exist.yaml"));
}

#[test]
fn config_hash_requires_at_least_one_path() {
    let dir = TempDir::new().unwrap();
    cpk(&dir).arg("config-hash").assert().failure();
}
