//! Layered loading and hashing.
//!
//! - Same inputs hash identically; key order in the source does not matter.
//! - Later layers override earlier ones; different values hash differently.
//! - Layers loaded from disk hash the same as the same text loaded from memory.

use std::io::Write;

use cpk_config::{load_layered_yaml, load_layered_yaml_from_strings};

const BASE_YAML: &str = r#"
reconcile:
  amount_tolerance_cents: 1
  date_tolerance_days: 2
cashflow:
  lookback_months: 1
  horizon_months: 6
database:
  url_env: "CPK_DATABASE_URL"
"#;

const BASE_YAML_REORDERED: &str = r#"
database:
  url_env: "CPK_DATABASE_URL"
cashflow:
  horizon_months: 6
  lookback_months: 1
reconcile:
  date_tolerance_days: 2
  amount_tolerance_cents: 1
"#;

const OVERLAY_YAML: &str = r#"
reconcile:
  date_tolerance_days: 5
cashflow:
  horizon_months: 12
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn reordered_keys_produce_same_hash() {
    let original = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let reordered = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(original.config_hash, reordered.config_hash);
    assert_eq!(original.canonical_json, reordered.canonical_json);
}

#[test]
fn overlay_overrides_and_changes_the_hash() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let merged = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_ne!(base.config_hash, merged.config_hash);

    let cfg = merged.engine_config().unwrap();
    assert_eq!(cfg.reconcile.date_tolerance_days, 5);
    // untouched siblings survive the merge
    assert_eq!(cfg.reconcile.amount_tolerance_cents, 1);
    assert_eq!(cfg.cashflow.lookback_months, 1);
    assert_eq!(cfg.cashflow.horizon_months, 12);

    let settings = cfg.to_settings();
    assert_eq!(settings.tolerance.days, 5);
    assert_eq!(settings.alerts.horizon_months, 12);
}

#[test]
fn hash_is_64_hex_chars() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(loaded.config_hash.len(), 64);
    assert!(loaded.config_hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn empty_layers_change_nothing() {
    let a = load_layered_yaml_from_strings(&["{}"]).unwrap();
    let b = load_layered_yaml_from_strings(&["{}", ""]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, "{}");
}

#[test]
fn files_load_like_strings() {
    let dir = tempfile::tempdir().unwrap();
    let base_path = dir.path().join("base.yaml");
    let overlay_path = dir.path().join("local.yaml");
    std::fs::File::create(&base_path)
        .unwrap()
        .write_all(BASE_YAML.as_bytes())
        .unwrap();
    std::fs::File::create(&overlay_path)
        .unwrap()
        .write_all(OVERLAY_YAML.as_bytes())
        .unwrap();

    let from_disk = load_layered_yaml(&[
        base_path.to_str().unwrap(),
        overlay_path.to_str().unwrap(),
    ])
    .unwrap();
    let from_memory = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_eq!(from_disk.config_hash, from_memory.config_hash);

    let missing = dir.path().join("nope.yaml");
    let err = load_layered_yaml(&[missing.to_str().unwrap()]).unwrap_err();
    assert!(err.to_string().contains("failed to read yaml path"));
}
