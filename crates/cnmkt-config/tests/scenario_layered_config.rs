//! Layered calendar config scenario tests.
//!
//! GREEN when:
//! - An empty document yields the built-in defaults.
//! - Later layers override earlier ones key by key.
//! - Unknown keys and out-of-range values are rejected.
//! - The config hash is stable for identical input and tracks effective
//!   values, whether the config came from YAML files or was built in code.

use cnmkt_config::{
    load_layered_yaml, load_layered_yaml_from_strings, CalendarConfig, LoadedConfig, RefetchScope,
};
use std::path::PathBuf;

const BASE_YAML: &str = r#"
provider_base_url: "http://127.0.0.1:9000/data"
max_concurrency: 3
start_year: 2000
"#;

const OVERLAY_YAML: &str = r#"
start_year: 2010
refetch_scope: missing_years
cache_dir: "/var/cache/cnmkt"
"#;

#[test]
fn empty_document_yields_defaults() {
    let loaded = load_layered_yaml_from_strings(&[""]).unwrap();
    assert_eq!(loaded.config, CalendarConfig::default());
}

#[test]
fn overlay_overrides_base() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    let cfg = loaded.config;

    assert_eq!(cfg.provider_base_url, "http://127.0.0.1:9000/data");
    assert_eq!(cfg.start_year, 2010, "overlay must win");
    assert_eq!(cfg.refetch_scope, RefetchScope::MissingYears);
    assert_eq!(cfg.cache_dir, Some(PathBuf::from("/var/cache/cnmkt")));
    // untouched keys keep their defaults
    assert_eq!(cfg.cutoff_hour, 9);
    assert_eq!(cfg.request_timeout_secs, 10);
}

#[test]
fn unknown_key_is_rejected() {
    let err = load_layered_yaml_from_strings(&["max_concurency: 3\n"]).unwrap_err();
    assert!(
        format!("{err:#}").contains("max_concurency"),
        "error should name the offending key, got: {err:#}"
    );
}

#[test]
fn cutoff_hour_out_of_range_is_rejected() {
    let err = load_layered_yaml_from_strings(&["cutoff_hour: 24\n"]).unwrap_err();
    assert!(err.to_string().contains("cutoff_hour"));
}

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.config_hash.len(), 64, "sha256 hex");

    let c = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_ne!(a.config_hash, c.config_hash);
}

#[test]
fn files_load_in_layer_order() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    let overlay = dir.path().join("overlay.yaml");
    std::fs::write(&base, BASE_YAML).unwrap();
    std::fs::write(&overlay, OVERLAY_YAML).unwrap();

    let from_files = load_layered_yaml(&[
        base.to_str().unwrap(),
        overlay.to_str().unwrap(),
    ])
    .unwrap();
    let from_strings = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();

    assert_eq!(from_files.config.start_year, 2010);
    assert_eq!(from_files.config_hash, from_strings.config_hash);
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");
    let err = load_layered_yaml(&[path.to_str().unwrap()]).unwrap_err();
    assert!(err.to_string().contains("absent.yaml"));
}

#[test]
fn hash_depends_on_effective_values_only() {
    // Spelling out a default changes the document but not the config.
    let implicit = load_layered_yaml_from_strings(&[""]).unwrap();
    let explicit = load_layered_yaml_from_strings(&["cutoff_hour: 9\n"]).unwrap();
    let in_code = LoadedConfig::from_config(CalendarConfig::default()).unwrap();

    assert_eq!(implicit.config_hash, explicit.config_hash);
    assert_eq!(implicit.config_hash, in_code.config_hash);
}

#[test]
fn from_config_rejects_invalid_values() {
    let cfg = CalendarConfig {
        lookback_days: 0,
        ..CalendarConfig::default()
    };
    assert!(LoadedConfig::from_config(cfg).is_err());
}
