//! Integration tests for branchcount-store
//!
//! These tests drive the extractor store through real configuration sources,
//! including file-backed reloads.

use branchcount_store::{branch_count_schema, AppConfig, ConfigSource, ExtractorsStore, StoreError};
use serde_json::{json, Value};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

const NAMESPACE: &str = "soundcheck.collectors.branch";

fn with_section(section: Value) -> Value {
    json!({ "soundcheck": { "collectors": { "branch": section } } })
}

fn fact_names(store: &ExtractorsStore) -> Vec<String> {
    store
        .extractor_configs()
        .into_iter()
        .map(|c| c.fact_name)
        .collect()
}

#[test]
fn test_single_block_round_trip() {
    let config = Arc::new(AppConfig::from_value(with_section(json!({
        "collects": { "type": "branchDescriptor", "factName": "branch_count" }
    }))));

    let store = ExtractorsStore::create(config, NAMESPACE, branch_count_schema()).unwrap();
    assert_eq!(fact_names(&store), vec!["branch_count"]);
    assert_eq!(store.namespace(), NAMESPACE);
}

#[test]
fn test_block_list_round_trip() {
    let config = Arc::new(AppConfig::from_value(with_section(json!([
        {
            "frequency": { "cron": "0 * * * *" },
            "collects": [
                { "type": "branchDescriptor", "factName": "branch_count" },
                { "type": "branchDescriptor", "factName": "branch_count_hourly" }
            ]
        },
        {
            "filter": { "kind": "Component" },
            "collects": { "type": "branchDescriptor", "factName": "component_branches" }
        }
    ]))));

    let store = ExtractorsStore::create(config, NAMESPACE, branch_count_schema()).unwrap();
    assert_eq!(
        fact_names(&store),
        vec!["branch_count", "branch_count_hourly", "component_branches"]
    );

    let component = store.extractor_config("component_branches").unwrap();
    assert!(component.filter.is_some());
    assert!(component.frequency.is_none());
}

#[test]
fn test_absent_section_yields_no_configs() {
    let config = Arc::new(AppConfig::from_value(json!({ "soundcheck": {} })));
    let store = ExtractorsStore::create(config, NAMESPACE, branch_count_schema()).unwrap();
    assert!(store.extractor_configs().is_empty());
    assert!(store.extractor_config("branch_count").is_none());
}

#[test]
fn test_unmatched_type_fails_construction() {
    let config = Arc::new(AppConfig::from_value(with_section(json!({
        "collects": { "type": "tagDescriptor", "factName": "branch_count" }
    }))));

    match ExtractorsStore::create(config, NAMESPACE, branch_count_schema()) {
        Err(StoreError::InvalidConfig { namespace, source }) => {
            assert_eq!(namespace, NAMESPACE);
            assert!(source.has_issue_at("collects.type"));
        }
        other => panic!("expected InvalidConfig, got {:?}", other),
    }
}

#[test]
fn test_oversized_cache_duration_fails_construction() {
    let config = Arc::new(AppConfig::from_value(with_section(json!({
        "cache": { "duration": { "days": 1u64 << 60 } },
        "collects": { "type": "branchDescriptor", "factName": "branch_count" }
    }))));

    match ExtractorsStore::create(config, NAMESPACE, branch_count_schema()) {
        Err(StoreError::InvalidConfig { source, .. }) => {
            assert!(source.has_issue_at("cache"));
            assert!(source.to_string().contains("cache duration is too large"));
        }
        other => panic!("expected InvalidConfig, got {:?}", other),
    }
}

#[test]
fn test_extra_keys_do_not_block_construction() {
    let config = Arc::new(AppConfig::from_yaml_str(
        r#"
soundcheck:
  collectors:
    branch:
      collects:
        type: branchDescriptor
        factName: branch_count
        description: Number of branches
"#,
    )
    .unwrap());

    let store = ExtractorsStore::create(config, NAMESPACE, branch_count_schema()).unwrap();
    assert_eq!(fact_names(&store), vec!["branch_count"]);
}

#[test]
fn test_concurrent_readers_see_whole_snapshots() {
    let old = with_section(json!({
        "collects": [
            { "type": "branchDescriptor", "factName": "a" },
            { "type": "branchDescriptor", "factName": "b" }
        ]
    }));
    let new = with_section(json!({
        "collects": [
            { "type": "branchDescriptor", "factName": "c" },
            { "type": "branchDescriptor", "factName": "d" },
            { "type": "branchDescriptor", "factName": "e" }
        ]
    }));

    let config = Arc::new(AppConfig::from_value(old.clone()));
    let store = Arc::new(
        ExtractorsStore::create(config.clone(), NAMESPACE, branch_count_schema()).unwrap(),
    );
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::SeqCst) {
                    let names = fact_names(&store);
                    assert!(
                        names == ["a", "b"] || names == ["c", "d", "e"],
                        "observed partial mapping: {:?}",
                        names
                    );
                }
            })
        })
        .collect();

    for i in 0..200 {
        config.replace(if i % 2 == 0 { new.clone() } else { old.clone() });
    }
    done.store(true, Ordering::SeqCst);

    for reader in readers {
        reader.join().unwrap();
    }
}

#[test]
fn test_recovers_after_invalid_reload() {
    let valid = with_section(json!({
        "collects": { "type": "branchDescriptor", "factName": "branch_count" }
    }));
    let config = Arc::new(AppConfig::from_value(valid.clone()));
    let store = ExtractorsStore::create(config.clone(), NAMESPACE, branch_count_schema()).unwrap();

    config.replace(with_section(json!({ "collects": { "factName": "branch_count" } })));
    assert!(store.last_error().is_some());
    assert!(store.extractor_configs().is_empty());

    config.replace(valid);
    assert!(store.last_error().is_none());
    assert_eq!(fact_names(&store), vec!["branch_count"]);
}

#[test]
fn test_file_reload_updates_store() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        "soundcheck:\n  collectors:\n    branch:\n      collects:\n        type: branchDescriptor\n        factName: branch_count"
    )
    .unwrap();

    let config = Arc::new(AppConfig::from_file(file.path()).unwrap());
    let store = ExtractorsStore::create(config.clone(), NAMESPACE, branch_count_schema()).unwrap();
    assert_eq!(fact_names(&store), vec!["branch_count"]);

    std::fs::write(
        file.path(),
        "soundcheck:\n  collectors:\n    branch:\n      collects:\n        - type: branchDescriptor\n          factName: branch_total\n",
    )
    .unwrap();
    config.reload().unwrap();

    assert_eq!(fact_names(&store), vec!["branch_total"]);
    assert!(config.get_optional("soundcheck.collectors.branch.collects").is_some());
}

#[test]
fn test_env_placeholders_expand_in_files() {
    std::env::set_var("BRANCHCOUNT_STORE_TEST_FACT", "branch_from_env");
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        "soundcheck:\n  collectors:\n    branch:\n      collects:\n        type: branchDescriptor\n        factName: ${{BRANCHCOUNT_STORE_TEST_FACT}}"
    )
    .unwrap();

    let config = Arc::new(AppConfig::from_file(file.path()).unwrap());
    let store = ExtractorsStore::create(config, NAMESPACE, branch_count_schema()).unwrap();
    assert_eq!(fact_names(&store), vec!["branch_from_env"]);
}
