
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use event_upgrader::{
    upgrade, upgrade_from, DuplicatePolicy, NestedVersion, Upgrader, UpgradeError, VersionFns, Record,
    MISSING_VERSION,
};
use serde_json::json;
use steps::{flatten_legacy, named_chain, record, stalls, todo_v1_v2, todo_v2_v3, TodoEvents};

// =============================================================================
// Walking the chain
// =============================================================================

#[test]
fn walks_to_target() {
    let upgrader = Upgrader::new(named_chain()).unwrap();
    let upgraded = upgrader
        .upgrade(&record(json!({ "version": "0.1" })), Some("0.3"))
        .unwrap();
    assert_eq!(upgraded, record(json!({ "version": "0.3", "name": "second upgrade" })));
}

#[test]
fn without_target_stops_where_no_step_matches() {
    let upgrader = Upgrader::new(vec![upgrade("0.1", "0.2", |r| {
        r.insert("name".into(), json!("first upgrade"));
    })])
    .unwrap();
    let upgraded = upgrader
        .upgrade(&record(json!({ "version": "0.1" })), None)
        .unwrap();
    assert_eq!(upgraded, record(json!({ "version": "0.2", "name": "first upgrade" })));
}

#[test]
fn missing_link_fails_the_target() {
    let upgrader = Upgrader::new(vec![upgrade("0.1", "0.2", |_| {})]).unwrap();
    let err = upgrader
        .upgrade(&record(json!({ "version": "0.1" })), Some("0.3"))
        .unwrap_err();
    assert!(err.is_target_not_reached());
    let message = err.to_string();
    assert!(message.contains("target version 0.3"));
    assert!(message.contains("event version 0.2"));
}

#[test]
fn no_version() {
    let upgrader = Upgrader::new(named_chain()).unwrap();
    let original = record(json!({ "test": "one" }));
    let upgraded = upgrader.upgrade(&original, None).unwrap();
    assert_eq!(upgraded, original);
    assert!(!upgraded.contains_key("version"));
    assert!(!upgraded.contains_key("name"));
}

#[test]
fn no_version_cannot_reach_a_target() {
    let upgrader = Upgrader::new(named_chain()).unwrap();
    let err = upgrader
        .upgrade(&record(json!({ "test": "one" })), Some("0.3"))
        .unwrap_err();
    assert!(matches!(
        err,
        UpgradeError::TargetNotReached { ref actual, .. } if actual == MISSING_VERSION
    ));
}

#[test]
fn caller_record_is_left_alone() {
    let upgrader = Upgrader::new(named_chain()).unwrap();
    let original = record(json!({ "test": "one", "version": "0.1" }));
    let snapshot = original.clone();
    let mut upgraded = upgrader.upgrade(&original, None).unwrap();
    upgraded.insert("later".into(), json!("mutation"));
    assert_eq!(original, snapshot);
}

#[test]
fn registration_order_does_not_matter() {
    let forward = Upgrader::new(vec![todo_v1_v2(), todo_v2_v3()]).unwrap();
    let backward = Upgrader::new(vec![todo_v2_v3(), todo_v1_v2()]).unwrap();
    let input = record(json!({ "version": "1", "task": "Buy milk" }));
    assert_eq!(
        forward.upgrade(&input, None).unwrap(),
        backward.upgrade(&input, None).unwrap()
    );
}

// =============================================================================
// Realistic chain: todo events
// =============================================================================

#[test]
fn todo_v1_to_v3() {
    let upgrader = Upgrader::from_set::<TodoEvents>().unwrap();
    let upgraded = upgrader
        .upgrade(&record(json!({ "version": "1", "task": "Walk dog" })), Some("3"))
        .unwrap();
    assert_eq!(
        upgraded,
        record(json!({ "version": "3", "title": "Walk dog", "priority": 0, "due_date": "" }))
    );
}

#[test]
fn todo_v2_keeps_its_priority() {
    let upgrader = Upgrader::from_set::<TodoEvents>().unwrap();
    let upgraded = upgrader
        .upgrade(
            &record(json!({ "version": "2", "task": "Read book", "priority": 5 })),
            None,
        )
        .unwrap();
    assert_eq!(upgraded["priority"], json!(5));
    assert_eq!(upgraded["version"], json!("3"));
}

#[test]
fn todo_v3_is_already_current() {
    let upgrader = Upgrader::from_set::<TodoEvents>().unwrap();
    let current = record(json!({ "version": "3", "title": "Cook", "priority": 2, "due_date": "2025-12-31" }));
    let (upgraded, path) = upgrader.upgrade_traced(&current, Some("3")).unwrap();
    assert_eq!(upgraded, current);
    assert_eq!(path.steps(), 0);
}

#[test]
fn transform_failure_surfaces_unchanged() {
    let upgrader = Upgrader::from_set::<TodoEvents>().unwrap();
    let err = upgrader
        .upgrade(&record(json!({ "version": "2" })), None)
        .unwrap_err();
    assert_eq!(err.to_string(), "todo event has no task");
    assert_eq!(err.version(), Some("2"));
}

#[test]
fn replacement_record_continues_the_walk() {
    let upgrader = Upgrader::new(vec![flatten_legacy(), todo_v1_v2(), todo_v2_v3()]).unwrap();
    let legacy = record(json!({ "version": "legacy", "body": { "task": "Sweep" }, "envelope": 1 }));
    let (upgraded, path) = upgrader.upgrade_traced(&legacy, None).unwrap();
    assert_eq!(path.versions(), ["legacy", "1", "2", "3"]);
    assert!(!upgraded.contains_key("envelope"));
    assert_eq!(upgraded["title"], json!("Sweep"));
}

// =============================================================================
// Failure modes
// =============================================================================

#[test]
fn stalled_step_fails_the_walk() {
    let upgrader = Upgrader::new(vec![stalls()]).unwrap();
    let err = upgrader
        .upgrade(&record(json!({ "version": "1" })), None)
        .unwrap_err();
    assert!(err.is_stalled());
    assert_eq!(err.to_string(), "upgrade did not change version number - 1");
}

#[test]
fn duplicate_registration_is_rejected() {
    let err = Upgrader::new(vec![stalls(), todo_v1_v2()]).unwrap_err();
    assert!(matches!(err, UpgradeError::DuplicateStep { ref version } if version == "1"));
}

#[test]
fn duplicate_registration_can_replace() {
    let upgrader = Upgrader::builder()
        .steps(vec![stalls(), todo_v1_v2()])
        .duplicates(DuplicatePolicy::Replace)
        .build()
        .unwrap();
    let upgraded = upgrader.upgrade(&record(json!({ "version": "1" })), None).unwrap();
    assert_eq!(upgraded["version"], json!("2"));
    assert!(!upgraded.contains_key("touched"));
}

#[test]
fn cycle_through_several_steps() {
    let upgrader = Upgrader::builder()
        .steps(vec![upgrade("x", "y", |_| {}), upgrade("y", "x", |_| {})])
        .detect_cycles(true)
        .build()
        .unwrap();
    let err = upgrader.upgrade(&record(json!({ "version": "x" })), None).unwrap_err();
    assert!(matches!(err, UpgradeError::Cycle { steps: 2, .. }));
}

#[test]
fn content_routed_loop_finishes_without_cycle_detection() {
    let upgrader = Upgrader::new(vec![
        upgrade("draft", "review", |r| {
            let rounds = r.get("rounds").and_then(|v| v.as_u64()).unwrap_or(0);
            r.insert("rounds".into(), json!(rounds + 1));
        }),
        upgrade_from("review", |r| {
            let next = if r["rounds"] == json!(3) { "published" } else { "draft" };
            r.insert("version".into(), json!(next));
        }),
    ])
    .unwrap();
    let upgraded = upgrader
        .upgrade(&record(json!({ "version": "draft" })), Some("published"))
        .unwrap();
    assert_eq!(upgraded["rounds"], json!(3));
}

#[test]
fn target_the_accessor_cannot_hold_is_rejected() {
    let accessor = VersionFns::new(
        |r: &Record| r.get("v").map(|v| v.to_string()).unwrap_or_default(),
        |r: &mut Record, version: &str| {
            r.insert("v".into(), json!(version.parse::<u64>().unwrap_or(0)));
        },
    );
    let upgrader = Upgrader::builder()
        .accessor(accessor)
        .step(upgrade("1", "2.5", |_| {}))
        .build()
        .unwrap();
    let err = upgrader.upgrade(&record(json!({ "v": 1 })), None).unwrap_err();
    assert!(matches!(err, UpgradeError::TargetMismatch { ref actual, .. } if actual == "0"));
}

// =============================================================================
// Custom accessors
// =============================================================================

#[test]
fn header_version() {
    let upgrader = Upgrader::builder()
        .accessor(NestedVersion::new(["header"], "schema"))
        .steps(named_chain())
        .build()
        .unwrap();
    let upgraded = upgrader
        .upgrade(&record(json!({ "header": { "schema": "0.1" }, "version": "untouched" })), Some("0.3"))
        .unwrap();
    assert_eq!(upgraded["header"], json!({ "schema": "0.3" }));
    assert_eq!(upgraded["version"], json!("untouched"));
    assert_eq!(upgraded["name"], json!("second upgrade"));
}

#[test]
fn accessor_closures_are_called_for_every_read() {
    let reads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&reads);
    let accessor = VersionFns::new(
        move |r: &Record| {
            counter.fetch_add(1, Ordering::SeqCst);
            r.get("v").and_then(|v| v.as_u64()).unwrap_or(0).to_string()
        },
        |r: &mut Record, version: &str| {
            let number: u64 = version.parse().unwrap_or(0);
            r.insert("v".into(), json!(number));
        },
    );
    let upgrader = Upgrader::builder()
        .accessor(accessor)
        .step(upgrade("1", "2", |_| {}))
        .step(upgrade("2", "3", |_| {}))
        .build()
        .unwrap();

    let upgraded = upgrader.upgrade(&record(json!({ "v": 1 })), Some("3")).unwrap();
    assert_eq!(upgraded["v"], json!(3));
    assert!(reads.load(Ordering::SeqCst) > 0);
}
