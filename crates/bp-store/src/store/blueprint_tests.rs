// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::Store;
use bp_core::BlueprintStatus;

#[test]
fn create_and_get_round_trips() {
    let store = Store::open_in_memory().unwrap();
    let bp = store
        .create_blueprint("Ship feature", Some("desc"), Some("/tmp/proj"))
        .unwrap();
    assert_eq!(bp.status, BlueprintStatus::Draft);
    assert!(!bp.starred);

    let fetched = store.get_blueprint(&bp.id).unwrap().unwrap();
    assert_eq!(fetched.title, "Ship feature");
    assert_eq!(fetched.description.as_deref(), Some("desc"));
}

#[test]
fn get_missing_returns_none() {
    let store = Store::open_in_memory().unwrap();
    let missing = bp_core::BlueprintId::new("does-not-exist");
    assert!(store.get_blueprint(&missing).unwrap().is_none());
}

#[test]
fn archived_excluded_from_default_listing() {
    let store = Store::open_in_memory().unwrap();
    let bp = store.create_blueprint("Archived one", None, None).unwrap();
    store.archive_blueprint(&bp.id).unwrap();

    let visible = store.list_blueprints(None, None, false).unwrap();
    assert!(visible.is_empty());

    let all = store.list_blueprints(None, None, true).unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].is_archived());
}

#[test]
fn archived_reference_stays_valid() {
    let store = Store::open_in_memory().unwrap();
    let bp = store.create_blueprint("Archived", None, None).unwrap();
    store.archive_blueprint(&bp.id).unwrap();
    let still_there = store.get_blueprint(&bp.id).unwrap();
    assert!(still_there.is_some());
}

#[test]
fn starred_sorts_before_unstarred() {
    let store = Store::open_in_memory().unwrap();
    let _a = store.create_blueprint("A", None, None).unwrap();
    let b = store.create_blueprint("B", None, None).unwrap();
    store.set_blueprint_starred(&b.id, true).unwrap();

    let listed = store.list_blueprints(None, None, false).unwrap();
    assert_eq!(listed[0].id, b.id);
    assert!(listed[0].starred);
}

#[test]
fn delete_cascades_to_nodes() {
    let store = Store::open_in_memory().unwrap();
    let bp = store.create_blueprint("Cascade", None, None).unwrap();
    let node = store
        .create_node(&bp.id, "Step 1", None, None, vec![], None, None, "claude-code")
        .unwrap();
    store.delete_blueprint(&bp.id).unwrap();
    assert!(store.get_node(&node.id).unwrap().is_none());
}

#[test]
fn update_blueprint_partial_fields() {
    let store = Store::open_in_memory().unwrap();
    let bp = store.create_blueprint("Old title", Some("old desc"), None).unwrap();
    let updated = store
        .update_blueprint(&bp.id, Some("New title"), None, None)
        .unwrap();
    assert_eq!(updated.title, "New title");
    assert_eq!(updated.description.as_deref(), Some("old desc"));
}
