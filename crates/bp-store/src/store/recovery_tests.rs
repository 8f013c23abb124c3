// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::Store;
use bp_core::{ExecutionStatus, ExecutionType, NodeStatus};

fn setup_running(store: &Store) -> (bp_core::MacroNodeId, bp_core::ExecutionId) {
    let bp = store.create_blueprint("BP", None, Some("/tmp/p")).unwrap();
    let node = store
        .create_node(&bp.id, "Step", None, None, vec![], None, None, "claude-code")
        .unwrap();
    store.update_node_status(&node.id, NodeStatus::Running, None).unwrap();
    let exec = store
        .create_execution(&node.id, &bp.id, ExecutionType::Primary, None, None)
        .unwrap();
    (node.id, exec.id)
}

#[test]
fn get_stale_running_executions_includes_project_cwd() {
    let store = Store::open_in_memory().unwrap();
    let (_node_id, exec_id) = setup_running(&store);

    let stale = store.get_stale_running_executions().unwrap();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].execution_id, exec_id);
    assert_eq!(stale[0].project_cwd.as_deref(), Some("/tmp/p"));
}

#[test]
fn orphaned_queued_nodes_surface() {
    let store = Store::open_in_memory().unwrap();
    let bp = store.create_blueprint("BP", None, None).unwrap();
    let node = store
        .create_node(&bp.id, "Step", None, None, vec![], None, None, "claude-code")
        .unwrap();
    store.update_node_status(&node.id, NodeStatus::Queued, None).unwrap();

    let orphans = store.get_orphaned_queued_nodes().unwrap();
    assert_eq!(orphans, vec![node.id]);
}

#[test]
fn recover_stale_executions_marks_all_but_skip_list_failed() {
    let store = Store::open_in_memory().unwrap();
    let (node_a, exec_a) = setup_running(&store);
    let (node_b, exec_b) = setup_running(&store);

    let recovered = store.recover_stale_executions(&[exec_a.clone()]).unwrap();
    assert_eq!(recovered, 1);

    let fetched_a = store.get_execution(&exec_a).unwrap().unwrap();
    assert_eq!(fetched_a.status, ExecutionStatus::Running);

    let fetched_b = store.get_execution(&exec_b).unwrap().unwrap();
    assert_eq!(fetched_b.status, ExecutionStatus::Failed);
    assert!(fetched_b.output_summary.as_deref().unwrap().contains("restarted_by_recovery_supervisor"));

    let node_a_row = store.get_node(&node_a).unwrap().unwrap();
    assert_eq!(node_a_row.status, NodeStatus::Running);
    let node_b_row = store.get_node(&node_b).unwrap().unwrap();
    assert_eq!(node_b_row.status, NodeStatus::Failed);
}

#[test]
fn recent_restart_failed_executions_within_lookback() {
    let store = Store::open_in_memory().unwrap();
    let (_node_id, exec_id) = setup_running(&store);
    store.recover_stale_executions(&[]).unwrap();

    let cohort_b = store.get_recent_restart_failed_executions(10).unwrap();
    assert_eq!(cohort_b.len(), 1);
    assert_eq!(cohort_b[0].execution_id, exec_id);
}

#[test]
fn revert_execution_to_running_clears_the_force_failure() {
    let store = Store::open_in_memory().unwrap();
    let (node_id, exec_id) = setup_running(&store);
    store.recover_stale_executions(&[]).unwrap();

    store.revert_execution_to_running(&exec_id, &node_id).unwrap();

    let exec = store.get_execution(&exec_id).unwrap().unwrap();
    assert_eq!(exec.status, ExecutionStatus::Running);
    assert!(exec.output_summary.is_none());
    assert!(exec.completed_at.is_none());

    let node = store.get_node(&node_id).unwrap().unwrap();
    assert_eq!(node.status, NodeStatus::Running);
    assert!(node.error.is_none());
}
