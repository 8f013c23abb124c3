// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recovery Supervisor (§4.7): classifying a crashed daemon's `running`
//! executions as alive, dead, or silently completed after a restart.

use std::time::Duration;

use uuid::Uuid;

use crate::prelude::{with_db, write_session_file, TestDaemon};

const WAIT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn alive_execution_survives_a_restart_as_running() {
    let mut daemon = TestDaemon::start_with_env(&[("AGENT_MODE", "sleep_then_exit"), ("AGENT_SLEEP_SECS", "30")]).await;
    let cwd = daemon.project_cwd();
    let bp = daemon.create_blueprint("Survivable crash", Some(&cwd)).await;
    let bp_id = bp["id"].as_str().unwrap().to_string();
    let node = daemon.create_node(&bp_id, "Long-running step", &[]).await;
    let node_id = node["id"].as_str().unwrap().to_string();

    daemon.post_empty(&format!("/blueprints/{bp_id}/nodes/{node_id}/run")).await;
    daemon.wait_for_node_status(&bp_id, &node_id, "running", WAIT).await;
    // give the `on_pid` callback a moment to persist the child's pid before
    // the kill, so the restart's liveness probe has something to check.
    tokio::time::sleep(Duration::from_millis(200)).await;

    daemon.kill9();
    daemon.restart().await;

    let (status, with_nodes) = daemon.get(&format!("/blueprints/{bp_id}")).await;
    assert_eq!(status, reqwest::StatusCode::OK);
    let node_after = with_nodes["nodes"].as_array().unwrap().iter().find(|n| n["id"] == node_id).unwrap();
    assert_eq!(node_after["status"], "running", "a still-alive child process should survive the restart: {node_after:?}");
}

#[tokio::test]
async fn dead_execution_is_failed_with_restart_sentinel_on_restart() {
    let mut daemon = TestDaemon::start_with_env(&[("AGENT_MODE", "sleep_then_exit"), ("AGENT_SLEEP_SECS", "2")]).await;
    let cwd = daemon.project_cwd();
    let bp = daemon.create_blueprint("Unlucky crash", Some(&cwd)).await;
    let bp_id = bp["id"].as_str().unwrap().to_string();
    let node = daemon.create_node(&bp_id, "Short-lived step", &[]).await;
    let node_id = node["id"].as_str().unwrap().to_string();

    daemon.post_empty(&format!("/blueprints/{bp_id}/nodes/{node_id}/run")).await;
    daemon.wait_for_node_status(&bp_id, &node_id, "running", WAIT).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Kill the daemon while its child is still sleeping, then let the
    // orphaned child run its sleep out and exit on its own before the
    // daemon comes back, so the restart sees a genuinely-dead PID with no
    // session id ever having been discovered.
    daemon.kill9();
    tokio::time::sleep(Duration::from_secs(3)).await;
    daemon.restart().await;

    let finished = daemon.wait_for_node_status(&bp_id, &node_id, "failed", WAIT).await;
    assert!(
        finished["error"].as_str().unwrap().contains("restarted_by_recovery_supervisor"),
        "{finished:?}"
    );
}

#[tokio::test]
async fn silently_completed_execution_is_finalized_done_on_restart() {
    let mut daemon = TestDaemon::start().await;
    let cwd = daemon.project_cwd();
    let bp = daemon.create_blueprint("Finished but never told us", Some(&cwd)).await;
    let bp_id = bp["id"].as_str().unwrap().to_string();
    let node = daemon.create_node(&bp_id, "Quietly finished step", &[]).await;
    let node_id = node["id"].as_str().unwrap().to_string();

    daemon.kill9();

    let session_id = Uuid::new_v4().to_string();
    write_session_file(daemon.project_dir.path(), &session_id, "Finished the refactor and updated the call sites.");

    let exec_id = format!("exec-{}", Uuid::new_v4());
    let started_at = chrono::Utc::now().to_rfc3339();
    with_db(&daemon, |conn| {
        conn.execute(
            "INSERT INTO node_executions (id, node_id, blueprint_id, session_id, execution_type, status, started_at) \
             VALUES (?1, ?2, ?3, ?4, 'primary', 'running', ?5)",
            rusqlite::params![exec_id, node_id, bp_id, session_id, started_at],
        )
        .expect("seed stale running execution");
        conn.execute(
            "UPDATE macro_nodes SET status = 'running' WHERE id = ?1",
            rusqlite::params![node_id],
        )
        .expect("mark node running to match the seeded execution");
    });

    daemon.restart().await;

    daemon.wait_for_node_status(&bp_id, &node_id, "done", WAIT).await;
}
