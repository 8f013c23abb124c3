// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end node-execution scenarios (§4.6.2, §8), each driven by the fake
//! coding-agent script in a distinct `AGENT_MODE`/`AGENT_EVAL_MODE`.

use std::time::Duration;

use crate::prelude::TestDaemon;

const WAIT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn linear_chain_completes_via_run_all() {
    let daemon = TestDaemon::start().await;
    let cwd = daemon.project_cwd();
    let bp = daemon.create_blueprint("Chain", Some(&cwd)).await;
    let bp_id = bp["id"].as_str().unwrap().to_string();

    let a = daemon.create_node(&bp_id, "Step A", &[]).await;
    let b = daemon.create_node(&bp_id, "Step B", &[a["id"].as_str().unwrap()]).await;
    let c = daemon.create_node(&bp_id, "Step C", &[b["id"].as_str().unwrap()]).await;

    let (status, _) = daemon.post_empty(&format!("/blueprints/{bp_id}/run-all")).await;
    assert_eq!(status, reqwest::StatusCode::OK);

    let final_bp = daemon.wait_for_blueprint_status(&bp_id, "done", WAIT).await;
    let nodes = final_bp["nodes"].as_array().unwrap();
    for node_id in [a["id"].as_str().unwrap(), b["id"].as_str().unwrap(), c["id"].as_str().unwrap()] {
        let node = nodes.iter().find(|n| n["id"] == node_id).unwrap();
        assert_eq!(node["status"], "done", "node {node_id}: {node:?}");
    }
}

#[tokio::test]
async fn reported_failed_status_wins_over_plausible_looking_stdout() {
    let daemon = TestDaemon::start_with_env(&[("AGENT_MODE", "reported_status_wins")]).await;
    let cwd = daemon.project_cwd();
    let bp = daemon.create_blueprint("Misleading transcript", Some(&cwd)).await;
    let bp_id = bp["id"].as_str().unwrap().to_string();
    let node = daemon.create_node(&bp_id, "Looks done, isn't", &[]).await;
    let node_id = node["id"].as_str().unwrap().to_string();

    let (status, _) = daemon.post_empty(&format!("/blueprints/{bp_id}/nodes/{node_id}/run")).await;
    assert_eq!(status, reqwest::StatusCode::OK);

    let finished = daemon.wait_for_node_status(&bp_id, &node_id, "failed", WAIT).await;
    assert!(finished["error"].as_str().unwrap().contains("actually failed"), "{finished:?}");
}

#[tokio::test]
async fn blocker_report_marks_node_blocked_not_failed() {
    let daemon = TestDaemon::start_with_env(&[("AGENT_MODE", "blocked")]).await;
    let cwd = daemon.project_cwd();
    let bp = daemon.create_blueprint("Needs a key", Some(&cwd)).await;
    let bp_id = bp["id"].as_str().unwrap().to_string();
    let node = daemon.create_node(&bp_id, "Deploy to staging", &[]).await;
    let node_id = node["id"].as_str().unwrap().to_string();

    daemon.post_empty(&format!("/blueprints/{bp_id}/nodes/{node_id}/run")).await;
    daemon.wait_for_node_status(&bp_id, &node_id, "blocked", WAIT).await;
}

#[tokio::test]
async fn short_stdout_with_no_callback_is_treated_as_hung() {
    let daemon = TestDaemon::start_with_env(&[("AGENT_MODE", "hung_short_output")]).await;
    let cwd = daemon.project_cwd();
    let bp = daemon.create_blueprint("Silent short run", Some(&cwd)).await;
    let bp_id = bp["id"].as_str().unwrap().to_string();
    let node = daemon.create_node(&bp_id, "Mystery task", &[]).await;
    let node_id = node["id"].as_str().unwrap().to_string();

    daemon.post_empty(&format!("/blueprints/{bp_id}/nodes/{node_id}/run")).await;
    daemon.wait_for_node_status(&bp_id, &node_id, "failed", WAIT).await;
}

#[tokio::test]
async fn long_stdout_with_no_callback_is_inferred_done() {
    let daemon = TestDaemon::start_with_env(&[("AGENT_MODE", "silent_long_output")]).await;
    let cwd = daemon.project_cwd();
    let bp = daemon.create_blueprint("Silent long run", Some(&cwd)).await;
    let bp_id = bp["id"].as_str().unwrap().to_string();
    let node = daemon.create_node(&bp_id, "Quiet but thorough", &[]).await;
    let node_id = node["id"].as_str().unwrap().to_string();

    daemon.post_empty(&format!("/blueprints/{bp_id}/nodes/{node_id}/run")).await;
    daemon.wait_for_node_status(&bp_id, &node_id, "done", WAIT).await;
}

#[tokio::test]
async fn explicit_failure_report_fails_the_node() {
    let daemon = TestDaemon::start_with_env(&[("AGENT_MODE", "fail")]).await;
    let cwd = daemon.project_cwd();
    let bp = daemon.create_blueprint("Explicit failure", Some(&cwd)).await;
    let bp_id = bp["id"].as_str().unwrap().to_string();
    let node = daemon.create_node(&bp_id, "Doomed task", &[]).await;
    let node_id = node["id"].as_str().unwrap().to_string();

    daemon.post_empty(&format!("/blueprints/{bp_id}/nodes/{node_id}/run")).await;
    let finished = daemon.wait_for_node_status(&bp_id, &node_id, "failed", WAIT).await;
    assert!(finished["error"].as_str().unwrap().contains("simulated failure"), "{finished:?}");
}

#[tokio::test]
async fn automatic_evaluation_can_insert_a_node_between() {
    let daemon = TestDaemon::start_with_env(&[("AGENT_EVAL_MODE", "insert_between")]).await;
    let cwd = daemon.project_cwd();
    let bp = daemon.create_blueprint("Needs follow-up", Some(&cwd)).await;
    let bp_id = bp["id"].as_str().unwrap().to_string();
    let node = daemon.create_node(&bp_id, "Implement the feature", &[]).await;
    let node_id = node["id"].as_str().unwrap().to_string();

    daemon.post_empty(&format!("/blueprints/{bp_id}/nodes/{node_id}/run")).await;
    daemon.wait_for_node_status(&bp_id, &node_id, "done", WAIT).await;

    // the verdict's mutation is applied asynchronously right after the node
    // finishes; give the evaluation callback a moment to land.
    let deadline = std::time::Instant::now() + WAIT;
    loop {
        let (_, with_nodes) = daemon.get(&format!("/blueprints/{bp_id}")).await;
        let nodes = with_nodes["nodes"].as_array().unwrap();
        if nodes.len() > 1 {
            assert!(nodes.iter().any(|n| n["title"] == "Add regression tests"), "{nodes:?}");
            break;
        }
        if std::time::Instant::now() >= deadline {
            panic!("evaluation never inserted the follow-up node; nodes: {nodes:?}");
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn automatic_evaluation_can_add_a_sibling_for_a_blocker() {
    let daemon = TestDaemon::start_with_env(&[("AGENT_EVAL_MODE", "add_sibling")]).await;
    let cwd = daemon.project_cwd();
    let bp = daemon.create_blueprint("Leaves a blocker behind", Some(&cwd)).await;
    let bp_id = bp["id"].as_str().unwrap().to_string();
    let node = daemon.create_node(&bp_id, "Wire up the integration", &[]).await;
    let node_id = node["id"].as_str().unwrap().to_string();

    daemon.post_empty(&format!("/blueprints/{bp_id}/nodes/{node_id}/run")).await;
    daemon.wait_for_node_status(&bp_id, &node_id, "done", WAIT).await;

    let deadline = std::time::Instant::now() + WAIT;
    loop {
        let (_, with_nodes) = daemon.get(&format!("/blueprints/{bp_id}")).await;
        let nodes = with_nodes["nodes"].as_array().unwrap();
        if nodes.len() > 1 {
            assert!(nodes.iter().any(|n| n["title"] == "Unblock the thing"), "{nodes:?}");
            break;
        }
        if std::time::Instant::now() >= deadline {
            panic!("evaluation never added the sibling node; nodes: {nodes:?}");
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn run_all_stops_and_fails_blueprint_on_first_node_failure() {
    let daemon = TestDaemon::start_with_env(&[("AGENT_MODE", "fail")]).await;
    let cwd = daemon.project_cwd();
    let bp = daemon.create_blueprint("Chain with a bad link", Some(&cwd)).await;
    let bp_id = bp["id"].as_str().unwrap().to_string();
    let a = daemon.create_node(&bp_id, "Step A", &[]).await;
    let b = daemon.create_node(&bp_id, "Step B", &[a["id"].as_str().unwrap()]).await;

    daemon.post_empty(&format!("/blueprints/{bp_id}/run-all")).await;

    let final_bp = daemon.wait_for_blueprint_status(&bp_id, "failed", WAIT).await;
    let nodes = final_bp["nodes"].as_array().unwrap();
    let node_a = nodes.iter().find(|n| n["id"] == a["id"]).unwrap();
    let node_b = nodes.iter().find(|n| n["id"] == b["id"]).unwrap();
    assert_eq!(node_a["status"], "failed");
    assert_eq!(node_b["status"], "pending", "downstream node should be reverted, not left queued");
}
