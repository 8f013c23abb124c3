// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/blueprints/:id/nodes` create/reorder/batch-create and per-node run
//! preconditions (§6, §4.6.1).

use serde_json::{json, Value};

use crate::prelude::TestDaemon;

#[tokio::test]
async fn create_appends_in_order() {
    let daemon = TestDaemon::start().await;
    let bp = daemon.create_blueprint("Graph", None).await;
    let bp_id = bp["id"].as_str().unwrap();

    let first = daemon.create_node(bp_id, "First", &[]).await;
    let second = daemon.create_node(bp_id, "Second", &[]).await;
    assert!(second["order"].as_i64().unwrap() > first["order"].as_i64().unwrap());
}

#[tokio::test]
async fn create_with_at_order_inserts_and_shifts() {
    let daemon = TestDaemon::start().await;
    let bp = daemon.create_blueprint("Graph", None).await;
    let bp_id = bp["id"].as_str().unwrap();

    let first = daemon.create_node(bp_id, "First", &[]).await;
    let third = daemon.create_node(bp_id, "Third", &[]).await;

    let (status, inserted) = daemon
        .post(
            &format!("/blueprints/{bp_id}/nodes"),
            json!({ "title": "Second", "dependencies": [], "at_order": 1 }),
        )
        .await;
    assert_eq!(status, reqwest::StatusCode::OK, "{inserted:?}");

    let (_, with_nodes) = daemon.get(&format!("/blueprints/{bp_id}")).await;
    let nodes = with_nodes["nodes"].as_array().unwrap();
    let order_of = |id: &str| nodes.iter().find(|n| n["id"] == id).unwrap()["order"].as_i64().unwrap();
    assert!(order_of(first["id"].as_str().unwrap()) < order_of(inserted["id"].as_str().unwrap()));
    assert!(order_of(inserted["id"].as_str().unwrap()) < order_of(third["id"].as_str().unwrap()));
}

#[tokio::test]
async fn dependencies_are_validated_and_surfaced() {
    let daemon = TestDaemon::start().await;
    let bp = daemon.create_blueprint("Graph", None).await;
    let bp_id = bp["id"].as_str().unwrap();

    let upstream = daemon.create_node(bp_id, "Upstream", &[]).await;
    let downstream = daemon.create_node(bp_id, "Downstream", &[upstream["id"].as_str().unwrap()]).await;
    assert_eq!(downstream["dependencies"].as_array().unwrap(), &vec![upstream["id"].clone()]);
}

#[tokio::test]
async fn reorder_updates_ordinals() {
    let daemon = TestDaemon::start().await;
    let bp = daemon.create_blueprint("Graph", None).await;
    let bp_id = bp["id"].as_str().unwrap();

    let a = daemon.create_node(bp_id, "A", &[]).await;
    let b = daemon.create_node(bp_id, "B", &[]).await;
    let c = daemon.create_node(bp_id, "C", &[]).await;

    let ids = [c["id"].as_str().unwrap(), a["id"].as_str().unwrap(), b["id"].as_str().unwrap()];
    let (status, body) = daemon.post(&format!("/blueprints/{bp_id}/nodes/reorder"), json!({ "ordered_ids": ids })).await;
    assert_eq!(status, reqwest::StatusCode::OK, "{body:?}");

    let (_, with_nodes) = daemon.get(&format!("/blueprints/{bp_id}")).await;
    let nodes = with_nodes["nodes"].as_array().unwrap();
    let order_of = |id: &str| nodes.iter().find(|n| n["id"] == id).unwrap()["order"].as_i64().unwrap();
    assert!(order_of(c["id"].as_str().unwrap()) < order_of(a["id"].as_str().unwrap()));
    assert!(order_of(a["id"].as_str().unwrap()) < order_of(b["id"].as_str().unwrap()));
}

#[tokio::test]
async fn batch_create_resolves_intra_batch_indices_and_existing_ids() {
    let daemon = TestDaemon::start().await;
    let bp = daemon.create_blueprint("Graph", None).await;
    let bp_id = bp["id"].as_str().unwrap();

    let existing = daemon.create_node(bp_id, "Pre-existing", &[]).await;

    let (status, created) = daemon
        .post(
            &format!("/blueprints/{bp_id}/nodes/batch-create"),
            json!({
                "nodes": [
                    { "title": "Batch root", "dependencies": [existing["id"].as_str().unwrap()] },
                    { "title": "Batch child", "dependencies": [0] }
                ]
            }),
        )
        .await;
    assert_eq!(status, reqwest::StatusCode::OK, "{created:?}");
    let created = created.as_array().unwrap();
    assert_eq!(created.len(), 2);
    assert_eq!(created[0]["dependencies"].as_array().unwrap(), &vec![existing["id"].clone()]);
    assert_eq!(created[1]["dependencies"].as_array().unwrap(), &vec![created[0]["id"].clone()]);
}

#[tokio::test]
async fn batch_create_rejects_out_of_range_index() {
    let daemon = TestDaemon::start().await;
    let bp = daemon.create_blueprint("Graph", None).await;
    let bp_id = bp["id"].as_str().unwrap();

    let (status, body) = daemon
        .post(
            &format!("/blueprints/{bp_id}/nodes/batch-create"),
            json!({ "nodes": [ { "title": "Orphan", "dependencies": [7] } ] }),
        )
        .await;
    assert_eq!(status, reqwest::StatusCode::BAD_REQUEST, "{body:?}");
}

#[tokio::test]
async fn node_from_another_blueprint_is_rejected() {
    let daemon = TestDaemon::start().await;
    let bp_a = daemon.create_blueprint("A", None).await;
    let bp_b = daemon.create_blueprint("B", None).await;
    let node_in_a = daemon.create_node(bp_a["id"].as_str().unwrap(), "Node", &[]).await;

    let (status, body) = daemon
        .put(
            &format!("/blueprints/{}/nodes/{}", bp_b["id"].as_str().unwrap(), node_in_a["id"].as_str().unwrap()),
            json!({ "title": "Hijacked" }),
        )
        .await;
    assert_eq!(status, reqwest::StatusCode::BAD_REQUEST, "{body:?}");
}

#[tokio::test]
async fn run_on_a_node_with_unsatisfied_dependency_is_precondition_failed() {
    let daemon = TestDaemon::start().await;
    let bp = daemon.create_blueprint("Graph", None).await;
    let bp_id = bp["id"].as_str().unwrap();
    let upstream = daemon.create_node(bp_id, "Upstream", &[]).await;
    let downstream = daemon.create_node(bp_id, "Downstream", &[upstream["id"].as_str().unwrap()]).await;

    let (status, body) = daemon
        .post_empty(&format!("/blueprints/{bp_id}/nodes/{}/run", downstream["id"].as_str().unwrap()))
        .await;
    // Node is still Pending (is_runnable), so run is accepted and queued; the
    // executor itself is what refuses to start it ahead of its dependency.
    assert_eq!(status, reqwest::StatusCode::OK, "{body:?}");
}

#[tokio::test]
async fn run_on_nonexistent_node_is_not_found() {
    let daemon = TestDaemon::start().await;
    let bp = daemon.create_blueprint("Graph", None).await;
    let bp_id = bp["id"].as_str().unwrap();

    let (status, body) = daemon.post_empty(&format!("/blueprints/{bp_id}/nodes/does-not-exist/run")).await;
    assert_eq!(status, reqwest::StatusCode::NOT_FOUND, "{body:?}");
}

#[tokio::test]
async fn unqueue_with_nothing_queued_is_not_found() {
    let daemon = TestDaemon::start().await;
    let bp = daemon.create_blueprint("Graph", None).await;
    let bp_id = bp["id"].as_str().unwrap();
    let node = daemon.create_node(bp_id, "Alone", &[]).await;

    let (status, body) = daemon.post_empty(&format!("/blueprints/{bp_id}/nodes/{}/unqueue", node["id"].as_str().unwrap())).await;
    assert_eq!(status, reqwest::StatusCode::NOT_FOUND, "{body:?}");
}

#[tokio::test]
async fn evaluate_before_node_is_done_is_precondition_failed() {
    let daemon = TestDaemon::start().await;
    let bp = daemon.create_blueprint("Graph", None).await;
    let bp_id = bp["id"].as_str().unwrap();
    let node = daemon.create_node(bp_id, "Not done yet", &[]).await;

    let (status, body) = daemon.post_empty(&format!("/blueprints/{bp_id}/nodes/{}/evaluate", node["id"].as_str().unwrap())).await;
    assert_eq!(status, reqwest::StatusCode::PRECONDITION_FAILED, "{body:?}");
}

#[tokio::test]
async fn delete_node_removes_it_from_blueprint() {
    let daemon = TestDaemon::start().await;
    let bp = daemon.create_blueprint("Graph", None).await;
    let bp_id = bp["id"].as_str().unwrap();
    let node = daemon.create_node(bp_id, "Doomed", &[]).await;

    let (status, _) = daemon.delete(&format!("/blueprints/{bp_id}/nodes/{}", node["id"].as_str().unwrap())).await;
    assert_eq!(status, reqwest::StatusCode::OK);

    let (_, with_nodes) = daemon.get(&format!("/blueprints/{bp_id}")).await;
    assert!(with_nodes["nodes"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn delete_node_with_a_dependent_is_local_not_blocked() {
    // §3: node deletion does not cascade to dependents — dependents keep the
    // dangling id, filtered out when resolving readiness, rather than
    // blocking the delete outright.
    let daemon = TestDaemon::start().await;
    let bp = daemon.create_blueprint("Graph", None).await;
    let bp_id = bp["id"].as_str().unwrap();
    let a = daemon.create_node(bp_id, "A", &[]).await;
    let a_id = a["id"].as_str().unwrap().to_string();
    let b = daemon.create_node(bp_id, "B", &[a_id.as_str()]).await;
    let b_id = b["id"].as_str().unwrap().to_string();

    let (status, body) = daemon.delete(&format!("/blueprints/{bp_id}/nodes/{a_id}")).await;
    assert_eq!(status, reqwest::StatusCode::OK, "{body:?}");

    let (_, with_nodes) = daemon.get(&format!("/blueprints/{bp_id}")).await;
    let nodes = with_nodes["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 1, "only the deleted node's own row is gone");
    let b_after = nodes.iter().find(|n| n["id"] == b_id).unwrap();
    assert_eq!(
        b_after["dependencies"].as_array().unwrap(),
        &[Value::String(a_id)],
        "B keeps the dangling dependency id"
    );
    assert_eq!(b_after["status"], "pending");

    let (status, body) = daemon.post_empty(&format!("/blueprints/{bp_id}/nodes/{b_id}/run")).await;
    assert_eq!(status, reqwest::StatusCode::OK, "a node whose only dependency was deleted must still be runnable: {body:?}");
}
