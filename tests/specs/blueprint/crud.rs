// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/blueprints` CRUD and lifecycle routes (§6).

use serde_json::json;

use crate::prelude::TestDaemon;

#[tokio::test]
async fn create_then_get_round_trips_fields() {
    let daemon = TestDaemon::start().await;
    let created = daemon.create_blueprint("Ship the thing", Some("/tmp/project")).await;
    assert_eq!(created["title"], "Ship the thing");
    assert_eq!(created["status"], "draft");
    assert_eq!(created["starred"], false);

    let (status, fetched) = daemon.get(&format!("/blueprints/{}", created["id"].as_str().unwrap())).await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(fetched["id"], created["id"]);
    assert_eq!(fetched["projectCwd"], "/tmp/project");
    assert!(fetched["nodes"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn list_filters_by_status() {
    let daemon = TestDaemon::start().await;
    let draft = daemon.create_blueprint("Draft one", None).await;
    let approved = daemon.create_blueprint("Approved one", None).await;
    daemon.post_empty(&format!("/blueprints/{}/approve", approved["id"].as_str().unwrap())).await;

    let (status, all) = daemon.get("/blueprints").await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, drafts_only) = daemon.get("/blueprints?status=draft").await;
    let ids: Vec<&str> = drafts_only.as_array().unwrap().iter().map(|b| b["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec![draft["id"].as_str().unwrap()]);
}

#[tokio::test]
async fn unknown_status_filter_is_bad_request() {
    let daemon = TestDaemon::start().await;
    let (status, _) = daemon.get("/blueprints?status=bogus").await;
    assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_patches_only_supplied_fields() {
    let daemon = TestDaemon::start().await;
    let created = daemon.create_blueprint("Original title", Some("/tmp/a")).await;
    let id = created["id"].as_str().unwrap();

    let (status, updated) = daemon.put(&format!("/blueprints/{id}"), json!({ "title": "New title" })).await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(updated["title"], "New title");
    assert_eq!(updated["projectCwd"], "/tmp/a");
}

#[tokio::test]
async fn approve_requires_draft_status() {
    let daemon = TestDaemon::start().await;
    let created = daemon.create_blueprint("Needs approval", None).await;
    let id = created["id"].as_str().unwrap();

    let (status, approved) = daemon.post_empty(&format!("/blueprints/{id}/approve")).await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(approved["status"], "approved");

    let (status, body) = daemon.post_empty(&format!("/blueprints/{id}/approve")).await;
    assert_eq!(status, reqwest::StatusCode::PRECONDITION_FAILED, "re-approving already-approved blueprint: {body:?}");
}

#[tokio::test]
async fn archive_and_unarchive_round_trip() {
    let daemon = TestDaemon::start().await;
    let created = daemon.create_blueprint("Archive me", None).await;
    let id = created["id"].as_str().unwrap();

    let (status, _) = daemon.post_empty(&format!("/blueprints/{id}/archive")).await;
    assert_eq!(status, reqwest::StatusCode::OK);

    let (_, listed_default) = daemon.get("/blueprints").await;
    assert!(listed_default.as_array().unwrap().is_empty(), "archived blueprint should be hidden by default");

    let (_, listed_with_archived) = daemon.get("/blueprints?include_archived=true").await;
    assert_eq!(listed_with_archived.as_array().unwrap().len(), 1);

    let (status, _) = daemon.post_empty(&format!("/blueprints/{id}/unarchive")).await;
    assert_eq!(status, reqwest::StatusCode::OK);
    let (_, listed_again) = daemon.get("/blueprints").await;
    assert_eq!(listed_again.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn deleting_a_blueprint_cascades_its_nodes() {
    let daemon = TestDaemon::start().await;
    let bp = daemon.create_blueprint("Cascades", None).await;
    let bp_id = bp["id"].as_str().unwrap();
    let node = daemon.create_node(bp_id, "Step one", &[]).await;

    let (status, _) = daemon.delete(&format!("/blueprints/{bp_id}")).await;
    assert_eq!(status, reqwest::StatusCode::OK);

    let (status, _) = daemon.get(&format!("/blueprints/{bp_id}")).await;
    assert_eq!(status, reqwest::StatusCode::NOT_FOUND);

    let (status, _) = daemon.put(&format!("/blueprints/{bp_id}/nodes/{}", node["id"].as_str().unwrap()), json!({})).await;
    assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_unknown_blueprint_is_not_found() {
    let daemon = TestDaemon::start().await;
    let (status, _) = daemon.get("/blueprints/does-not-exist").await;
    assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
}
