// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/blueprints/:id/nodes` CRUD, reorder, and batch-create routes (§6).

use axum::extract::{Path, State};
use axum::Json;
use bp_core::{BlueprintId, EngineError, MacroNode, MacroNodeId};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBody {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    at_order: Option<i64>,
    #[serde(default)]
    estimated_minutes: Option<i64>,
    #[serde(default = "default_agent_type")]
    agent_type: String,
}

fn default_agent_type() -> String {
    "claude-code".to_string()
}

pub async fn create(State(state): State<AppState>, Path(id): Path<String>, Json(body): Json<CreateBody>) -> ApiResult<Json<MacroNode>> {
    let blueprint_id = BlueprintId::new(id);
    let dependencies = body.dependencies.into_iter().map(MacroNodeId::new).collect();
    let node = state.store.create_node(
        &blueprint_id,
        &body.title,
        body.description.as_deref(),
        body.prompt.as_deref(),
        dependencies,
        body.at_order,
        body.estimated_minutes,
        &body.agent_type,
    )?;
    Ok(Json(node))
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateBody {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<Option<String>>,
    #[serde(default)]
    prompt: Option<Option<String>>,
    #[serde(default)]
    estimated_minutes: Option<Option<i64>>,
    #[serde(default)]
    parallel_group: Option<Option<String>>,
}

pub async fn update(
    State(state): State<AppState>,
    Path((id, node_id)): Path<(String, String)>,
    Json(body): Json<UpdateBody>,
) -> ApiResult<Json<MacroNode>> {
    let node_id = belongs_to(&state, &id, node_id)?;
    let node = state.store.update_node_fields(
        &node_id,
        body.title.as_deref(),
        body.description.as_ref().map(|d| d.as_deref()),
        body.prompt.as_ref().map(|p| p.as_deref()),
        body.estimated_minutes,
        body.parallel_group.as_ref().map(|p| p.as_deref()),
    )?;
    Ok(Json(node))
}

pub async fn delete(State(state): State<AppState>, Path((id, node_id)): Path<(String, String)>) -> ApiResult<Json<Value>> {
    let node_id = belongs_to(&state, &id, node_id)?;
    state.store.delete_node(&node_id)?;
    Ok(Json(json!({ "status": "deleted" })))
}

#[derive(Debug, Deserialize)]
pub struct ReorderBody {
    ordered_ids: Vec<String>,
}

pub async fn reorder(State(state): State<AppState>, Path(id): Path<String>, Json(body): Json<ReorderBody>) -> ApiResult<Json<Value>> {
    let blueprint_id = BlueprintId::new(id);
    let ids: Vec<MacroNodeId> = body.ordered_ids.into_iter().map(MacroNodeId::new).collect();
    state.store.reorder_nodes(&blueprint_id, &ids)?;
    Ok(Json(json!({ "status": "reordered" })))
}

/// One entry of a `batch-create` request: `dependencies` may reference
/// either an already-existing node id or the integer index (into this same
/// batch) of an entry earlier in the array, so a caller can describe a
/// brand-new sub-graph in one round trip.
#[derive(Debug, Deserialize)]
pub struct BatchEntry {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    dependencies: Vec<DependencyRef>,
    #[serde(default)]
    estimated_minutes: Option<i64>,
    #[serde(default = "default_agent_type")]
    agent_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DependencyRef {
    ExistingId(String),
    BatchIndex(usize),
}

#[derive(Debug, Deserialize)]
pub struct BatchCreateBody {
    nodes: Vec<BatchEntry>,
}

pub async fn batch_create(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<BatchCreateBody>,
) -> ApiResult<Json<Vec<MacroNode>>> {
    let blueprint_id = BlueprintId::new(id);
    let mut created: Vec<MacroNode> = Vec::with_capacity(body.nodes.len());

    for entry in &body.nodes {
        let mut dependencies = Vec::with_capacity(entry.dependencies.len());
        for dep in &entry.dependencies {
            let dep_id = match dep {
                DependencyRef::ExistingId(raw) => MacroNodeId::new(raw.clone()),
                DependencyRef::BatchIndex(idx) => created
                    .get(*idx)
                    .map(|n| n.id.clone())
                    .ok_or_else(|| EngineError::bad_request(format!("batch dependency index {idx} is out of range")))?,
            };
            dependencies.push(dep_id);
        }
        let node = state.store.create_node(
            &blueprint_id,
            &entry.title,
            entry.description.as_deref(),
            entry.prompt.as_deref(),
            dependencies,
            None,
            entry.estimated_minutes,
            &entry.agent_type,
        )?;
        created.push(node);
    }
    Ok(Json(created))
}

/// Confirms `node_id` belongs to `blueprint_id` before any mutation,
/// matching the `bad_request` precondition `node_executor.rs` enforces for
/// every per-node operation.
fn belongs_to(state: &AppState, blueprint_id: &str, node_id: String) -> ApiResult<MacroNodeId> {
    let blueprint_id = BlueprintId::new(blueprint_id);
    let node_id = MacroNodeId::new(node_id);
    let node = state.store.get_node(&node_id)?.ok_or_else(|| EngineError::not_found(format!("node {node_id}")))?;
    if node.blueprint_id != blueprint_id {
        return Err(EngineError::bad_request(format!("node {node_id} does not belong to blueprint {blueprint_id}")).into());
    }
    Ok(node_id)
}

#[cfg(test)]
#[path = "nodes_tests.rs"]
mod tests;
