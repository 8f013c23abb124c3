// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reverse-lookup and status-introspection routes (§6): the spawned agent
//! only ever knows its own session id, so `session_plan_node`/
//! `session_execution` are how it discovers which node/execution it is
//! running as. `global_status`/`blueprint_queue` expose the in-memory
//! Blueprint Queue (§4.4) to callers polling for overall progress.

use axum::extract::{Path, State};
use axum::Json;
use bp_core::{BlueprintId, EngineError, MacroNode, NodeExecution, SessionId};
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::state::AppState;

pub async fn session_plan_node(State(state): State<AppState>, Path(session_id): Path<String>) -> ApiResult<Json<MacroNode>> {
    let session_id = SessionId::new(session_id);
    let node_id = state
        .store
        .get_node_id_by_session_id(&session_id)?
        .ok_or_else(|| EngineError::not_found(format!("no node for session {session_id}")))?;
    let node = state.store.get_node(&node_id)?.ok_or_else(|| EngineError::not_found(format!("node {node_id}")))?;
    Ok(Json(node))
}

pub async fn session_execution(State(state): State<AppState>, Path(session_id): Path<String>) -> ApiResult<Json<NodeExecution>> {
    let session_id = SessionId::new(session_id);
    let execution = state
        .store
        .get_execution_by_session_id(&session_id)?
        .ok_or_else(|| EngineError::not_found(format!("no execution for session {session_id}")))?;
    Ok(Json(execution))
}

pub async fn global_status(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let entries = state.queue.global_info();
    let mut blueprints = Vec::with_capacity(entries.len());
    for entry in entries {
        let title = state.store.get_blueprint(&entry.blueprint_id)?.map(|b| b.title);
        blueprints.push(json!({
            "blueprintId": entry.blueprint_id.as_str(),
            "title": title,
            "running": entry.info.running.map(|t| json!({
                "taskId": t.task_id,
                "kind": t.kind,
                "nodeId": t.node_id.as_ref().map(|n| n.as_str().to_string()),
                "queuedAt": t.queued_at,
            })),
            "depth": entry.info.depth,
        }));
    }
    Ok(Json(json!({ "blueprints": blueprints })))
}

pub async fn blueprint_queue(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let blueprint_id = BlueprintId::new(id);
    let info = state.queue.info(&blueprint_id);
    Ok(Json(json!({
        "running": info.running.map(|t| json!({
            "taskId": t.task_id,
            "kind": t.kind,
            "nodeId": t.node_id.as_ref().map(|n| n.as_str().to_string()),
            "queuedAt": t.queued_at,
        })),
        "depth": info.depth,
        "pending": info.pending_tasks.iter().map(|t| json!({
            "taskId": t.task_id,
            "kind": t.kind,
            "nodeId": t.node_id.as_ref().map(|n| n.as_str().to_string()),
            "queuedAt": t.queued_at,
        })).collect::<Vec<_>>(),
    })))
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
