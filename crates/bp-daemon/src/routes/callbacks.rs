// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Out-of-band callback routes (§6, §4.5): the spawned agent's only way
//! back into this process short of exiting. `evaluation_callback` resolves
//! a node-scoped waiter; `enrichment_callback` resolves a request-scoped
//! one; the execution-status trio are plain Store writes the Executor
//! re-reads once the process exits.

use axum::extract::{Path, State};
use axum::Json;
use bp_core::{BlockerInfo, EngineError, ExecutionId, MacroNodeId, ReportedStatus};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::state::AppState;

pub async fn evaluation_callback(
    State(state): State<AppState>,
    Path((_id, node_id)): Path<(String, String)>,
    Json(value): Json<Value>,
) -> ApiResult<Json<Value>> {
    let node_id = MacroNodeId::new(node_id);
    if !state.executor.resolve_evaluation_callback(&node_id, value) {
        return Err(EngineError::not_found(format!("no pending evaluation callback for node {node_id}")).into());
    }
    Ok(Json(json!({ "status": "accepted" })))
}

#[derive(Debug, Deserialize)]
pub struct ReportBlockerBody {
    #[serde(rename = "type")]
    blocker_type: bp_core::BlockerType,
    description: String,
    #[serde(default)]
    suggestion: Option<String>,
}

pub async fn report_blocker(
    State(state): State<AppState>,
    Path((_id, exec_id)): Path<(String, String)>,
    Json(body): Json<ReportBlockerBody>,
) -> ApiResult<Json<Value>> {
    let exec_id = ExecutionId::new(exec_id);
    let blocker = BlockerInfo { blocker_type: body.blocker_type, description: body.description, suggestion: body.suggestion };
    let blocker_json = serde_json::to_string(&blocker).map_err(|_| EngineError::bad_request("invalid blocker payload"))?;
    state.store.set_blocker(&exec_id, &blocker_json)?;
    Ok(Json(json!({ "status": "recorded" })))
}

#[derive(Debug, Deserialize)]
pub struct TaskSummaryBody {
    summary: String,
}

pub async fn task_summary(
    State(state): State<AppState>,
    Path((_id, exec_id)): Path<(String, String)>,
    Json(body): Json<TaskSummaryBody>,
) -> ApiResult<Json<Value>> {
    let exec_id = ExecutionId::new(exec_id);
    state.store.set_task_summary(&exec_id, &body.summary)?;
    Ok(Json(json!({ "status": "recorded" })))
}

#[derive(Debug, Deserialize)]
pub struct ReportStatusBody {
    status: ReportedStatus,
    #[serde(default)]
    reason: Option<String>,
}

pub async fn report_status(
    State(state): State<AppState>,
    Path((_id, exec_id)): Path<(String, String)>,
    Json(body): Json<ReportStatusBody>,
) -> ApiResult<Json<Value>> {
    let exec_id = ExecutionId::new(exec_id);
    state.store.set_reported_status(&exec_id, body.status, body.reason.as_deref())?;
    Ok(Json(json!({ "status": "recorded" })))
}

pub async fn enrichment_callback(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Json(value): Json<Value>,
) -> ApiResult<Json<Value>> {
    let request_id = uuid::Uuid::parse_str(&request_id).map_err(|_| EngineError::bad_request("request id is not a valid uuid"))?;
    if !state.request_callbacks.resolve(request_id, value) {
        return Err(EngineError::not_found(format!("no pending request callback for {request_id}")).into());
    }
    Ok(Json(json!({ "status": "accepted" })))
}

#[cfg(test)]
#[path = "callbacks_tests.rs"]
mod tests;
