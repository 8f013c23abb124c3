// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor-operation routes (§6): every one of these enqueues work onto the
//! node's blueprint lane and returns immediately — the Store is the source
//! of eventual truth once a task has been accepted (§7 propagation policy).
//! Preconditions checkable without spawning a subprocess (node exists, is
//! runnable/done, belongs to this blueprint) are still validated inline so
//! a caller mistake comes back as a real HTTP error rather than a silently
//! swallowed background failure.

use axum::extract::{Path, State};
use axum::Json;
use bp_core::{BlueprintId, EngineError, MacroNode, MacroNodeId, NodeStatus};
use bp_engine::{MutationAction, NewNodeSpec, TaskKind};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::state::AppState;

fn queued_response(node_id: &MacroNodeId) -> Json<Value> {
    Json(json!({ "status": "queued", "nodeId": node_id.as_str() }))
}

fn load_node(state: &AppState, blueprint_id: &BlueprintId, node_id: &MacroNodeId) -> ApiResult<MacroNode> {
    let node = state.store.get_node(node_id)?.ok_or_else(|| EngineError::not_found(format!("node {node_id}")))?;
    if node.blueprint_id != *blueprint_id {
        return Err(EngineError::bad_request(format!("node {node_id} does not belong to blueprint {blueprint_id}")).into());
    }
    Ok(node)
}

fn require_runnable(node: &MacroNode) -> ApiResult<()> {
    if !node.status.is_runnable() {
        return Err(EngineError::precondition(format!("node {} is {:?}, not runnable", node.id, node.status)).into());
    }
    Ok(())
}

fn require_done(node: &MacroNode) -> ApiResult<()> {
    if node.status != NodeStatus::Done {
        return Err(EngineError::precondition(format!("node {} is {:?}, not done", node.id, node.status)).into());
    }
    Ok(())
}

pub async fn run(State(state): State<AppState>, Path((id, node_id)): Path<(String, String)>) -> ApiResult<Json<Value>> {
    let blueprint_id = BlueprintId::new(id);
    let node_id = MacroNodeId::new(node_id);
    let node = load_node(&state, &blueprint_id, &node_id)?;
    require_runnable(&node)?;

    let executor = state.executor.clone();
    let bp = blueprint_id.clone();
    let nid = node_id.clone();
    state.queue.enqueue(&blueprint_id, TaskKind::Run, Some(node_id.clone()), move || async move {
        if let Err(err) = executor.run(&bp, &nid).await {
            tracing::warn!(node_id = %nid, %err, "queued run failed");
        }
    });
    Ok(queued_response(&node_id))
}

/// Blueprint-level `run`: advances exactly one step via `next`, distinct
/// from `run-all`'s full drain.
pub async fn run_next(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let blueprint_id = BlueprintId::new(id);
    let Some(node_id) = state.executor.next(&blueprint_id)? else {
        return Ok(Json(json!({ "status": "idle" })));
    };
    let executor = state.executor.clone();
    let bp = blueprint_id.clone();
    let nid = node_id.clone();
    state.queue.enqueue(&blueprint_id, TaskKind::Run, Some(node_id.clone()), move || async move {
        if let Err(err) = executor.run(&bp, &nid).await {
            tracing::warn!(node_id = %nid, %err, "queued run failed");
        }
    });
    Ok(queued_response(&node_id))
}

/// `unqueue`: cancels a not-yet-started queued task and reverts the node to
/// `pending`. Unqueuing an already-running node is a `Conflict` (§7).
pub async fn unqueue(State(state): State<AppState>, Path((id, node_id)): Path<(String, String)>) -> ApiResult<Json<Value>> {
    let blueprint_id = BlueprintId::new(id);
    let node_id = MacroNodeId::new(node_id);
    let node = load_node(&state, &blueprint_id, &node_id)?;
    if node.status == NodeStatus::Running {
        return Err(EngineError::conflict(format!("node {node_id} is running, cannot unqueue")).into());
    }
    if !state.queue.remove(&blueprint_id, &node_id) {
        return Err(EngineError::not_found(format!("node {node_id} has no queued task")).into());
    }
    if node.status == NodeStatus::Queued {
        state.store.update_node_status(&node_id, NodeStatus::Pending, None)?;
    }
    Ok(Json(json!({ "status": "unqueued" })))
}

pub async fn resume_session(State(state): State<AppState>, Path((id, node_id)): Path<(String, String)>) -> ApiResult<Json<Value>> {
    let blueprint_id = BlueprintId::new(id);
    let node_id = MacroNodeId::new(node_id);
    let node = load_node(&state, &blueprint_id, &node_id)?;
    if node.status != NodeStatus::Failed {
        return Err(EngineError::precondition(format!("node {node_id} is {:?}, not failed", node.status)).into());
    }

    let executor = state.executor.clone();
    let bp = blueprint_id.clone();
    let nid = node_id.clone();
    state.queue.enqueue(&blueprint_id, TaskKind::Run, Some(node_id.clone()), move || async move {
        if let Err(err) = executor.resume_session(&bp, &nid).await {
            tracing::warn!(node_id = %nid, %err, "queued resume-session failed");
        }
    });
    Ok(queued_response(&node_id))
}

/// `recover-session`: manual counterpart to the Recovery Supervisor's
/// cohort-B revert (§4.7.1), for a node a caller believes is still alive
/// despite having been force-failed by a prior restart. Adopting a session
/// another execution already owns is a `Conflict` (§7).
pub async fn recover_session(State(state): State<AppState>, Path((id, node_id)): Path<(String, String)>) -> ApiResult<Json<Value>> {
    let blueprint_id = BlueprintId::new(id);
    let node_id = MacroNodeId::new(node_id);
    let node = load_node(&state, &blueprint_id, &node_id)?;
    if node.status != NodeStatus::Failed {
        return Err(EngineError::precondition(format!("node {node_id} is {:?}, not failed", node.status)).into());
    }
    let executions = state.store.list_executions_for_node(&node_id)?;
    let last = executions.last().ok_or_else(|| EngineError::precondition(format!("node {node_id} has no prior execution")))?;
    let Some(session_id) = &last.session_id else {
        return Err(EngineError::precondition(format!("node {node_id}'s last execution has no known session id")).into());
    };
    if let Some(owner) = state.store.get_execution_by_session_id(session_id)? {
        if owner.id != last.id && owner.is_running() {
            return Err(EngineError::conflict(format!("session {session_id} is already owned by execution {}", owner.id)).into());
        }
    }
    state.store.revert_execution_to_running(&last.id, &node_id)?;
    Ok(Json(json!({ "status": "recovered", "nodeId": node_id.as_str() })))
}

pub async fn evaluate(State(state): State<AppState>, Path((id, node_id)): Path<(String, String)>) -> ApiResult<Json<Value>> {
    run_evaluation_flow(state, id, node_id, TaskKind::Reevaluate, |executor, bp, nid| async move {
        executor.evaluate(&bp, &nid).await
    })
    .await
}

pub async fn reevaluate(State(state): State<AppState>, Path((id, node_id)): Path<(String, String)>) -> ApiResult<Json<Value>> {
    run_evaluation_flow(state, id, node_id, TaskKind::Reevaluate, |executor, bp, nid| async move {
        executor.reevaluate(&bp, &nid).await
    })
    .await
}

pub async fn split(State(state): State<AppState>, Path((id, node_id)): Path<(String, String)>) -> ApiResult<Json<Value>> {
    run_evaluation_flow(state, id, node_id, TaskKind::Split, |executor, bp, nid| async move {
        executor.split(&bp, &nid).await
    })
    .await
}

pub async fn smart_dependencies(State(state): State<AppState>, Path((id, node_id)): Path<(String, String)>) -> ApiResult<Json<Value>> {
    let blueprint_id = BlueprintId::new(id);
    let node_id = MacroNodeId::new(node_id);
    load_node(&state, &blueprint_id, &node_id)?;

    let executor = state.executor.clone();
    let bp = blueprint_id.clone();
    let nid = node_id.clone();
    state.queue.enqueue(&blueprint_id, TaskKind::SmartDeps, Some(node_id.clone()), move || async move {
        if let Err(err) = executor.smart_dependencies(&bp, &nid).await {
            tracing::warn!(node_id = %nid, %err, "queued smart-dependencies failed");
        }
    });
    Ok(queued_response(&node_id))
}

async fn run_evaluation_flow<F, Fut>(
    state: AppState,
    id: String,
    node_id: String,
    kind: TaskKind,
    call: F,
) -> ApiResult<Json<Value>>
where
    F: FnOnce(std::sync::Arc<bp_engine::NodeExecutor>, BlueprintId, MacroNodeId) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = bp_core::EngineResult<()>> + Send + 'static,
{
    let blueprint_id = BlueprintId::new(id);
    let node_id = MacroNodeId::new(node_id);
    let node = load_node(&state, &blueprint_id, &node_id)?;
    require_done(&node)?;

    let executor = state.executor.clone();
    let bp = blueprint_id.clone();
    let nid = node_id.clone();
    state.queue.enqueue(&blueprint_id, kind, Some(node_id.clone()), move || async move {
        if let Err(err) = call(executor, bp, nid.clone()).await {
            tracing::warn!(node_id = %nid, %err, "queued evaluation-flow operation failed");
        }
    });
    Ok(queued_response(&node_id))
}

#[derive(Debug, Deserialize)]
pub struct MutationBody {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    estimated_minutes: Option<i64>,
}

/// Manual invocation of the same `INSERT_BETWEEN`/`ADD_SIBLING` graph
/// mutation the post-completion evaluation flow applies automatically
/// (§4.6.6); synchronous since it is a Store write, not an agent spawn.
pub async fn insert_between(State(state): State<AppState>, Path((id, node_id)): Path<(String, String)>, Json(body): Json<MutationBody>) -> ApiResult<Json<MacroNode>> {
    apply_manual_mutation(state, id, node_id, MutationAction::InsertBetween, body).await
}

pub async fn add_sibling(State(state): State<AppState>, Path((id, node_id)): Path<(String, String)>, Json(body): Json<MutationBody>) -> ApiResult<Json<MacroNode>> {
    apply_manual_mutation(state, id, node_id, MutationAction::AddSibling, body).await
}

async fn apply_manual_mutation(
    state: AppState,
    id: String,
    node_id: String,
    action: MutationAction,
    body: MutationBody,
) -> ApiResult<Json<MacroNode>> {
    let blueprint_id = BlueprintId::new(id);
    let node_id = MacroNodeId::new(node_id);
    let node = load_node(&state, &blueprint_id, &node_id)?;
    let spec = NewNodeSpec {
        title: &body.title,
        description: body.description.as_deref(),
        prompt: body.prompt.as_deref(),
        estimated_minutes: body.estimated_minutes,
    };
    let created = bp_engine::apply_mutation(&state.store, &blueprint_id, &node, action, &spec)?;
    Ok(Json(created))
}

pub async fn run_all(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let blueprint_id = BlueprintId::new(id);
    let executor = state.executor.clone();
    let bp = blueprint_id.clone();
    state.queue.enqueue(&blueprint_id, TaskKind::Run, None, move || async move {
        if let Err(err) = executor.run_all(&bp).await {
            tracing::warn!(blueprint_id = %bp, %err, "queued run-all failed");
        }
    });
    Ok(Json(json!({ "status": "queued" })))
}

pub async fn reevaluate_all(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let blueprint_id = BlueprintId::new(id);
    let executor = state.executor.clone();
    let bp = blueprint_id.clone();
    state.queue.enqueue(&blueprint_id, TaskKind::Reevaluate, None, move || async move {
        if let Err(err) = executor.reevaluate_all(&bp).await {
            tracing::warn!(blueprint_id = %bp, %err, "queued reevaluate-all failed");
        }
    });
    Ok(Json(json!({ "status": "queued" })))
}

#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    idea: String,
}

pub async fn generate(State(state): State<AppState>, Path(id): Path<String>, Json(body): Json<GenerateBody>) -> ApiResult<Json<Value>> {
    let blueprint_id = BlueprintId::new(id);
    let executor = state.executor.clone();
    let bp = blueprint_id.clone();
    let idea = body.idea;
    state.queue.enqueue(&blueprint_id, TaskKind::Generate, None, move || async move {
        if let Err(err) = executor.generate(&bp, &idea).await {
            tracing::warn!(blueprint_id = %bp, %err, "queued generate failed");
        }
    });
    Ok(Json(json!({ "status": "queued" })))
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
