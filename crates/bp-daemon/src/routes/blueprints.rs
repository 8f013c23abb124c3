// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/blueprints` CRUD and lifecycle routes (§6).

use axum::extract::{Path, Query, State};
use axum::Json;
use bp_core::{Blueprint, BlueprintId, BlueprintStatus};
use bp_store::BlueprintWithNodes;
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
    project_cwd: Option<String>,
}

pub async fn create(State(state): State<AppState>, Json(body): Json<CreateBody>) -> ApiResult<Json<Blueprint>> {
    let blueprint = state.store.create_blueprint(&body.title, body.description.as_deref(), body.project_cwd.as_deref())?;
    Ok(Json(blueprint))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    status: Option<String>,
    project_cwd: Option<String>,
    #[serde(default)]
    include_archived: bool,
}

pub async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> ApiResult<Json<Vec<Blueprint>>> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let blueprints = state.store.list_blueprints(status, query.project_cwd.as_deref(), query.include_archived)?;
    Ok(Json(blueprints))
}

fn parse_status(raw: &str) -> Result<BlueprintStatus, crate::error::ApiError> {
    match raw {
        "draft" => Ok(BlueprintStatus::Draft),
        "approved" => Ok(BlueprintStatus::Approved),
        "running" => Ok(BlueprintStatus::Running),
        "done" => Ok(BlueprintStatus::Done),
        "failed" => Ok(BlueprintStatus::Failed),
        "paused" => Ok(BlueprintStatus::Paused),
        other => Err(bp_core::EngineError::bad_request(format!("unknown blueprint status {other}")).into()),
    }
}

pub async fn get_with_nodes(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<BlueprintWithNodes>> {
    let id = BlueprintId::new(id);
    let with_nodes = state
        .store
        .get_blueprint_with_nodes(&id)?
        .ok_or_else(|| bp_core::EngineError::not_found(format!("blueprint {id}")))?;
    Ok(Json(with_nodes))
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateBody {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<Option<String>>,
    #[serde(default)]
    project_cwd: Option<Option<String>>,
}

pub async fn update(State(state): State<AppState>, Path(id): Path<String>, Json(body): Json<UpdateBody>) -> ApiResult<Json<Blueprint>> {
    let id = BlueprintId::new(id);
    let blueprint = state.store.update_blueprint(
        &id,
        body.title.as_deref(),
        body.description.as_ref().map(|d| d.as_deref()),
        body.project_cwd.as_ref().map(|p| p.as_deref()),
    )?;
    Ok(Json(blueprint))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let id = BlueprintId::new(id);
    state.store.delete_blueprint(&id)?;
    Ok(Json(json!({ "status": "deleted" })))
}

/// `approve`: `draft` -> `approved`, the only lifecycle edge this route
/// drives directly (`running`/`done`/`failed` are engine-derived, §3).
pub async fn approve(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Blueprint>> {
    let id = BlueprintId::new(id);
    let existing = state.store.get_blueprint(&id)?.ok_or_else(|| bp_core::EngineError::not_found(format!("blueprint {id}")))?;
    if existing.status != BlueprintStatus::Draft {
        return Err(bp_core::EngineError::precondition(format!("blueprint {id} is {:?}, not draft", existing.status)).into());
    }
    state.store.set_blueprint_status(&id, BlueprintStatus::Approved)?;
    Ok(Json(state.store.get_blueprint(&id)?.ok_or_else(|| bp_core::EngineError::not_found(format!("blueprint {id}")))?))
}

pub async fn archive(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let id = BlueprintId::new(id);
    state.store.archive_blueprint(&id)?;
    Ok(Json(json!({ "status": "archived" })))
}

pub async fn unarchive(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let id = BlueprintId::new(id);
    state.store.unarchive_blueprint(&id)?;
    Ok(Json(json!({ "status": "unarchived" })))
}

#[cfg(test)]
#[path = "blueprints_tests.rs"]
mod tests;
