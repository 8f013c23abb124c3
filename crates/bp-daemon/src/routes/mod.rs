// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The HTTP route table (§6, §6A): one `axum` router wiring every route
//! directly to a Store/Engine call, gated by [`crate::auth::require_token`].

mod blueprints;
mod callbacks;
mod executor;
mod nodes;
mod query;

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/blueprints", post(blueprints::create).get(blueprints::list))
        .route(
            "/blueprints/{id}",
            get(blueprints::get_with_nodes).put(blueprints::update).delete(blueprints::delete),
        )
        .route("/blueprints/{id}/approve", post(blueprints::approve))
        .route("/blueprints/{id}/archive", post(blueprints::archive))
        .route("/blueprints/{id}/unarchive", post(blueprints::unarchive))
        .route("/blueprints/{id}/nodes", post(nodes::create))
        .route("/blueprints/{id}/nodes/reorder", post(nodes::reorder))
        .route("/blueprints/{id}/nodes/batch-create", post(nodes::batch_create))
        .route("/blueprints/{id}/nodes/{node_id}", put(nodes::update).delete(nodes::delete))
        .route("/blueprints/{id}/nodes/{node_id}/run", post(executor::run))
        .route("/blueprints/{id}/nodes/{node_id}/unqueue", post(executor::unqueue))
        .route("/blueprints/{id}/nodes/{node_id}/resume-session", post(executor::resume_session))
        .route("/blueprints/{id}/nodes/{node_id}/recover-session", post(executor::recover_session))
        .route("/blueprints/{id}/nodes/{node_id}/evaluate", post(executor::evaluate))
        .route("/blueprints/{id}/nodes/{node_id}/split", post(executor::split))
        .route("/blueprints/{id}/nodes/{node_id}/reevaluate", post(executor::reevaluate))
        .route("/blueprints/{id}/nodes/{node_id}/smart-dependencies", post(executor::smart_dependencies))
        .route("/blueprints/{id}/nodes/{node_id}/insert-between", post(executor::insert_between))
        .route("/blueprints/{id}/nodes/{node_id}/add-sibling", post(executor::add_sibling))
        .route("/blueprints/{id}/nodes/{node_id}/evaluation-callback", post(callbacks::evaluation_callback))
        .route("/blueprints/{id}/run", post(executor::run_next))
        .route("/blueprints/{id}/run-all", post(executor::run_all))
        .route("/blueprints/{id}/reevaluate-all", post(executor::reevaluate_all))
        .route("/blueprints/{id}/generate", post(executor::generate))
        .route(
            "/blueprints/{id}/executions/{exec_id}/report-blocker",
            post(callbacks::report_blocker),
        )
        .route(
            "/blueprints/{id}/executions/{exec_id}/task-summary",
            post(callbacks::task_summary),
        )
        .route(
            "/blueprints/{id}/executions/{exec_id}/report-status",
            post(callbacks::report_status),
        )
        .route("/enrichment-callback/{request_id}", post(callbacks::enrichment_callback))
        .route("/sessions/{session_id}/plan-node", get(query::session_plan_node))
        .route("/sessions/{session_id}/execution", get(query::session_execution))
        .route("/global-status", get(query::global_status))
        .route("/blueprints/{id}/queue", get(query::blueprint_queue))
        .layer(middleware::from_fn_with_state(state.clone(), crate::auth::require_token))
        .with_state(state)
}
