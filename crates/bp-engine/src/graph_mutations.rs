// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime graph mutation protocol (§4.6.6): applies the verdict a
//! post-completion evaluation agent POSTs back — `INSERT_BETWEEN` or
//! `ADD_SIBLING` — against the Store.

use bp_core::{BlueprintId, EngineResult, MacroNode, MacroNodeId, NodeStatus};
use bp_store::Store;

use crate::artifact_gen::dependents_of;

/// Which mutation to apply; mirrors the `action` field of the agent's
/// evaluation verdict payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationAction {
    InsertBetween,
    AddSibling,
}

/// The new node's fields, as supplied by the evaluation verdict's `new_node`
/// object.
pub struct NewNodeSpec<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub prompt: Option<&'a str>,
    pub estimated_minutes: Option<i64>,
}

/// Applies one graph mutation against `completed_node`, returning the newly
/// created node. Both variants are idempotent at the edge level: adding an
/// already-present dependency is a no-op (`Store::add_node_dependency`).
pub fn apply_mutation(
    store: &Store,
    blueprint_id: &BlueprintId,
    completed_node: &MacroNode,
    action: MutationAction,
    spec: &NewNodeSpec,
) -> EngineResult<MacroNode> {
    match action {
        MutationAction::InsertBetween => insert_between(store, blueprint_id, completed_node, spec),
        MutationAction::AddSibling => add_sibling(store, blueprint_id, completed_node, spec),
    }
}

/// Inserts a new node between `completed_node` and its existing dependents:
/// every dependent that depended on `completed_node` now depends on the new
/// node instead, and the new node itself depends on `completed_node`.
///
/// Idempotent against a replayed verdict (§8): after the first application,
/// `completed_node`'s only remaining dependent is the node just inserted, so
/// a second call with the same `spec.title` recognizes it and returns it
/// unchanged instead of inserting a second node between the first and
/// `completed_node`.
fn insert_between(
    store: &Store,
    blueprint_id: &BlueprintId,
    completed_node: &MacroNode,
    spec: &NewNodeSpec,
) -> EngineResult<MacroNode> {
    let all_nodes = store.list_nodes_for_blueprint(blueprint_id)?;
    let already_inserted = dependents_of(&all_nodes, &completed_node.id)
        .into_iter()
        .find(|dependent| dependent.title == spec.title && dependent.dependencies == [completed_node.id.clone()]);
    if let Some(existing) = already_inserted {
        return Ok(existing.clone());
    }

    let new_node = store.create_node(
        blueprint_id,
        spec.title,
        spec.description,
        spec.prompt,
        Vec::new(),
        None,
        spec.estimated_minutes,
        &completed_node.agent_type,
    )?;

    // Rewire existing dependents before wiring the new node's own dependency
    // on `completed_node` — otherwise this blueprint-wide rewrite would also
    // catch the edge we're about to add and turn it into a self-loop.
    store.rewire_dependency(blueprint_id, &completed_node.id, &new_node.id)?;
    store.add_node_dependency(&new_node.id, &completed_node.id)?;

    store
        .get_node(&new_node.id)?
        .ok_or_else(|| bp_core::EngineError::Internal)
}

/// Creates a sibling node that inherits `completed_node`'s own dependency
/// set, marked `blocked` until whatever it represents (a missing
/// prerequisite the evaluation surfaced) is resolved, and wires it as an
/// additional dependency of every node that already depended on
/// `completed_node`.
fn add_sibling(
    store: &Store,
    blueprint_id: &BlueprintId,
    completed_node: &MacroNode,
    spec: &NewNodeSpec,
) -> EngineResult<MacroNode> {
    let all_nodes = store.list_nodes_for_blueprint(blueprint_id)?;
    let dependent_ids: Vec<MacroNodeId> =
        dependents_of(&all_nodes, &completed_node.id).into_iter().map(|n| n.id.clone()).collect();

    let new_node = store.create_node(
        blueprint_id,
        spec.title,
        spec.description,
        spec.prompt,
        completed_node.dependencies.clone(),
        None,
        spec.estimated_minutes,
        &completed_node.agent_type,
    )?;
    store.update_node_status(&new_node.id, NodeStatus::Blocked, None)?;

    for dependent_id in &dependent_ids {
        store.add_node_dependency(dependent_id, &new_node.id)?;
    }

    store
        .get_node(&new_node.id)?
        .ok_or_else(|| bp_core::EngineError::Internal)
}

#[cfg(test)]
#[path = "graph_mutations_tests.rs"]
mod tests;
