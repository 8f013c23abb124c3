// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handoff artifact generation (§4.6.5): fans a completed node's summary
//! text out to one artifact per dependent (or one null-target artifact if
//! it has none), after reshaping the raw text into the canonical
//! `**What was done:** / **Files changed:** / **Decisions:**` form via a
//! short second agent call.

use bp_core::{Artifact, ArtifactType, BlueprintId, EngineResult, MacroNode, MacroNodeId};
use bp_store::Store;

/// Reshapes a raw summary into the canonical handoff form. Implemented by
/// the caller as a short `ProcessRunner::run` invocation against the
/// reshape prompt (`prompt::build_reshape_prompt`); kept generic here so
/// this module has no direct subprocess dependency and stays unit-testable
/// with a stub.
pub trait Reshaper {
    fn reshape(&self, raw_summary: &str) -> String;
}

/// Reshaper that returns its input unchanged — used when the reshape call
/// itself fails; §7's propagation policy treats artifact-generation
/// failures as recoverable and logged, never fatal to the completed node.
pub struct IdentityReshaper;

impl Reshaper for IdentityReshaper {
    fn reshape(&self, raw_summary: &str) -> String {
        raw_summary.to_string()
    }
}

/// Creates one handoff artifact per dependent of `source_node`, or a single
/// null-target artifact if it has none (§8 invariant 4). All dependents are
/// every other node in the blueprint whose `dependencies` list contains
/// `source_node.id`.
pub fn generate_handoff_artifacts(
    store: &Store,
    blueprint_id: &BlueprintId,
    source_node: &MacroNode,
    raw_summary: &str,
    reshaper: &dyn Reshaper,
) -> EngineResult<Vec<Artifact>> {
    let content = reshaper.reshape(raw_summary);
    let all_nodes = store.list_nodes_for_blueprint(blueprint_id)?;
    let dependents: Vec<&MacroNode> = all_nodes
        .iter()
        .filter(|n| n.dependencies.iter().any(|d| d == &source_node.id))
        .collect();

    if dependents.is_empty() {
        let artifact = store.create_artifact(
            blueprint_id,
            &source_node.id,
            None,
            ArtifactType::HandoffSummary,
            &content,
        )?;
        return Ok(vec![artifact]);
    }

    let mut artifacts = Vec::with_capacity(dependents.len());
    for dependent in dependents {
        artifacts.push(store.create_artifact(
            blueprint_id,
            &source_node.id,
            Some(&dependent.id),
            ArtifactType::HandoffSummary,
            &content,
        )?);
    }
    Ok(artifacts)
}

/// Dependent node ids of `node_id` within `nodes` (used by the evaluation
/// prompt and by graph mutations — every node whose dependency list
/// contains `node_id`).
pub fn dependents_of<'a>(nodes: &'a [MacroNode], node_id: &MacroNodeId) -> Vec<&'a MacroNode> {
    nodes.iter().filter(|n| n.dependencies.iter().any(|d| d == node_id)).collect()
}

#[cfg(test)]
#[path = "artifact_gen_tests.rs"]
mod tests;
