// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Composite read shapes that join across tables: the `GET /blueprints/:id`
//! hydration contract from §4.1 ("returns blueprint with its nodes hydrated
//! in order ascending, each node's artifacts and executions hydrated in
//! createdAt/startedAt ascending").

use super::Store;
use crate::error::StoreResult;
use bp_core::{Artifact, Blueprint, BlueprintId, MacroNode, NodeExecution};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct NodeWithDetails {
    #[serde(flatten)]
    pub node: MacroNode,
    pub artifacts: Vec<Artifact>,
    pub executions: Vec<NodeExecution>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlueprintWithNodes {
    #[serde(flatten)]
    pub blueprint: Blueprint,
    pub nodes: Vec<NodeWithDetails>,
}

impl Store {
    /// Fetches a blueprint with every owned node, each node's artifacts
    /// (output side) and executions fully hydrated. Returns `None` if the
    /// blueprint does not exist.
    pub fn get_blueprint_with_nodes(
        &self,
        id: &BlueprintId,
    ) -> StoreResult<Option<BlueprintWithNodes>> {
        let Some(blueprint) = self.get_blueprint(id)? else {
            return Ok(None);
        };
        let nodes = self.list_nodes_for_blueprint(id)?;
        let mut hydrated = Vec::with_capacity(nodes.len());
        for node in nodes {
            let artifacts = self.list_artifacts_for_node(&node.id, super::artifact::ArtifactDirection::Output)?;
            let executions = self.list_executions_for_node(&node.id)?;
            hydrated.push(NodeWithDetails {
                node,
                artifacts,
                executions,
            });
        }
        Ok(Some(BlueprintWithNodes {
            blueprint,
            nodes: hydrated,
        }))
    }
}

#[cfg(test)]
#[path = "hydrate_tests.rs"]
mod tests;
