// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Macro Node: one unit of work inside a blueprint's dependency graph.

use super::blueprint::BlueprintId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifies a macro node.
    pub struct MacroNodeId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    /// In-memory-queued, or an orphan re-adopted from a prior daemon incarnation.
    Queued,
    Running,
    Done,
    Failed,
    Blocked,
    Skipped,
}

impl NodeStatus {
    /// Statuses from which `run`/`retry` may be invoked (§4.6.1 precondition).
    pub fn is_runnable(&self) -> bool {
        matches!(self, Self::Pending | Self::Failed | Self::Queued)
    }

    /// Statuses that satisfy a dependency edge (§4.6.7 `next`).
    pub fn satisfies_dependency(&self) -> bool {
        matches!(self, Self::Done | Self::Skipped)
    }

    /// Statuses that block a dependent from ever becoming runnable.
    pub fn blocks_dependents(&self) -> bool {
        matches!(self, Self::Failed | Self::Blocked)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroNode {
    pub id: MacroNodeId,
    pub blueprint_id: BlueprintId,
    pub order: i64,
    pub title: String,
    pub description: Option<String>,
    pub prompt: Option<String>,
    /// Ordered list of node ids this node depends on, all within the same blueprint.
    pub dependencies: Vec<MacroNodeId>,
    pub status: NodeStatus,
    pub error: Option<String>,
    pub estimated_minutes: Option<i64>,
    pub actual_minutes: Option<i64>,
    /// Informational only; never used for scheduling decisions.
    pub parallel_group: Option<String>,
    pub agent_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MacroNode {
    /// True once every dependency id in `deps_status` satisfies the dependency
    /// relation (done or skipped). A dangling dependency id (deleted node,
    /// `lookup` returns `None`) is filtered out rather than treated as
    /// unsatisfied — §3: node deletion is local, dependents keep the dangling
    /// id, and it is filtered when resolving.
    pub fn dependencies_satisfied<'a>(
        &self,
        lookup: impl Fn(&MacroNodeId) -> Option<&'a NodeStatus>,
    ) -> bool {
        self.dependencies
            .iter()
            .filter_map(|dep| lookup(dep))
            .all(NodeStatus::satisfies_dependency)
    }

    /// True if any dependency is failed or blocked, meaning this node can
    /// never run (§4.6.1 precondition failure). A dangling dependency id is
    /// filtered out, same as `dependencies_satisfied`.
    pub fn any_dependency_blocked<'a>(
        &self,
        lookup: impl Fn(&MacroNodeId) -> Option<&'a NodeStatus>,
    ) -> bool {
        self.dependencies
            .iter()
            .filter_map(|dep| lookup(dep))
            .any(NodeStatus::blocks_dependents)
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
