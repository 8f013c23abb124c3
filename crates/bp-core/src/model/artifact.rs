// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact: a textual handoff summary produced by a node for its
//! dependents, or a blueprint-level audit record when the node has none.

use super::blueprint::BlueprintId;
use super::node::MacroNodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifies an artifact.
    pub struct ArtifactId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    HandoffSummary,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: ArtifactId,
    pub blueprint_id: BlueprintId,
    pub source_node_id: MacroNodeId,
    /// `None` means this is a blueprint-level audit artifact: the source
    /// node had no dependents at the time it completed.
    pub target_node_id: Option<MacroNodeId>,
    pub artifact_type: ArtifactType,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
