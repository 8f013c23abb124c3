// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Related Session: an agent session spawned for a side operation on a node
//! (enrichment, re-evaluation, dependency discovery, splitting) rather than
//! a primary node execution.

use super::blueprint::BlueprintId;
use super::execution::SessionId;
use super::node::MacroNodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifies a related session record.
    pub struct RelatedSessionId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelatedSessionType {
    Enrich,
    Reevaluate,
    ReevaluateAll,
    SmartDeps,
    Split,
    Evaluate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedSession {
    pub id: RelatedSessionId,
    pub node_id: MacroNodeId,
    pub blueprint_id: BlueprintId,
    pub session_id: SessionId,
    pub session_type: RelatedSessionType,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[path = "related_session_tests.rs"]
mod tests;
