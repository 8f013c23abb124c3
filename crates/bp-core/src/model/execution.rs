// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node Execution: one attempt at running a macro node's agent subprocess.

use super::blueprint::BlueprintId;
use super::node::MacroNodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifies a node execution.
    pub struct ExecutionId;
}

crate::define_id! {
    /// Identifies an agent session log, as assigned by the agent CLI itself.
    pub struct SessionId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionType {
    Primary,
    Retry,
    Continuation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Done,
    Failed,
    Cancelled,
}

/// Status the agent itself reported via `report-status`. Authoritative over
/// any status inferred from stdout or process exit code (§4.6.2 priority 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportedStatus {
    Done,
    Failed,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    ContextExhausted,
    OutputTokenLimit,
    Timeout,
    Hung,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextPressure {
    None,
    Moderate,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockerInfo {
    #[serde(rename = "type")]
    pub blocker_type: BlockerType,
    pub description: String,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockerType {
    MissingDependency,
    UnclearRequirement,
    AccessIssue,
    TechnicalLimitation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeExecution {
    pub id: ExecutionId,
    pub node_id: MacroNodeId,
    pub blueprint_id: BlueprintId,
    pub session_id: Option<SessionId>,
    pub execution_type: ExecutionType,
    pub status: ExecutionStatus,
    pub input_context: Option<String>,
    pub output_summary: Option<String>,
    pub context_tokens_used: Option<i64>,
    pub parent_execution_id: Option<ExecutionId>,
    pub cli_pid: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Raw JSON payload from a `report-blocker` callback.
    pub blocker_info: Option<String>,
    pub task_summary: Option<String>,
    pub reported_status: Option<ReportedStatus>,
    pub reported_reason: Option<String>,
    pub failure_reason: Option<FailureReason>,
    pub compact_count: Option<i64>,
    pub peak_tokens: Option<i64>,
    pub context_pressure: Option<ContextPressure>,
}

impl NodeExecution {
    pub fn is_running(&self) -> bool {
        self.status == ExecutionStatus::Running
    }
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
