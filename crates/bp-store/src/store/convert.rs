// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! String<->enum conversions for the columns that are stored as TEXT.

use crate::error::{StoreError, StoreResult};
use bp_core::{
    ArtifactType, BlueprintStatus, ContextPressure, ExecutionStatus, ExecutionType, FailureReason,
    NodeStatus, RelatedSessionType, ReportedStatus,
};
use chrono::{DateTime, Utc};

pub fn now_str(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

pub fn parse_dt(s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Invalid(format!("bad timestamp '{s}': {e}")))
}

pub fn parse_dt_opt(s: Option<String>) -> StoreResult<Option<DateTime<Utc>>> {
    s.map(|s| parse_dt(&s)).transpose()
}

pub fn blueprint_status_str(s: BlueprintStatus) -> &'static str {
    match s {
        BlueprintStatus::Draft => "draft",
        BlueprintStatus::Approved => "approved",
        BlueprintStatus::Running => "running",
        BlueprintStatus::Done => "done",
        BlueprintStatus::Failed => "failed",
        BlueprintStatus::Paused => "paused",
    }
}

pub fn blueprint_status_parse(s: &str) -> StoreResult<BlueprintStatus> {
    Ok(match s {
        "draft" => BlueprintStatus::Draft,
        "approved" => BlueprintStatus::Approved,
        "running" => BlueprintStatus::Running,
        "done" => BlueprintStatus::Done,
        "failed" => BlueprintStatus::Failed,
        "paused" => BlueprintStatus::Paused,
        other => return Err(StoreError::Invalid(format!("bad blueprint status '{other}'"))),
    })
}

pub fn node_status_str(s: NodeStatus) -> &'static str {
    match s {
        NodeStatus::Pending => "pending",
        NodeStatus::Queued => "queued",
        NodeStatus::Running => "running",
        NodeStatus::Done => "done",
        NodeStatus::Failed => "failed",
        NodeStatus::Blocked => "blocked",
        NodeStatus::Skipped => "skipped",
    }
}

pub fn node_status_parse(s: &str) -> StoreResult<NodeStatus> {
    Ok(match s {
        "pending" => NodeStatus::Pending,
        "queued" => NodeStatus::Queued,
        "running" => NodeStatus::Running,
        "done" => NodeStatus::Done,
        "failed" => NodeStatus::Failed,
        "blocked" => NodeStatus::Blocked,
        "skipped" => NodeStatus::Skipped,
        other => return Err(StoreError::Invalid(format!("bad node status '{other}'"))),
    })
}

pub fn artifact_type_str(t: ArtifactType) -> &'static str {
    match t {
        ArtifactType::HandoffSummary => "handoff_summary",
        ArtifactType::Custom => "custom",
    }
}

pub fn artifact_type_parse(s: &str) -> StoreResult<ArtifactType> {
    Ok(match s {
        "handoff_summary" => ArtifactType::HandoffSummary,
        "custom" => ArtifactType::Custom,
        other => return Err(StoreError::Invalid(format!("bad artifact type '{other}'"))),
    })
}

pub fn execution_type_str(t: ExecutionType) -> &'static str {
    match t {
        ExecutionType::Primary => "primary",
        ExecutionType::Retry => "retry",
        ExecutionType::Continuation => "continuation",
    }
}

pub fn execution_type_parse(s: &str) -> StoreResult<ExecutionType> {
    Ok(match s {
        "primary" => ExecutionType::Primary,
        "retry" => ExecutionType::Retry,
        "continuation" => ExecutionType::Continuation,
        other => return Err(StoreError::Invalid(format!("bad execution type '{other}'"))),
    })
}

pub fn execution_status_str(s: ExecutionStatus) -> &'static str {
    match s {
        ExecutionStatus::Running => "running",
        ExecutionStatus::Done => "done",
        ExecutionStatus::Failed => "failed",
        ExecutionStatus::Cancelled => "cancelled",
    }
}

pub fn execution_status_parse(s: &str) -> StoreResult<ExecutionStatus> {
    Ok(match s {
        "running" => ExecutionStatus::Running,
        "done" => ExecutionStatus::Done,
        "failed" => ExecutionStatus::Failed,
        "cancelled" => ExecutionStatus::Cancelled,
        other => return Err(StoreError::Invalid(format!("bad execution status '{other}'"))),
    })
}

pub fn reported_status_str(s: ReportedStatus) -> &'static str {
    match s {
        ReportedStatus::Done => "done",
        ReportedStatus::Failed => "failed",
        ReportedStatus::Blocked => "blocked",
    }
}

pub fn reported_status_parse(s: &str) -> StoreResult<ReportedStatus> {
    Ok(match s {
        "done" => ReportedStatus::Done,
        "failed" => ReportedStatus::Failed,
        "blocked" => ReportedStatus::Blocked,
        other => return Err(StoreError::Invalid(format!("bad reported status '{other}'"))),
    })
}

pub fn failure_reason_str(r: FailureReason) -> &'static str {
    match r {
        FailureReason::ContextExhausted => "context_exhausted",
        FailureReason::OutputTokenLimit => "output_token_limit",
        FailureReason::Timeout => "timeout",
        FailureReason::Hung => "hung",
        FailureReason::Error => "error",
    }
}

pub fn failure_reason_parse(s: &str) -> StoreResult<FailureReason> {
    Ok(match s {
        "context_exhausted" => FailureReason::ContextExhausted,
        "output_token_limit" => FailureReason::OutputTokenLimit,
        "timeout" => FailureReason::Timeout,
        "hung" => FailureReason::Hung,
        "error" => FailureReason::Error,
        other => return Err(StoreError::Invalid(format!("bad failure reason '{other}'"))),
    })
}

pub fn context_pressure_str(p: ContextPressure) -> &'static str {
    match p {
        ContextPressure::None => "none",
        ContextPressure::Moderate => "moderate",
        ContextPressure::High => "high",
        ContextPressure::Critical => "critical",
    }
}

pub fn context_pressure_parse(s: &str) -> StoreResult<ContextPressure> {
    Ok(match s {
        "none" => ContextPressure::None,
        "moderate" => ContextPressure::Moderate,
        "high" => ContextPressure::High,
        "critical" => ContextPressure::Critical,
        other => return Err(StoreError::Invalid(format!("bad context pressure '{other}'"))),
    })
}

pub fn related_session_type_str(t: RelatedSessionType) -> &'static str {
    match t {
        RelatedSessionType::Enrich => "enrich",
        RelatedSessionType::Reevaluate => "reevaluate",
        RelatedSessionType::ReevaluateAll => "reevaluate_all",
        RelatedSessionType::SmartDeps => "smart_deps",
        RelatedSessionType::Split => "split",
        RelatedSessionType::Evaluate => "evaluate",
    }
}

pub fn related_session_type_parse(s: &str) -> StoreResult<RelatedSessionType> {
    Ok(match s {
        "enrich" => RelatedSessionType::Enrich,
        "reevaluate" => RelatedSessionType::Reevaluate,
        "reevaluate_all" => RelatedSessionType::ReevaluateAll,
        "smart_deps" => RelatedSessionType::SmartDeps,
        "split" => RelatedSessionType::Split,
        "evaluate" => RelatedSessionType::Evaluate,
        other => return Err(StoreError::Invalid(format!("bad related session type '{other}'"))),
    })
}
