// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconciliation (§4.6.2): once a run returns, decides the node's and
//! execution's final status from a fixed priority order over the
//! execution row's callback-populated fields and the raw cleaned stdout.

use bp_core::{FailureReason, NodeExecution, ReportedStatus};
use bp_session::HealthReport;

/// Stdout shorter than this is never treated as a genuine completion
/// (§8 boundary: 49 chars triggers the hung guard, 50 does not).
pub const HUNG_STDOUT_THRESHOLD: usize = 50;

pub const TASK_COMPLETE_MARKER_START: &str = "===TASK_COMPLETE===";
pub const TASK_COMPLETE_MARKER_END: &str = "===END_TASK===";
const TAIL_CHARS: usize = 2000;

/// Where a `Done`/`Blocked` outcome's summary text came from, for callers
/// that want to log or test which priority branch fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummarySource {
    TaskSummaryCallback,
    Marker,
    StdoutTail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// Node and execution both become `done`; generate a handoff artifact
    /// and run post-completion evaluation.
    Done { summary: String, source: SummarySource },
    /// Node becomes `blocked`, execution becomes `done` (the attempt itself
    /// succeeded); generate a handoff artifact, no evaluation.
    Blocked { summary: String, source: SummarySource },
    /// Node and execution both become `failed`.
    Failed { reason: FailureReason, detail: String },
}

/// The literal placeholder the prompt template uses for a blocker's `type`
/// field; an agent that echoes this verbatim never actually filled it in.
const BLOCKER_TYPE_PLACEHOLDER: &str = "missing_dependency|unclear_requirement|access_issue|technical_limitation";

/// Heuristically detects a blocker callback whose payload is just the
/// unfilled prompt template rather than a real report (§9 Open Question:
/// preserved as a policy decision, not redesigned).
pub fn is_template_blocker_echo(blocker_json: &str, node_prompt: Option<&str>) -> bool {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(blocker_json) else {
        return false;
    };
    if value.get("type").and_then(|v| v.as_str()) == Some(BLOCKER_TYPE_PLACEHOLDER) {
        return true;
    }
    let description = value.get("description").and_then(|v| v.as_str()).unwrap_or("");
    if description.trim().is_empty() || description.trim() == "..." {
        return true;
    }
    if let Some(prompt) = node_prompt {
        if prompt.contains(description) {
            return true;
        }
    }
    false
}

fn pick_summary(execution: &NodeExecution, cleaned_stdout: &str) -> (String, SummarySource) {
    if let Some(summary) = &execution.task_summary {
        return (summary.clone(), SummarySource::TaskSummaryCallback);
    }
    if let (Some(start), Some(end)) = (
        cleaned_stdout.find(TASK_COMPLETE_MARKER_START),
        cleaned_stdout.find(TASK_COMPLETE_MARKER_END),
    ) {
        let body_start = start + TASK_COMPLETE_MARKER_START.len();
        if body_start <= end {
            return (cleaned_stdout[body_start..end].trim().to_string(), SummarySource::Marker);
        }
    }
    let tail: String = cleaned_stdout
        .chars()
        .rev()
        .take(TAIL_CHARS)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    (tail, SummarySource::StdoutTail)
}

/// Applies §4.6.2's priority order to decide the final outcome of a run
/// that exited normally (i.e. the process itself didn't time out or fail
/// with empty stdout — that exception path is handled separately via
/// [`crate::classify::classify_failure`]).
pub fn reconcile(
    execution: &NodeExecution,
    cleaned_stdout: &str,
    health: Option<&HealthReport>,
    node_prompt: Option<&str>,
) -> ReconciliationOutcome {
    if let Some(reported) = execution.reported_status {
        return match reported {
            ReportedStatus::Done => {
                let (summary, source) = pick_summary(execution, cleaned_stdout);
                ReconciliationOutcome::Done { summary, source }
            }
            ReportedStatus::Failed => ReconciliationOutcome::Failed {
                reason: FailureReason::Error,
                detail: execution.reported_reason.clone().unwrap_or_else(|| "reported failed".to_string()),
            },
            ReportedStatus::Blocked => {
                let (summary, source) = pick_summary(execution, cleaned_stdout);
                ReconciliationOutcome::Blocked { summary, source }
            }
        };
    }

    if let Some(blocker_json) = &execution.blocker_info {
        if !is_template_blocker_echo(blocker_json, node_prompt) {
            let (summary, source) = pick_summary(execution, cleaned_stdout);
            return ReconciliationOutcome::Blocked { summary, source };
        }
    }

    if cleaned_stdout.chars().count() < HUNG_STDOUT_THRESHOLD {
        let reason = health.and_then(HealthReport::failure_reason).unwrap_or(FailureReason::Hung);
        return ReconciliationOutcome::Failed {
            reason,
            detail: "agent produced no substantive output".to_string(),
        };
    }

    let (summary, source) = pick_summary(execution, cleaned_stdout);
    ReconciliationOutcome::Done { summary, source }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
