// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure classification (§4.6.3): given an error message, optional raw
//! output, and optional session id, decides the `FailureReason` to record
//! on a failed execution.

use std::sync::OnceLock;

use bp_core::FailureReason;
use bp_session::{AgentRegistry, HealthReport};
use regex::Regex;
use std::path::Path;

fn output_token_limit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)exceed\w*[^.]*output token (maximum|limit)").unwrap())
}

fn context_exhausted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(context window|input (is|was) too long|max(?:imum)? context|context length|input tokens?|prompt is too long)").unwrap()
    })
}

fn timeout_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(killed|timeout|SIGTERM|ETIMEDOUT)").unwrap())
}

/// A classified failure: the bucket to store on the execution, plus a
/// human-readable detail for `error`/`reportedReason`-style display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedFailure {
    pub reason: FailureReason,
    pub detail: String,
}

/// Classifies a failed run per §4.6.3's priority order: output-token-limit
/// pattern in the output wins outright; context/input/window patterns in
/// the combined error+output text are next; the session's own HealthReport
/// (if a session id is known) can promote a reason the text alone missed;
/// timeout sentinels are checked next; anything else falls back to `error`.
pub fn classify_failure(
    error_msg: &str,
    output: Option<&str>,
    session_id: Option<&str>,
    project_cwd: Option<&Path>,
    agent_type: &str,
    registry: &AgentRegistry,
) -> ClassifiedFailure {
    if let Some(output) = output {
        if output_token_limit_re().is_match(output) {
            return ClassifiedFailure { reason: FailureReason::OutputTokenLimit, detail: error_msg.to_string() };
        }
    }

    let combined = match output {
        Some(output) => format!("{error_msg}\n{output}"),
        None => error_msg.to_string(),
    };
    if context_exhausted_re().is_match(&combined) {
        return ClassifiedFailure { reason: FailureReason::ContextExhausted, detail: error_msg.to_string() };
    }

    if let (Some(session_id), Some(project_cwd)) = (session_id, project_cwd) {
        if let Some(health) = health_for_session(registry, agent_type, project_cwd, session_id) {
            if let Some(reason) = health.failure_reason() {
                return ClassifiedFailure { reason, detail: error_msg.to_string() };
            }
            if health.ended_after_compaction && health.compact_count >= 1 {
                return ClassifiedFailure { reason: FailureReason::ContextExhausted, detail: error_msg.to_string() };
            }
            if health.compact_count >= 2 && timeout_re().is_match(&combined) {
                return ClassifiedFailure { reason: FailureReason::ContextExhausted, detail: error_msg.to_string() };
            }
        }
    }

    if timeout_re().is_match(&combined) {
        return ClassifiedFailure { reason: FailureReason::Timeout, detail: error_msg.to_string() };
    }

    ClassifiedFailure { reason: FailureReason::Error, detail: error_msg.to_string() }
}

fn health_for_session(
    registry: &AgentRegistry,
    agent_type: &str,
    project_cwd: &Path,
    session_id: &str,
) -> Option<HealthReport> {
    let parser = registry.get(agent_type)?;
    let sessions_dir = parser.sessions_dir(project_cwd);
    let file_path = sessions_dir.join(format!("{session_id}.jsonl"));
    parser.health_analysis(&file_path).ok()
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
