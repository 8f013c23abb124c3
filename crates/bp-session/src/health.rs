// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HealthReport: derived-by-inspection session health metrics and the fixed
//! threshold formulas for context pressure and failure-reason inference
//! (§4.2).

use bp_core::{ContextPressure, FailureReason};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthReport {
    pub compact_count: u32,
    pub peak_tokens: u64,
    pub last_api_error: Option<String>,
    pub message_count: u32,
    pub ended_after_compaction: bool,
    pub responses_after_last_compact: u32,
}

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

fn overloaded_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)overloaded").unwrap())
}

impl HealthReport {
    /// Fixed-threshold classification of context pressure (§4.2).
    pub fn context_pressure(&self) -> ContextPressure {
        if self.compact_count >= 3 || (self.compact_count >= 2 && self.ended_after_compaction) {
            ContextPressure::Critical
        } else if self.compact_count >= 2 || (self.compact_count >= 1 && self.peak_tokens > 150_000)
        {
            ContextPressure::High
        } else if self.compact_count >= 1 || self.peak_tokens > 120_000 {
            ContextPressure::Moderate
        } else {
            ContextPressure::None
        }
    }

    /// Priority-ordered failure reason inference (§4.2): an explicit API
    /// error pattern wins over the compaction-count heuristic, which in turn
    /// only fires when no API error text was captured at all.
    pub fn failure_reason(&self) -> Option<FailureReason> {
        if let Some(err) = &self.last_api_error {
            if output_token_limit_re().is_match(err) {
                return Some(FailureReason::OutputTokenLimit);
            }
            if context_exhausted_re().is_match(err)
                || (overloaded_re().is_match(err) && self.compact_count >= 1)
            {
                return Some(FailureReason::ContextExhausted);
            }
            return Some(FailureReason::Error);
        }

        if self.ended_after_compaction && self.compact_count >= 2 {
            return Some(FailureReason::ContextExhausted);
        }
        if self.compact_count >= 3 {
            return Some(FailureReason::ContextExhausted);
        }
        if self.compact_count >= 2 && self.peak_tokens > 150_000 {
            return Some(FailureReason::ContextExhausted);
        }
        None
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
