// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The one concrete session parser shipped with this service: a
//! Claude-Code-style append-only JSONL session log (§4.2 SUPPLEMENT).

mod schema;

use crate::health::HealthReport;
use crate::registry::SessionParser;
use crate::timeline::{Timeline, TimelineNode, TimelineNodeKind};
use crate::{SessionError, SessionResult};
use chrono::{DateTime, Utc};
use schema::{AssistantContent, ClaudeRecord};
use std::path::{Path, PathBuf};

#[derive(Default)]
pub struct ClaudeCodeParser;

pub const AGENT_TYPE: &str = "claude-code";

fn parse_timestamp(raw: &str, line: usize) -> SessionResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SessionError::Malformed {
            line,
            message: format!("bad timestamp '{raw}': {e}"),
        })
}

impl SessionParser for ClaudeCodeParser {
    fn agent_type(&self) -> &'static str {
        AGENT_TYPE
    }

    fn sessions_dir(&self, project_cwd: &Path) -> PathBuf {
        project_cwd.join(".claude").join("sessions")
    }

    fn parse(&self, file_path: &Path, raw_bytes: &[u8]) -> SessionResult<Timeline> {
        let text = String::from_utf8_lossy(raw_bytes);
        let mut timeline = Timeline::new();

        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record: ClaudeRecord = serde_json::from_str(line).map_err(|e| SessionError::Malformed {
                line: idx + 1,
                message: format!("{} line {}: {e}", file_path.display(), idx + 1),
            })?;

            match record {
                ClaudeRecord::User(rec) => {
                    let ts = parse_timestamp(&rec.timestamp, idx + 1)?;
                    let content = rec
                        .message
                        .content
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| rec.message.content.to_string());
                    timeline.nodes.push(TimelineNode {
                        id: rec.uuid,
                        kind: TimelineNodeKind::User,
                        timestamp: ts,
                        title: "user message".to_string(),
                        content,
                        tool_name: None,
                        tool_input: None,
                        tool_result: None,
                        tool_use_id: None,
                    });
                }
                ClaudeRecord::Assistant(rec) => {
                    let ts = parse_timestamp(&rec.timestamp, idx + 1)?;
                    for item in rec.message.content {
                        match item {
                            AssistantContent::Text { text } => {
                                timeline.nodes.push(TimelineNode {
                                    id: rec.uuid.clone(),
                                    kind: TimelineNodeKind::Assistant,
                                    timestamp: ts,
                                    title: "assistant message".to_string(),
                                    content: text,
                                    tool_name: None,
                                    tool_input: None,
                                    tool_result: None,
                                    tool_use_id: None,
                                });
                            }
                            AssistantContent::ToolUse { id, name, input } => {
                                timeline.nodes.push(TimelineNode {
                                    id: id.clone(),
                                    kind: TimelineNodeKind::ToolUse,
                                    timestamp: ts,
                                    title: format!("tool: {name}"),
                                    content: input.to_string(),
                                    tool_name: Some(name),
                                    tool_input: Some(input),
                                    tool_result: None,
                                    tool_use_id: Some(id),
                                });
                            }
                            AssistantContent::Unknown => {}
                        }
                    }
                }
                ClaudeRecord::System(rec) => {
                    let ts = parse_timestamp(&rec.timestamp, idx + 1)?;
                    let kind = if rec.is_api_error_message {
                        TimelineNodeKind::Error
                    } else {
                        TimelineNodeKind::System
                    };
                    timeline.nodes.push(TimelineNode {
                        id: rec.uuid,
                        kind,
                        timestamp: ts,
                        title: rec.subtype.clone().unwrap_or_else(|| "system".to_string()),
                        content: rec.content.unwrap_or_default(),
                        tool_name: None,
                        tool_input: None,
                        tool_result: None,
                        tool_use_id: None,
                    });
                }
                ClaudeRecord::Unknown => {}
            }
        }

        timeline.link_tool_results();
        Ok(timeline)
    }

    fn health_analysis(&self, file_path: &Path) -> SessionResult<HealthReport> {
        let bytes = std::fs::read(file_path).map_err(|e| SessionError::Io {
            path: file_path.display().to_string(),
            source: e,
        })?;
        health_from_bytes(&bytes)
    }
}

fn health_from_bytes(bytes: &[u8]) -> SessionResult<HealthReport> {
    let text = String::from_utf8_lossy(bytes);
    let mut report = HealthReport::default();
    let mut responses_since_compact = 0u32;
    let mut saw_compact = false;

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        report.message_count += 1;
        let record: ClaudeRecord = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(_) => continue,
        };

        match record {
            ClaudeRecord::System(rec) => {
                if rec.is_api_error_message {
                    report.last_api_error = rec.content.clone();
                }
                if rec.subtype.as_deref() == Some("compact_boundary") {
                    report.compact_count += 1;
                    if let Some(pre) = rec.compact_metadata.as_ref().and_then(|m| m.pre_tokens) {
                        report.peak_tokens = report.peak_tokens.max(pre);
                    }
                    saw_compact = true;
                    responses_since_compact = 0;
                }
            }
            ClaudeRecord::Assistant(rec) => {
                if let Some(usage) = rec.message.usage {
                    let total = usage.input_tokens + usage.cache_read_input_tokens.unwrap_or(0);
                    report.peak_tokens = report.peak_tokens.max(total);
                }
                if saw_compact {
                    responses_since_compact += 1;
                }
            }
            _ => {}
        }
    }

    report.responses_after_last_compact = responses_since_compact;
    report.ended_after_compaction = saw_compact && responses_since_compact <= 1;
    Ok(report)
}

#[cfg(test)]
#[path = "claude_tests.rs"]
mod tests;
