// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The normalized Timeline every pluggable session parser produces (§4.2).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineNodeKind {
    User,
    Assistant,
    ToolUse,
    ToolResult,
    Error,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineNode {
    pub id: String,
    pub kind: TimelineNodeKind,
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub content: String,
    pub tool_name: Option<String>,
    pub tool_input: Option<serde_json::Value>,
    pub tool_result: Option<String>,
    pub tool_use_id: Option<String>,
}

/// An ordered list of normalized session records. Tool-use and tool-result
/// nodes are linked by `tool_use_id` so a result can be titled with its
/// originating tool's name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timeline {
    pub nodes: Vec<TimelineNode>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Links each `tool_result` node's title to the name of the `tool_use`
    /// node sharing its `tool_use_id`, when one is known.
    pub fn link_tool_results(&mut self) {
        let names: std::collections::HashMap<String, String> = self
            .nodes
            .iter()
            .filter(|n| n.kind == TimelineNodeKind::ToolUse)
            .filter_map(|n| Some((n.tool_use_id.clone()?, n.tool_name.clone()?)))
            .collect();
        for node in self
            .nodes
            .iter_mut()
            .filter(|n| n.kind == TimelineNodeKind::ToolResult)
        {
            if let Some(id) = &node.tool_use_id {
                if let Some(name) = names.get(id) {
                    node.title = format!("{name} result");
                    node.tool_name = Some(name.clone());
                }
            }
        }
    }
}
