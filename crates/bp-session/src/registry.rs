// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent registry: `agentType -> {sessionsDir, parse, healthAnalysis}`
//! (§4.2, §9 "dynamic dispatch across agent variants"). Adding a third-party
//! agent type means implementing `SessionParser` and registering it; no
//! runtime type reflection is involved.

use crate::health::HealthReport;
use crate::timeline::Timeline;
use crate::SessionResult;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Capability record for one agent type: where its session logs live, how
/// to parse one into a `Timeline`, and how to derive a `HealthReport` from
/// it by inspection alone.
pub trait SessionParser: Send + Sync {
    /// The agent type tag this parser handles (e.g. `"claude-code"`).
    fn agent_type(&self) -> &'static str;

    /// Directory under a project's working directory where this agent
    /// writes its session log files.
    fn sessions_dir(&self, project_cwd: &Path) -> PathBuf;

    /// Parses a session log file's raw bytes into a normalized `Timeline`.
    fn parse(&self, file_path: &Path, raw_bytes: &[u8]) -> SessionResult<Timeline>;

    /// Computes a `HealthReport` by re-reading and inspecting the session
    /// log at `file_path` directly (no intermediate `Timeline` is required).
    fn health_analysis(&self, file_path: &Path) -> SessionResult<HealthReport>;
}

/// A registry of `SessionParser`s keyed by agent type tag. Process-wide,
/// constructed once at startup and passed by reference (§9).
#[derive(Clone, Default)]
pub struct AgentRegistry {
    parsers: HashMap<&'static str, Arc<dyn SessionParser>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, parser: Arc<dyn SessionParser>) {
        self.parsers.insert(parser.agent_type(), parser);
    }

    pub fn get(&self, agent_type: &str) -> Option<Arc<dyn SessionParser>> {
        self.parsers.get(agent_type).cloned()
    }

    pub fn with_claude_code() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(crate::claude::ClaudeCodeParser::default()));
        registry
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
