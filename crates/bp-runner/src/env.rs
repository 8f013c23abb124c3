// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment variable stripping before spawn: the child inherits the
//! parent's environment minus anything that would make it think it is
//! nested inside another coding-agent invocation (§4.3 SUPPLEMENT).

/// Returns true if `key` should be stripped from the spawned agent's
/// environment.
pub fn should_strip(key: &str) -> bool {
    key == "CLAUDECODE"
        || key.starts_with("CLAUDE_CODE_")
        || key.contains("AGENT_SDK")
        || key.ends_with("_SESSION_ID")
}

/// Builds the environment map to pass to the child process: the current
/// process's environment, with nested-agent guard variables removed.
pub fn spawn_env() -> Vec<(String, String)> {
    std::env::vars().filter(|(k, _)| !should_strip(k)).collect()
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
