// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output cleaning: ANSI CSI/OSC sequence stripping, carriage-return
//! removal, and spawn-line stripping (§4.3).

use regex::Regex;
use std::sync::OnceLock;

fn csi_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").unwrap())
}

fn osc_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\][^\x07]*\x07").unwrap())
}

/// Strips ANSI CSI (`ESC [ ... letter`) and OSC (`ESC ] ... BEL`) escape
/// sequences and all carriage returns from raw subprocess stdout.
pub fn strip_ansi(input: &str) -> String {
    let no_osc = osc_re().replace_all(input, "");
    let no_csi = csi_re().replace_all(&no_osc, "");
    no_csi.replace('\r', "")
}

/// Strips the terminal-echoed spawn line: the first line beginning with
/// `spawn ` and containing the agent binary path.
pub fn strip_spawn_line(input: &str, agent_binary: &str) -> String {
    let mut lines = input.lines();
    if let Some(first) = lines.clone().next() {
        if first.starts_with("spawn ") && first.contains(agent_binary) {
            lines.next();
            return lines.collect::<Vec<_>>().join("\n");
        }
    }
    input.to_string()
}

/// Full cleaning pipeline applied to raw subprocess stdout before the
/// Executor ever sees it.
pub fn clean_stdout(raw: &str, agent_binary: &str) -> String {
    let stripped = strip_ansi(raw);
    strip_spawn_line(&stripped, agent_binary)
}

#[cfg(test)]
#[path = "strip_tests.rs"]
mod tests;
