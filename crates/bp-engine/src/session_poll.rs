// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session file discovery and liveness-by-mtime helpers shared by the Node
//! Executor's post-spawn session poller (§4.6.1 step 7) and the Recovery
//! Supervisor's alive/silently-completed classification (§4.7.1, §4.7.2).
//!
//! Agent CLIs assign their own session id once they start; the executor
//! doesn't know it in advance, so it polls the agent type's `sessions_dir`
//! for the newest log file that appeared after the run started.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};

fn system_time_to_utc(t: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(t)
}

/// The file a session parser writes `session_id`'s log to.
pub fn session_file_path(sessions_dir: &Path, session_id: &str) -> PathBuf {
    sessions_dir.join(format!("{session_id}.jsonl"))
}

pub fn session_file_exists(sessions_dir: &Path, session_id: &str) -> bool {
    session_file_path(sessions_dir, session_id).exists()
}

/// Last-modified time of `session_id`'s log file, or `None` if it doesn't
/// exist or its metadata can't be read.
pub fn session_mtime(sessions_dir: &Path, session_id: &str) -> Option<DateTime<Utc>> {
    let path = session_file_path(sessions_dir, session_id);
    let metadata = std::fs::metadata(path).ok()?;
    metadata.modified().ok().map(system_time_to_utc)
}

/// Scans `sessions_dir` for the most recently modified `.jsonl` file whose
/// mtime is at or after `since`, returning its session id (file stem) and
/// mtime. Used right after spawning an agent, when its session id isn't
/// known yet, and by the Recovery Supervisor when an execution's own
/// `session_id` column was never populated before the daemon died.
pub fn scan_for_new_session(sessions_dir: &Path, since: DateTime<Utc>) -> Option<(String, DateTime<Utc>)> {
    let entries = std::fs::read_dir(sessions_dir).ok()?;
    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "jsonl"))
        .filter_map(|entry| {
            let mtime = entry.metadata().ok()?.modified().ok().map(system_time_to_utc)?;
            let session_id = entry.path().file_stem()?.to_str()?.to_string();
            Some((session_id, mtime))
        })
        .filter(|(_, mtime)| *mtime >= since)
        .max_by_key(|(_, mtime)| *mtime)
}

#[cfg(test)]
#[path = "session_poll_tests.rs"]
mod tests;
