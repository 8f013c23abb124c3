// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recovery Supervisor (§4.7): reconciles the Store's persisted
//! `running`-execution state with the actual OS/filesystem state across a
//! process restart, then keeps a background monitor alive for as long as
//! any execution's fate remains ambiguous. Startup recovery is the first
//! iteration of that standing control loop, not a one-shot boot fix-up
//! (§9 design note) — `startup_recover` seeds the same `monitored` set
//! that `tick` keeps draining.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use bp_core::{Clock, EngineResult, ExecutionId, ExecutionStatus, FailureReason, MacroNodeId};
use bp_session::AgentRegistry;
use bp_store::{StaleExecution, Store, RESTART_SENTINEL};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::artifact_gen::{self, IdentityReshaper};
use crate::session_poll;

/// Startup cohort B lookback (§4.7.1): executions failed within this many
/// minutes whose `outputSummary` carries the restart sentinel are
/// re-examined in case a previous too-eager restart wrongly killed them.
pub const RESTART_LOOKBACK_MINUTES: i64 = 10;

/// Startup alive threshold: a session file mtime within this window counts
/// as live activity (§4.7.1).
pub const STARTUP_ACTIVE_WINDOW_SECS: i64 = 60;

/// Background monitor alive threshold, tighter than the startup window
/// because the monitor polls every 10s instead of once at boot (§4.7.2).
pub const MONITOR_ACTIVE_WINDOW_SECS: i64 = 30;

/// Interval the background monitor re-probes at.
pub const MONITOR_TICK_INTERVAL_SECS: u64 = 10;

/// Safety ceiling: an execution ambiguous for this long is forced to a
/// decision regardless of PID/mtime signals (§4.7.2).
pub const MONITOR_CEILING_MINUTES: i64 = 45;

/// An execution the background monitor is still watching.
#[derive(Debug, Clone)]
struct Monitored {
    node_id: MacroNodeId,
    cli_pid: Option<i64>,
    session_id: Option<String>,
    project_cwd: Option<String>,
    agent_type: String,
    started_at: DateTime<Utc>,
}

/// Outcome of the startup pass: orphaned `queued` nodes the daemon should
/// re-enqueue verbatim onto their blueprint queues (§4.7.1 last paragraph).
/// Re-enqueuing itself is the daemon's job — the Recovery Supervisor has no
/// handle on the Blueprint Queue, the same separation `node_executor.rs`
/// draws between single-node execution and queue-driven sequencing.
#[derive(Debug, Clone, Default)]
pub struct StartupOutcome {
    pub orphaned_queued_nodes: Vec<MacroNodeId>,
    pub alive_count: usize,
    pub silently_completed_count: usize,
    pub dead_count: usize,
}

enum Classification {
    Alive,
    SilentlyCompleted,
    Dead,
}

/// Zero-signal PID liveness probe. `false` on any error (process gone, or
/// `pid` owned by a different user and thus unprobeable — treated the same
/// as dead, since this service never runs the agent as another user).
fn pid_alive(pid: i64) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
}

pub struct RecoverySupervisor {
    store: Arc<Store>,
    registry: Arc<AgentRegistry>,
    clock: Arc<dyn Clock>,
    monitored: Mutex<HashMap<ExecutionId, Monitored>>,
}

impl RecoverySupervisor {
    pub fn new(store: Arc<Store>, registry: Arc<AgentRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self { store, registry, clock, monitored: Mutex::new(HashMap::new()) }
    }

    /// True once the monitored set has drained — the daemon clears its
    /// interval handle when this flips (§4.7.2 last sentence).
    pub fn is_idle(&self) -> bool {
        self.monitored.lock().is_empty()
    }

    fn sessions_dir_for(&self, agent_type: &str, project_cwd: Option<&str>) -> Option<std::path::PathBuf> {
        let cwd = project_cwd?;
        let parser = self.registry.get(agent_type)?;
        Some(parser.sessions_dir(Path::new(cwd)))
    }

    fn agent_type_for_node(&self, node_id: &MacroNodeId) -> String {
        self.store
            .get_node(node_id)
            .ok()
            .flatten()
            .map(|n| n.agent_type)
            .unwrap_or_else(|| "claude-code".to_string())
    }

    /// Classifies one execution against the active-window threshold in
    /// effect (60s at startup, 30s for the background monitor, §4.7.1/.2).
    fn classify(&self, exec: &StaleExecution, agent_type: &str, active_window_secs: i64) -> Classification {
        if exec.cli_pid.is_some_and(pid_alive) {
            return Classification::Alive;
        }
        let Some(sessions_dir) = self.sessions_dir_for(agent_type, exec.project_cwd.as_deref()) else {
            return Classification::Dead;
        };
        let Some(session_id) = &exec.session_id else {
            return Classification::Dead;
        };
        match session_poll::session_mtime(&sessions_dir, session_id) {
            Some(mtime) if (self.clock.now() - mtime).num_seconds() <= active_window_secs => Classification::Alive,
            Some(_) => Classification::SilentlyCompleted,
            None => Classification::Dead,
        }
    }

    /// Extracts the last substantive assistant message from a session log,
    /// for the handoff summary of an execution the process died on but
    /// which otherwise finished its work (§4.7.1 silently-completed path).
    fn last_assistant_message(&self, agent_type: &str, project_cwd: &str, session_id: &str) -> Option<String> {
        let parser = self.registry.get(agent_type)?;
        let sessions_dir = parser.sessions_dir(Path::new(project_cwd));
        let path = session_poll::session_file_path(&sessions_dir, session_id);
        let raw = std::fs::read(&path).ok()?;
        let timeline = parser.parse(&path, &raw).ok()?;
        timeline
            .nodes
            .iter()
            .rev()
            .find(|n| n.kind == bp_session::TimelineNodeKind::Assistant && !n.content.trim().is_empty())
            .map(|n| n.content.clone())
    }

    fn finalize_silently_completed(&self, exec: &StaleExecution, agent_type: &str) -> EngineResult<()> {
        let summary = exec
            .session_id
            .as_deref()
            .zip(exec.project_cwd.as_deref())
            .and_then(|(sid, cwd)| self.last_assistant_message(agent_type, cwd, sid))
            .unwrap_or_else(|| "recovered after daemon restart; session ended without a final summary".to_string());

        self.store.finalize_execution(&exec.execution_id, ExecutionStatus::Done, Some(&summary), None, None, None, None)?;
        self.store.update_node_status(&exec.node_id, bp_core::NodeStatus::Done, None)?;

        if let Some(node) = self.store.get_node(&exec.node_id)? {
            let _ = artifact_gen::generate_handoff_artifacts(&self.store, &node.blueprint_id, &node, &summary, &IdentityReshaper);
        }
        Ok(())
    }

    fn finalize_dead(&self, execution_id: &ExecutionId, node_id: &MacroNodeId) -> EngineResult<()> {
        self.store.finalize_execution(
            execution_id,
            ExecutionStatus::Failed,
            Some(RESTART_SENTINEL),
            Some(FailureReason::Error),
            None,
            None,
            None,
        )?;
        self.store.update_node_status(node_id, bp_core::NodeStatus::Failed, Some(RESTART_SENTINEL))?;
        Ok(())
    }

    /// Startup smart-recovery (§4.7.1): classifies cohort A (all `running`
    /// executions) and cohort B (recently restart-failed executions) into
    /// alive / silently-completed / dead, finalizes the ones it can decide
    /// immediately, batches the truly-dead cohort-A executions into a
    /// single atomic `recoverStaleExecutions` call, and seeds the
    /// background monitor with whatever it judged alive.
    pub fn startup_recover(&self) -> EngineResult<StartupOutcome> {
        let mut outcome = StartupOutcome::default();
        let mut skip_ids = Vec::new();

        for exec in self.store.get_stale_running_executions()? {
            let agent_type = self.agent_type_for_node(&exec.node_id);
            match self.classify(&exec, &agent_type, STARTUP_ACTIVE_WINDOW_SECS) {
                Classification::Alive => {
                    outcome.alive_count += 1;
                    skip_ids.push(exec.execution_id.clone());
                    self.monitored.lock().insert(
                        exec.execution_id.clone(),
                        Monitored {
                            node_id: exec.node_id.clone(),
                            cli_pid: exec.cli_pid,
                            session_id: exec.session_id.clone(),
                            project_cwd: exec.project_cwd.clone(),
                            agent_type,
                            started_at: exec.started_at,
                        },
                    );
                }
                Classification::SilentlyCompleted => {
                    outcome.silently_completed_count += 1;
                    skip_ids.push(exec.execution_id.clone());
                    self.finalize_silently_completed(&exec, &agent_type)?;
                }
                Classification::Dead => {
                    outcome.dead_count += 1;
                }
            }
        }
        self.store.recover_stale_executions(&skip_ids)?;

        for exec in self.store.get_recent_restart_failed_executions(RESTART_LOOKBACK_MINUTES)? {
            let agent_type = self.agent_type_for_node(&exec.node_id);
            if let Classification::Alive = self.classify(&exec, &agent_type, STARTUP_ACTIVE_WINDOW_SECS) {
                self.store.revert_execution_to_running(&exec.execution_id, &exec.node_id)?;
                self.monitored.lock().insert(
                    exec.execution_id.clone(),
                    Monitored {
                        node_id: exec.node_id.clone(),
                        cli_pid: exec.cli_pid,
                        session_id: exec.session_id.clone(),
                        project_cwd: exec.project_cwd.clone(),
                        agent_type,
                        started_at: exec.started_at,
                    },
                );
            }
        }

        outcome.orphaned_queued_nodes = self.store.get_orphaned_queued_nodes()?;
        Ok(outcome)
    }

    /// One pass of the background monitor (§4.7.2): re-probes every still-
    /// monitored execution and finalizes whichever has settled or blown
    /// past the 45-minute ceiling. Returns the number still ambiguous
    /// after this pass; the daemon clears its interval once that's zero.
    pub fn tick(&self) -> EngineResult<usize> {
        let snapshot: Vec<(ExecutionId, Monitored)> =
            self.monitored.lock().iter().map(|(k, v)| (k.clone(), v.clone())).collect();

        for (execution_id, mon) in snapshot {
            let stale = StaleExecution {
                execution_id: execution_id.clone(),
                node_id: mon.node_id.clone(),
                cli_pid: mon.cli_pid,
                session_id: mon.session_id.clone(),
                project_cwd: mon.project_cwd.clone(),
                started_at: mon.started_at,
            };
            let past_ceiling = (self.clock.now() - mon.started_at).num_minutes() >= MONITOR_CEILING_MINUTES;
            let classification = self.classify(&stale, &mon.agent_type, MONITOR_ACTIVE_WINDOW_SECS);

            let settle = match classification {
                Classification::Alive if past_ceiling => Classification::Dead,
                other => other,
            };

            match settle {
                Classification::Alive => continue,
                Classification::SilentlyCompleted => {
                    self.finalize_silently_completed(&stale, &mon.agent_type)?;
                    self.monitored.lock().remove(&execution_id);
                }
                Classification::Dead => {
                    self.finalize_dead(&execution_id, &mon.node_id)?;
                    self.monitored.lock().remove(&execution_id);
                }
            }
        }

        Ok(self.monitored.lock().len())
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
