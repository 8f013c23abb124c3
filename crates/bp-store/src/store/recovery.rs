// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recovery queries and the atomic batch recovery action consumed by the
//! Recovery Supervisor (§4.1, §4.7).

use super::convert::{execution_status_str, node_status_str, now_str, parse_dt};
use super::Store;
use crate::error::StoreResult;
use bp_core::{ExecutionId, ExecutionStatus, MacroNodeId, NodeStatus};
use rusqlite::params;

/// A `running` execution joined with its owning blueprint's project
/// directory, as consumed by the startup smart-recovery cohort A scan.
#[derive(Debug, Clone)]
pub struct StaleExecution {
    pub execution_id: ExecutionId,
    pub node_id: MacroNodeId,
    pub cli_pid: Option<i64>,
    pub session_id: Option<String>,
    pub project_cwd: Option<String>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl Store {
    /// Every execution with status=`running`, joined with its blueprint's
    /// project directory.
    pub fn get_stale_running_executions(&self) -> StoreResult<Vec<StaleExecution>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT e.id, e.node_id, e.cli_pid, e.session_id, b.project_cwd, e.started_at \
             FROM node_executions e JOIN blueprints b ON b.id = e.blueprint_id \
             WHERE e.status = ?1",
        )?;
        let rows = stmt.query_map(params![execution_status_str(ExecutionStatus::Running)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<i64>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (id, node_id, cli_pid, session_id, project_cwd, started_at) = row?;
            out.push(StaleExecution {
                execution_id: ExecutionId::new(id),
                node_id: MacroNodeId::new(node_id),
                cli_pid,
                session_id,
                project_cwd,
                started_at: parse_dt(&started_at)?,
            });
        }
        Ok(out)
    }

    /// Nodes with status=`queued`: either currently in an in-memory queue,
    /// or orphaned from a prior process incarnation (§3 invariant iv).
    pub fn get_orphaned_queued_nodes(&self) -> StoreResult<Vec<MacroNodeId>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT id FROM macro_nodes WHERE status = ?1")?;
        let ids = stmt
            .query_map(params![node_status_str(NodeStatus::Queued)], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids.into_iter().map(MacroNodeId::new).collect())
    }

    /// Executions failed within the last `minutes` whose `output_summary`
    /// contains the restart sentinel — cohort B: executions a previous
    /// too-eager restart may have wrongly killed.
    pub fn get_recent_restart_failed_executions(
        &self,
        minutes: i64,
    ) -> StoreResult<Vec<StaleExecution>> {
        let conn = self.conn.lock();
        let cutoff = now_str(chrono::Utc::now() - chrono::Duration::minutes(minutes));
        let like_pattern = format!("%{}%", super::RESTART_SENTINEL);
        let mut stmt = conn.prepare(
            "SELECT e.id, e.node_id, e.cli_pid, e.session_id, b.project_cwd, e.started_at \
             FROM node_executions e JOIN blueprints b ON b.id = e.blueprint_id \
             WHERE e.status = ?1 AND e.output_summary LIKE ?2 AND e.completed_at >= ?3",
        )?;
        let rows = stmt.query_map(
            params![execution_status_str(ExecutionStatus::Failed), like_pattern, cutoff],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )?;
        let mut out = Vec::new();
        for row in rows {
            let (id, node_id, cli_pid, session_id, project_cwd, started_at) = row?;
            out.push(StaleExecution {
                execution_id: ExecutionId::new(id),
                node_id: MacroNodeId::new(node_id),
                cli_pid,
                session_id,
                project_cwd,
                started_at: parse_dt(&started_at)?,
            });
        }
        Ok(out)
    }

    /// Marks every `running` execution not in `skip_ids` as `failed` with the
    /// restart sentinel, and its node as `failed` with a matching error, in a
    /// single transaction (invariant 8, §8).
    pub fn recover_stale_executions(&self, skip_ids: &[ExecutionId]) -> StoreResult<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let now = now_str(chrono::Utc::now());

        let mut stmt = tx.prepare(
            "SELECT id, node_id FROM node_executions WHERE status = ?1",
        )?;
        let candidates: Vec<(String, String)> = stmt
            .query_map(params![execution_status_str(ExecutionStatus::Running)], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<_, _>>()?;
        drop(stmt);

        let mut recovered = 0usize;
        for (exec_id, node_id) in candidates {
            if skip_ids.iter().any(|s| s.as_str() == exec_id) {
                continue;
            }
            tx.execute(
                "UPDATE node_executions SET status = ?1, output_summary = ?2, completed_at = ?3 WHERE id = ?4",
                params![
                    execution_status_str(ExecutionStatus::Failed),
                    super::RESTART_SENTINEL,
                    now,
                    exec_id
                ],
            )?;
            tx.execute(
                "UPDATE macro_nodes SET status = ?1, error = ?2, updated_at = ?3 WHERE id = ?4",
                params![
                    node_status_str(NodeStatus::Failed),
                    super::RESTART_SENTINEL,
                    now,
                    node_id
                ],
            )?;
            recovered += 1;
        }

        tx.commit()?;
        Ok(recovered)
    }

    /// Reverts a single execution (and its owning node) from a prior
    /// force-failure back to `running`, for cohort B executions the startup
    /// scan determines are in fact still alive (§4.7.1). Clears the restart
    /// sentinel and the `completed_at`/`output_summary` the force-failure set.
    pub fn revert_execution_to_running(
        &self,
        execution_id: &ExecutionId,
        node_id: &MacroNodeId,
    ) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "UPDATE node_executions SET status = ?1, output_summary = NULL, completed_at = NULL \
             WHERE id = ?2",
            params![execution_status_str(ExecutionStatus::Running), execution_id.as_str()],
        )?;
        tx.execute(
            "UPDATE macro_nodes SET status = ?1, error = NULL, updated_at = ?2 WHERE id = ?3",
            params![node_status_str(NodeStatus::Running), now_str(chrono::Utc::now()), node_id.as_str()],
        )?;
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
