// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node Execution CRUD, including the callback-populated setters the
//! Callback Registry writes through to directly (§4.5).

use super::convert::{
    context_pressure_parse, context_pressure_str, execution_status_parse, execution_status_str,
    execution_type_parse, execution_type_str, failure_reason_parse, failure_reason_str, now_str,
    parse_dt, parse_dt_opt, reported_status_parse, reported_status_str,
};
use super::Store;
use crate::error::{StoreError, StoreResult};
use bp_core::{
    BlueprintId, ContextPressure, ExecutionId, ExecutionStatus, ExecutionType, FailureReason,
    IdGen, MacroNodeId, NodeExecution, ReportedStatus, SessionId, UuidIdGen,
};
use rusqlite::{params, OptionalExtension, Row};

struct RawExecution {
    id: String,
    node_id: String,
    blueprint_id: String,
    session_id: Option<String>,
    execution_type: String,
    status: String,
    input_context: Option<String>,
    output_summary: Option<String>,
    context_tokens_used: Option<i64>,
    parent_execution_id: Option<String>,
    cli_pid: Option<i64>,
    started_at: String,
    completed_at: Option<String>,
    blocker_info: Option<String>,
    task_summary: Option<String>,
    reported_status: Option<String>,
    reported_reason: Option<String>,
    failure_reason: Option<String>,
    compact_count: Option<i64>,
    peak_tokens: Option<i64>,
    context_pressure: Option<String>,
}

fn decode_execution(row: &Row) -> rusqlite::Result<RawExecution> {
    Ok(RawExecution {
        id: row.get(0)?,
        node_id: row.get(1)?,
        blueprint_id: row.get(2)?,
        session_id: row.get(3)?,
        execution_type: row.get(4)?,
        status: row.get(5)?,
        input_context: row.get(6)?,
        output_summary: row.get(7)?,
        context_tokens_used: row.get(8)?,
        parent_execution_id: row.get(9)?,
        cli_pid: row.get(10)?,
        started_at: row.get(11)?,
        completed_at: row.get(12)?,
        blocker_info: row.get(13)?,
        task_summary: row.get(14)?,
        reported_status: row.get(15)?,
        reported_reason: row.get(16)?,
        failure_reason: row.get(17)?,
        compact_count: row.get(18)?,
        peak_tokens: row.get(19)?,
        context_pressure: row.get(20)?,
    })
}

const SELECT_COLUMNS: &str = "id, node_id, blueprint_id, session_id, execution_type, status, \
    input_context, output_summary, context_tokens_used, parent_execution_id, cli_pid, started_at, \
    completed_at, blocker_info, task_summary, reported_status, reported_reason, failure_reason, \
    compact_count, peak_tokens, context_pressure";

impl RawExecution {
    fn into_execution(self) -> StoreResult<NodeExecution> {
        Ok(NodeExecution {
            id: ExecutionId::new(self.id),
            node_id: MacroNodeId::new(self.node_id),
            blueprint_id: BlueprintId::new(self.blueprint_id),
            session_id: self.session_id.map(SessionId::new),
            execution_type: execution_type_parse(&self.execution_type)?,
            status: execution_status_parse(&self.status)?,
            input_context: self.input_context,
            output_summary: self.output_summary,
            context_tokens_used: self.context_tokens_used,
            parent_execution_id: self.parent_execution_id.map(ExecutionId::new),
            cli_pid: self.cli_pid,
            started_at: parse_dt(&self.started_at)?,
            completed_at: parse_dt_opt(self.completed_at)?,
            blocker_info: self.blocker_info,
            task_summary: self.task_summary,
            reported_status: self.reported_status.as_deref().map(reported_status_parse).transpose()?,
            reported_reason: self.reported_reason,
            failure_reason: self.failure_reason.as_deref().map(failure_reason_parse).transpose()?,
            compact_count: self.compact_count,
            peak_tokens: self.peak_tokens,
            context_pressure: self
                .context_pressure
                .as_deref()
                .map(context_pressure_parse)
                .transpose()?,
        })
    }
}

impl Store {
    /// Creates a `running` execution. Per the open question in §9, there is
    /// no public path to create an execution with any other starting status
    /// — only the engine transitions one to a terminal status.
    #[allow(clippy::too_many_arguments)]
    pub fn create_execution(
        &self,
        node_id: &MacroNodeId,
        blueprint_id: &BlueprintId,
        execution_type: ExecutionType,
        input_context: Option<&str>,
        parent_execution_id: Option<&ExecutionId>,
    ) -> StoreResult<NodeExecution> {
        let conn = self.conn.lock();
        let id = UuidIdGen.next();
        let now = now_str(chrono::Utc::now());
        conn.execute(
            "INSERT INTO node_executions (id, node_id, blueprint_id, session_id, execution_type, status, \
             input_context, output_summary, context_tokens_used, parent_execution_id, cli_pid, started_at, \
             completed_at, blocker_info, task_summary, reported_status, reported_reason, failure_reason, \
             compact_count, peak_tokens, context_pressure) \
             VALUES (?1, ?2, ?3, NULL, ?4, ?5, ?6, NULL, NULL, ?7, NULL, ?8, NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL)",
            params![
                id,
                node_id.as_str(),
                blueprint_id.as_str(),
                execution_type_str(execution_type),
                execution_status_str(ExecutionStatus::Running),
                input_context,
                parent_execution_id.map(ExecutionId::as_str),
                now
            ],
        )?;
        self.get_execution_locked(&conn, &id)?
            .ok_or_else(|| StoreError::NotFound(format!("execution {id} vanished after insert")))
    }

    pub fn get_execution(&self, id: &ExecutionId) -> StoreResult<Option<NodeExecution>> {
        let conn = self.conn.lock();
        self.get_execution_locked(&conn, id.as_str())
    }

    fn get_execution_locked(
        &self,
        conn: &rusqlite::Connection,
        id: &str,
    ) -> StoreResult<Option<NodeExecution>> {
        let raw = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM node_executions WHERE id = ?1"),
                params![id],
                decode_execution,
            )
            .optional()?;
        raw.map(RawExecution::into_execution).transpose()
    }

    pub fn list_executions_for_node(&self, node_id: &MacroNodeId) -> StoreResult<Vec<NodeExecution>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM node_executions WHERE node_id = ?1 ORDER BY started_at ASC"
        ))?;
        let raws: Vec<RawExecution> = stmt
            .query_map(params![node_id.as_str()], decode_execution)?
            .collect::<Result<_, _>>()?;
        raws.into_iter().map(RawExecution::into_execution).collect()
    }

    pub fn get_execution_by_session_id(
        &self,
        session_id: &SessionId,
    ) -> StoreResult<Option<NodeExecution>> {
        let conn = self.conn.lock();
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM node_executions WHERE session_id = ?1 \
                     ORDER BY started_at DESC LIMIT 1"
                ),
                params![session_id.as_str()],
                decode_execution,
            )
            .optional()?;
        raw.map(RawExecution::into_execution).transpose()
    }

    /// Reverse lookup: session id -> owning node, via its latest execution.
    pub fn get_node_id_by_session_id(
        &self,
        session_id: &SessionId,
    ) -> StoreResult<Option<MacroNodeId>> {
        Ok(self
            .get_execution_by_session_id(session_id)?
            .map(|e| e.node_id))
    }

    pub fn set_execution_session_id(
        &self,
        id: &ExecutionId,
        session_id: &SessionId,
    ) -> StoreResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE node_executions SET session_id = ?1 WHERE id = ?2",
            params![session_id.as_str(), id.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("execution {id}")));
        }
        Ok(())
    }

    pub fn set_execution_pid(&self, id: &ExecutionId, pid: i64) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE node_executions SET cli_pid = ?1 WHERE id = ?2",
            params![pid, id.as_str()],
        )?;
        Ok(())
    }

    /// Execution-scoped callback: `report-blocker`.
    pub fn set_blocker(&self, id: &ExecutionId, blocker_info_json: &str) -> StoreResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE node_executions SET blocker_info = ?1 WHERE id = ?2",
            params![blocker_info_json, id.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("execution {id}")));
        }
        Ok(())
    }

    /// Execution-scoped callback: `task-summary`.
    pub fn set_task_summary(&self, id: &ExecutionId, summary: &str) -> StoreResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE node_executions SET task_summary = ?1 WHERE id = ?2",
            params![summary, id.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("execution {id}")));
        }
        Ok(())
    }

    /// Execution-scoped callback: `report-status`. Authoritative over any
    /// stdout-inferred outcome (§4.6.2 priority 1).
    pub fn set_reported_status(
        &self,
        id: &ExecutionId,
        status: ReportedStatus,
        reason: Option<&str>,
    ) -> StoreResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE node_executions SET reported_status = ?1, reported_reason = ?2 WHERE id = ?3",
            params![reported_status_str(status), reason, id.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("execution {id}")));
        }
        Ok(())
    }

    /// Finalizes an execution with its terminal status, output summary, and
    /// health-report-derived fields (compaction/token/pressure), all in one
    /// write (§4.6.2's "in every exit path" requirement).
    #[allow(clippy::too_many_arguments)]
    pub fn finalize_execution(
        &self,
        id: &ExecutionId,
        status: ExecutionStatus,
        output_summary: Option<&str>,
        failure_reason: Option<FailureReason>,
        compact_count: Option<i64>,
        peak_tokens: Option<i64>,
        context_pressure: Option<ContextPressure>,
    ) -> StoreResult<()> {
        let conn = self.conn.lock();
        let now = now_str(chrono::Utc::now());
        let changed = conn.execute(
            "UPDATE node_executions SET status = ?1, output_summary = ?2, failure_reason = ?3, \
             compact_count = ?4, peak_tokens = ?5, context_pressure = ?6, \
             context_tokens_used = COALESCE(?5, context_tokens_used), completed_at = ?7 WHERE id = ?8",
            params![
                execution_status_str(status),
                output_summary,
                failure_reason.map(failure_reason_str),
                compact_count,
                peak_tokens,
                context_pressure.map(context_pressure_str),
                now,
                id.as_str()
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("execution {id}")));
        }
        Ok(())
    }

    pub fn update_execution_output_summary(
        &self,
        id: &ExecutionId,
        output_summary: &str,
    ) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE node_executions SET output_summary = ?1 WHERE id = ?2",
            params![output_summary, id.as_str()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
