// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Related Session CRUD: audit trail for enrich/reevaluate/split/evaluate
//! side-sessions attached to a node (§3 Related Session).

use super::convert::{now_str, parse_dt, parse_dt_opt, related_session_type_parse, related_session_type_str};
use super::Store;
use crate::error::{StoreError, StoreResult};
use bp_core::{
    BlueprintId, IdGen, MacroNodeId, RelatedSession, RelatedSessionId, RelatedSessionType,
    SessionId, UuidIdGen,
};
use rusqlite::{params, OptionalExtension, Row};

struct RawRelatedSession {
    id: String,
    node_id: String,
    blueprint_id: String,
    session_id: String,
    session_type: String,
    started_at: String,
    completed_at: Option<String>,
}

fn decode(row: &Row) -> rusqlite::Result<RawRelatedSession> {
    Ok(RawRelatedSession {
        id: row.get(0)?,
        node_id: row.get(1)?,
        blueprint_id: row.get(2)?,
        session_id: row.get(3)?,
        session_type: row.get(4)?,
        started_at: row.get(5)?,
        completed_at: row.get(6)?,
    })
}

const SELECT_COLUMNS: &str =
    "id, node_id, blueprint_id, session_id, session_type, started_at, completed_at";

impl RawRelatedSession {
    fn into_related_session(self) -> StoreResult<RelatedSession> {
        Ok(RelatedSession {
            id: RelatedSessionId::new(self.id),
            node_id: MacroNodeId::new(self.node_id),
            blueprint_id: BlueprintId::new(self.blueprint_id),
            session_id: SessionId::new(self.session_id),
            session_type: related_session_type_parse(&self.session_type)?,
            started_at: parse_dt(&self.started_at)?,
            completed_at: parse_dt_opt(self.completed_at)?,
        })
    }
}

impl Store {
    pub fn create_related_session(
        &self,
        node_id: &MacroNodeId,
        blueprint_id: &BlueprintId,
        session_id: &SessionId,
        session_type: RelatedSessionType,
    ) -> StoreResult<RelatedSession> {
        let conn = self.conn.lock();
        let id = UuidIdGen.next();
        let now = now_str(chrono::Utc::now());
        conn.execute(
            "INSERT INTO related_sessions (id, node_id, blueprint_id, session_id, session_type, started_at, completed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL)",
            params![
                id,
                node_id.as_str(),
                blueprint_id.as_str(),
                session_id.as_str(),
                related_session_type_str(session_type),
                now
            ],
        )?;
        conn.query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM related_sessions WHERE id = ?1"),
            params![id],
            decode,
        )?
        .into_related_session()
    }

    pub fn complete_related_session(&self, id: &RelatedSessionId) -> StoreResult<()> {
        let conn = self.conn.lock();
        let now = now_str(chrono::Utc::now());
        let changed = conn.execute(
            "UPDATE related_sessions SET completed_at = ?1 WHERE id = ?2",
            params![now, id.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("related session {id}")));
        }
        Ok(())
    }

    pub fn list_related_sessions_for_node(
        &self,
        node_id: &MacroNodeId,
    ) -> StoreResult<Vec<RelatedSession>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM related_sessions WHERE node_id = ?1 ORDER BY started_at ASC"
        ))?;
        let raws: Vec<RawRelatedSession> = stmt
            .query_map(params![node_id.as_str()], decode)?
            .collect::<Result<_, _>>()?;
        raws.into_iter().map(RawRelatedSession::into_related_session).collect()
    }

    pub fn get_related_session_by_session_id(
        &self,
        session_id: &SessionId,
    ) -> StoreResult<Option<RelatedSession>> {
        let conn = self.conn.lock();
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM related_sessions WHERE session_id = ?1 \
                     ORDER BY started_at DESC LIMIT 1"
                ),
                params![session_id.as_str()],
                decode,
            )
            .optional()?;
        raw.map(RawRelatedSession::into_related_session).transpose()
    }
}

#[cfg(test)]
#[path = "related_session_tests.rs"]
mod tests;
