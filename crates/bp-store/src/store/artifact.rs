// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact CRUD: small textual hand-offs between nodes (§3 Artifact).

use super::convert::{artifact_type_parse, artifact_type_str, now_str, parse_dt};
use super::Store;
use crate::error::{StoreError, StoreResult};
use bp_core::{Artifact, ArtifactId, ArtifactType, BlueprintId, IdGen, MacroNodeId, UuidIdGen};
use rusqlite::{params, OptionalExtension, Row};

struct RawArtifact {
    id: String,
    blueprint_id: String,
    source_node_id: String,
    target_node_id: Option<String>,
    artifact_type: String,
    content: String,
    created_at: String,
}

fn decode_artifact(row: &Row) -> rusqlite::Result<RawArtifact> {
    Ok(RawArtifact {
        id: row.get(0)?,
        blueprint_id: row.get(1)?,
        source_node_id: row.get(2)?,
        target_node_id: row.get(3)?,
        artifact_type: row.get(4)?,
        content: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const SELECT_COLUMNS: &str =
    "id, blueprint_id, source_node_id, target_node_id, artifact_type, content, created_at";

impl RawArtifact {
    fn into_artifact(self) -> StoreResult<Artifact> {
        Ok(Artifact {
            id: ArtifactId::new(self.id),
            blueprint_id: BlueprintId::new(self.blueprint_id),
            source_node_id: MacroNodeId::new(self.source_node_id),
            target_node_id: self.target_node_id.map(MacroNodeId::new),
            artifact_type: artifact_type_parse(&self.artifact_type)?,
            content: self.content,
            created_at: parse_dt(&self.created_at)?,
        })
    }
}

/// Which side of an artifact's edge to filter on when listing for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactDirection {
    /// Artifacts produced by the node (`source_node_id = node`).
    Output,
    /// Artifacts consumed by the node (`target_node_id = node`).
    Input,
}

impl Store {
    /// Creates an artifact. `target_node_id = None` means a blueprint-level
    /// audit record (the source node had no dependents).
    pub fn create_artifact(
        &self,
        blueprint_id: &BlueprintId,
        source_node_id: &MacroNodeId,
        target_node_id: Option<&MacroNodeId>,
        artifact_type: ArtifactType,
        content: &str,
    ) -> StoreResult<Artifact> {
        let conn = self.conn.lock();
        let id = UuidIdGen.next();
        let now = now_str(chrono::Utc::now());
        conn.execute(
            "INSERT INTO artifacts (id, blueprint_id, source_node_id, target_node_id, artifact_type, content, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                blueprint_id.as_str(),
                source_node_id.as_str(),
                target_node_id.map(MacroNodeId::as_str),
                artifact_type_str(artifact_type),
                content,
                now
            ],
        )?;
        let raw = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM artifacts WHERE id = ?1"),
                params![id],
                decode_artifact,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("artifact {id} vanished after insert")))?;
        raw.into_artifact()
    }

    /// Artifacts for a node in the given direction, oldest first.
    pub fn list_artifacts_for_node(
        &self,
        node_id: &MacroNodeId,
        direction: ArtifactDirection,
    ) -> StoreResult<Vec<Artifact>> {
        let conn = self.conn.lock();
        let column = match direction {
            ArtifactDirection::Output => "source_node_id",
            ArtifactDirection::Input => "target_node_id",
        };
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM artifacts WHERE {column} = ?1 ORDER BY created_at ASC"
        ))?;
        let raws: Vec<RawArtifact> = stmt
            .query_map(params![node_id.as_str()], decode_artifact)?
            .collect::<Result<_, _>>()?;
        raws.into_iter().map(RawArtifact::into_artifact).collect()
    }

    /// The latest output artifact targeted at `target_node_id` and produced
    /// by `source_node_id`, or the latest with a null target if none exists
    /// (§4.6.1 step 3: input artifact collection).
    pub fn latest_input_artifact(
        &self,
        source_node_id: &MacroNodeId,
        target_node_id: &MacroNodeId,
    ) -> StoreResult<Option<Artifact>> {
        let conn = self.conn.lock();
        let targeted = conn
            .query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM artifacts WHERE source_node_id = ?1 AND target_node_id = ?2 \
                     ORDER BY created_at DESC LIMIT 1"
                ),
                params![source_node_id.as_str(), target_node_id.as_str()],
                decode_artifact,
            )
            .optional()?;
        let raw = match targeted {
            Some(r) => Some(r),
            None => conn
                .query_row(
                    &format!(
                        "SELECT {SELECT_COLUMNS} FROM artifacts WHERE source_node_id = ?1 AND target_node_id IS NULL \
                         ORDER BY created_at DESC LIMIT 1"
                    ),
                    params![source_node_id.as_str()],
                    decode_artifact,
                )
                .optional()?,
        };
        raw.map(RawArtifact::into_artifact).transpose()
    }

    pub fn delete_artifact(&self, id: &ArtifactId) -> StoreResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM artifacts WHERE id = ?1", params![id.as_str()])?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("artifact {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
