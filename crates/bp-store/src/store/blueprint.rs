// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::convert::{blueprint_status_parse, blueprint_status_str, now_str, parse_dt, parse_dt_opt};
use super::Store;
use crate::error::{StoreError, StoreResult};
use bp_core::{Blueprint, BlueprintId, BlueprintStatus, IdGen, UuidIdGen};
use rusqlite::{params, OptionalExtension, Row};

/// Full row decode, deferring timestamp parse errors to the caller since
/// `rusqlite::Row` callbacks can't return our own error type directly.
fn decode_blueprint(row: &Row) -> rusqlite::Result<RawBlueprint> {
    Ok(RawBlueprint {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        project_cwd: row.get(3)?,
        status: row.get(4)?,
        starred: row.get::<_, i64>(5)? != 0,
        archived_at: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

struct RawBlueprint {
    id: String,
    title: String,
    description: Option<String>,
    project_cwd: Option<String>,
    status: String,
    starred: bool,
    archived_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl RawBlueprint {
    fn into_blueprint(self) -> StoreResult<Blueprint> {
        Ok(Blueprint {
            id: BlueprintId::new(self.id),
            title: self.title,
            description: self.description,
            project_cwd: self.project_cwd,
            status: blueprint_status_parse(&self.status)?,
            starred: self.starred,
            archived_at: parse_dt_opt(self.archived_at)?,
            created_at: parse_dt(&self.created_at)?,
            updated_at: parse_dt(&self.updated_at)?,
        })
    }
}

const SELECT_COLUMNS: &str =
    "id, title, description, project_cwd, status, starred, archived_at, created_at, updated_at";

impl Store {
    pub fn create_blueprint(
        &self,
        title: &str,
        description: Option<&str>,
        project_cwd: Option<&str>,
    ) -> StoreResult<Blueprint> {
        let conn = self.conn.lock();
        let now = chrono::Utc::now();
        let id = UuidIdGen.next();
        conn.execute(
            "INSERT INTO blueprints (id, title, description, project_cwd, status, starred, archived_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, NULL, ?6, ?6)",
            params![
                id,
                title,
                description,
                project_cwd,
                blueprint_status_str(BlueprintStatus::Draft),
                now_str(now)
            ],
        )?;
        self.get_blueprint_locked(&conn, &id)?
            .ok_or_else(|| StoreError::NotFound(format!("blueprint {id} vanished after insert")))
    }

    pub fn get_blueprint(&self, id: &BlueprintId) -> StoreResult<Option<Blueprint>> {
        let conn = self.conn.lock();
        self.get_blueprint_locked(&conn, id.as_str())
    }

    fn get_blueprint_locked(
        &self,
        conn: &rusqlite::Connection,
        id: &str,
    ) -> StoreResult<Option<Blueprint>> {
        let raw = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM blueprints WHERE id = ?1"),
                params![id],
                decode_blueprint,
            )
            .optional()?;
        raw.map(RawBlueprint::into_blueprint).transpose()
    }

    /// Lists blueprints, starred first, then most recently updated. Archived
    /// blueprints are excluded unless `include_archived` is set.
    pub fn list_blueprints(
        &self,
        status: Option<BlueprintStatus>,
        project_cwd: Option<&str>,
        include_archived: bool,
    ) -> StoreResult<Vec<Blueprint>> {
        let conn = self.conn.lock();
        let mut sql = format!("SELECT {SELECT_COLUMNS} FROM blueprints WHERE 1=1");
        if !include_archived {
            sql.push_str(" AND archived_at IS NULL");
        }
        if status.is_some() {
            sql.push_str(" AND status = ?1");
        }
        if project_cwd.is_some() {
            sql.push_str(if status.is_some() {
                " AND project_cwd = ?2"
            } else {
                " AND project_cwd = ?1"
            });
        }
        sql.push_str(" ORDER BY starred DESC, updated_at DESC");

        let mut stmt = conn.prepare(&sql)?;
        let status_str = status.map(blueprint_status_str);
        let rows: Vec<RawBlueprint> = match (status_str, project_cwd) {
            (Some(s), Some(p)) => stmt
                .query_map(params![s, p], decode_blueprint)?
                .collect::<Result<_, _>>()?,
            (Some(s), None) => stmt
                .query_map(params![s], decode_blueprint)?
                .collect::<Result<_, _>>()?,
            (None, Some(p)) => stmt
                .query_map(params![p], decode_blueprint)?
                .collect::<Result<_, _>>()?,
            (None, None) => stmt
                .query_map([], decode_blueprint)?
                .collect::<Result<_, _>>()?,
        };
        rows.into_iter().map(RawBlueprint::into_blueprint).collect()
    }

    pub fn update_blueprint(
        &self,
        id: &BlueprintId,
        title: Option<&str>,
        description: Option<Option<&str>>,
        project_cwd: Option<Option<&str>>,
    ) -> StoreResult<Blueprint> {
        let conn = self.conn.lock();
        let existing = self
            .get_blueprint_locked(&conn, id.as_str())?
            .ok_or_else(|| StoreError::NotFound(format!("blueprint {id}")))?;
        let title = title.unwrap_or(&existing.title);
        let description = description.unwrap_or(existing.description.as_deref());
        let project_cwd = project_cwd.unwrap_or(existing.project_cwd.as_deref());
        let now = now_str(chrono::Utc::now());
        conn.execute(
            "UPDATE blueprints SET title = ?1, description = ?2, project_cwd = ?3, updated_at = ?4 WHERE id = ?5",
            params![title, description, project_cwd, now, id.as_str()],
        )?;
        self.get_blueprint_locked(&conn, id.as_str())?
            .ok_or_else(|| StoreError::NotFound(format!("blueprint {id}")))
    }

    pub fn set_blueprint_status(
        &self,
        id: &BlueprintId,
        status: BlueprintStatus,
    ) -> StoreResult<()> {
        let conn = self.conn.lock();
        let now = now_str(chrono::Utc::now());
        let changed = conn.execute(
            "UPDATE blueprints SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![blueprint_status_str(status), now, id.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("blueprint {id}")));
        }
        Ok(())
    }

    pub fn archive_blueprint(&self, id: &BlueprintId) -> StoreResult<()> {
        let conn = self.conn.lock();
        let now = now_str(chrono::Utc::now());
        let changed = conn.execute(
            "UPDATE blueprints SET archived_at = ?1, updated_at = ?1 WHERE id = ?2",
            params![now, id.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("blueprint {id}")));
        }
        Ok(())
    }

    pub fn unarchive_blueprint(&self, id: &BlueprintId) -> StoreResult<()> {
        let conn = self.conn.lock();
        let now = now_str(chrono::Utc::now());
        let changed = conn.execute(
            "UPDATE blueprints SET archived_at = NULL, updated_at = ?1 WHERE id = ?2",
            params![now, id.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("blueprint {id}")));
        }
        Ok(())
    }

    pub fn set_blueprint_starred(&self, id: &BlueprintId, starred: bool) -> StoreResult<()> {
        let conn = self.conn.lock();
        let now = now_str(chrono::Utc::now());
        let changed = conn.execute(
            "UPDATE blueprints SET starred = ?1, updated_at = ?2 WHERE id = ?3",
            params![starred as i64, now, id.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("blueprint {id}")));
        }
        Ok(())
    }

    /// Deletes a blueprint and, via `ON DELETE CASCADE`, every node,
    /// artifact, execution, and related session it owns.
    pub fn delete_blueprint(&self, id: &BlueprintId) -> StoreResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM blueprints WHERE id = ?1", params![id.as_str()])?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("blueprint {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "blueprint_tests.rs"]
mod tests;
