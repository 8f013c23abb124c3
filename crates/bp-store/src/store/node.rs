// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::convert::{node_status_parse, node_status_str, now_str, parse_dt};
use super::Store;
use crate::error::{StoreError, StoreResult};
use bp_core::{IdGen, MacroNode, MacroNodeId, NodeStatus, UuidIdGen};
use rusqlite::{params, Connection, OptionalExtension, Row};

struct RawNode {
    id: String,
    blueprint_id: String,
    ord: i64,
    title: String,
    description: Option<String>,
    prompt: Option<String>,
    status: String,
    error: Option<String>,
    estimated_minutes: Option<i64>,
    actual_minutes: Option<i64>,
    parallel_group: Option<String>,
    agent_type: String,
    created_at: String,
    updated_at: String,
}

fn decode_node(row: &Row) -> rusqlite::Result<RawNode> {
    Ok(RawNode {
        id: row.get(0)?,
        blueprint_id: row.get(1)?,
        ord: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        prompt: row.get(5)?,
        status: row.get(6)?,
        error: row.get(7)?,
        estimated_minutes: row.get(8)?,
        actual_minutes: row.get(9)?,
        parallel_group: row.get(10)?,
        agent_type: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

const SELECT_COLUMNS: &str = "id, blueprint_id, ord, title, description, prompt, status, error, \
    estimated_minutes, actual_minutes, parallel_group, agent_type, created_at, updated_at";

fn dependencies_for(conn: &Connection, node_id: &str) -> StoreResult<Vec<MacroNodeId>> {
    let mut stmt = conn.prepare(
        "SELECT dep_id FROM node_dependencies WHERE node_id = ?1 ORDER BY position ASC",
    )?;
    let ids = stmt
        .query_map(params![node_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids.into_iter().map(MacroNodeId::new).collect())
}

impl RawNode {
    fn into_node(self, dependencies: Vec<MacroNodeId>) -> StoreResult<MacroNode> {
        Ok(MacroNode {
            id: MacroNodeId::new(self.id),
            blueprint_id: bp_core::BlueprintId::new(self.blueprint_id),
            order: self.ord,
            title: self.title,
            description: self.description,
            prompt: self.prompt,
            dependencies,
            status: node_status_parse(&self.status)?,
            error: self.error,
            estimated_minutes: self.estimated_minutes,
            actual_minutes: self.actual_minutes,
            parallel_group: self.parallel_group,
            agent_type: self.agent_type,
            created_at: parse_dt(&self.created_at)?,
            updated_at: parse_dt(&self.updated_at)?,
        })
    }
}

impl Store {
    /// Creates a node. `at_order` inserts at that ordinal and shifts every
    /// existing node with `order >= at_order` by +1; `None` appends at the
    /// end. Every id in `dependencies` must already exist in the same
    /// blueprint, or the insert fails with `ForeignKey`.
    #[allow(clippy::too_many_arguments)]
    pub fn create_node(
        &self,
        blueprint_id: &bp_core::BlueprintId,
        title: &str,
        description: Option<&str>,
        prompt: Option<&str>,
        dependencies: Vec<MacroNodeId>,
        at_order: Option<i64>,
        estimated_minutes: Option<i64>,
        agent_type: &str,
    ) -> StoreResult<MacroNode> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        for dep in &dependencies {
            let dep_blueprint: Option<String> = tx
                .query_row(
                    "SELECT blueprint_id FROM macro_nodes WHERE id = ?1",
                    params![dep.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            match dep_blueprint {
                Some(b) if b == blueprint_id.as_str() => {}
                Some(_) => {
                    return Err(StoreError::ForeignKey(format!(
                        "dependency {dep} belongs to a different blueprint"
                    )))
                }
                None => {
                    return Err(StoreError::ForeignKey(format!(
                        "dependency {dep} does not exist"
                    )))
                }
            }
        }

        let next_order: i64 = tx.query_row(
            "SELECT COALESCE(MAX(ord), -1) + 1 FROM macro_nodes WHERE blueprint_id = ?1",
            params![blueprint_id.as_str()],
            |row| row.get(0),
        )?;
        let order = at_order.unwrap_or(next_order);

        tx.execute(
            "UPDATE macro_nodes SET ord = ord + 1 WHERE blueprint_id = ?1 AND ord >= ?2",
            params![blueprint_id.as_str(), order],
        )?;

        let id = UuidIdGen.next();
        let now = now_str(chrono::Utc::now());
        tx.execute(
            "INSERT INTO macro_nodes (id, blueprint_id, ord, title, description, prompt, status, error, \
             estimated_minutes, actual_minutes, parallel_group, agent_type, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, ?8, NULL, NULL, ?9, ?10, ?10)",
            params![
                id,
                blueprint_id.as_str(),
                order,
                title,
                description,
                prompt,
                node_status_str(NodeStatus::Pending),
                estimated_minutes,
                agent_type,
                now
            ],
        )?;

        for (position, dep) in dependencies.iter().enumerate() {
            tx.execute(
                "INSERT INTO node_dependencies (node_id, dep_id, position) VALUES (?1, ?2, ?3)",
                params![id, dep.as_str(), position as i64],
            )?;
        }

        tx.commit()?;

        let conn = self.conn.lock();
        self.get_node_locked(&conn, &id)?
            .ok_or_else(|| StoreError::NotFound(format!("node {id} vanished after insert")))
    }

    pub fn get_node(&self, id: &MacroNodeId) -> StoreResult<Option<MacroNode>> {
        let conn = self.conn.lock();
        self.get_node_locked(&conn, id.as_str())
    }

    fn get_node_locked(&self, conn: &Connection, id: &str) -> StoreResult<Option<MacroNode>> {
        let raw = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM macro_nodes WHERE id = ?1"),
                params![id],
                decode_node,
            )
            .optional()?;
        match raw {
            None => Ok(None),
            Some(raw) => {
                let deps = dependencies_for(conn, id)?;
                Some(raw.into_node(deps)).transpose()
            }
        }
    }

    pub fn list_nodes_for_blueprint(
        &self,
        blueprint_id: &bp_core::BlueprintId,
    ) -> StoreResult<Vec<MacroNode>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM macro_nodes WHERE blueprint_id = ?1 ORDER BY ord ASC"
        ))?;
        let raws: Vec<RawNode> = stmt
            .query_map(params![blueprint_id.as_str()], decode_node)?
            .collect::<Result<_, _>>()?;
        raws.into_iter()
            .map(|raw| {
                let deps = dependencies_for(&conn, &raw.id)?;
                raw.into_node(deps)
            })
            .collect()
    }

    pub fn update_node_status(
        &self,
        id: &MacroNodeId,
        status: NodeStatus,
        error: Option<&str>,
    ) -> StoreResult<()> {
        let conn = self.conn.lock();
        let now = now_str(chrono::Utc::now());
        let changed = conn.execute(
            "UPDATE macro_nodes SET status = ?1, error = ?2, updated_at = ?3 WHERE id = ?4",
            params![node_status_str(status), error, now, id.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("node {id}")));
        }
        Ok(())
    }

    pub fn update_node_fields(
        &self,
        id: &MacroNodeId,
        title: Option<&str>,
        description: Option<Option<&str>>,
        prompt: Option<Option<&str>>,
        estimated_minutes: Option<Option<i64>>,
        parallel_group: Option<Option<&str>>,
    ) -> StoreResult<MacroNode> {
        let conn = self.conn.lock();
        let existing = self
            .get_node_locked(&conn, id.as_str())?
            .ok_or_else(|| StoreError::NotFound(format!("node {id}")))?;
        let title = title.unwrap_or(&existing.title);
        let description = description.unwrap_or(existing.description.as_deref());
        let prompt = prompt.unwrap_or(existing.prompt.as_deref());
        let estimated_minutes = estimated_minutes.unwrap_or(existing.estimated_minutes);
        let parallel_group = parallel_group.unwrap_or(existing.parallel_group.as_deref());
        let now = now_str(chrono::Utc::now());
        conn.execute(
            "UPDATE macro_nodes SET title = ?1, description = ?2, prompt = ?3, \
             estimated_minutes = ?4, parallel_group = ?5, updated_at = ?6 WHERE id = ?7",
            params![
                title,
                description,
                prompt,
                estimated_minutes,
                parallel_group,
                now,
                id.as_str()
            ],
        )?;
        self.get_node_locked(&conn, id.as_str())?
            .ok_or_else(|| StoreError::NotFound(format!("node {id}")))
    }

    pub fn set_node_actual_minutes(&self, id: &MacroNodeId, minutes: i64) -> StoreResult<()> {
        let conn = self.conn.lock();
        let now = now_str(chrono::Utc::now());
        conn.execute(
            "UPDATE macro_nodes SET actual_minutes = ?1, updated_at = ?2 WHERE id = ?3",
            params![minutes, now, id.as_str()],
        )?;
        Ok(())
    }

    /// Adds a dependency edge to an existing node's end of the ordered
    /// dependency list (used by `ADD_SIBLING`/`INSERT_BETWEEN` graph
    /// mutations). Idempotent: adding an already-present dependency is a
    /// no-op.
    pub fn add_node_dependency(&self, node_id: &MacroNodeId, dep_id: &MacroNodeId) -> StoreResult<()> {
        let conn = self.conn.lock();
        let already: i64 = conn.query_row(
            "SELECT COUNT(*) FROM node_dependencies WHERE node_id = ?1 AND dep_id = ?2",
            params![node_id.as_str(), dep_id.as_str()],
            |row| row.get(0),
        )?;
        if already > 0 {
            return Ok(());
        }
        let next_position: i64 = conn.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM node_dependencies WHERE node_id = ?1",
            params![node_id.as_str()],
            |row| row.get(0),
        )?;
        conn.execute(
            "INSERT INTO node_dependencies (node_id, dep_id, position) VALUES (?1, ?2, ?3)",
            params![node_id.as_str(), dep_id.as_str(), next_position],
        )?;
        Ok(())
    }

    /// Replaces every occurrence of `old_dep` with `new_dep` across every
    /// node in `blueprint_id`'s dependency lists (used by `INSERT_BETWEEN`
    /// rewiring, §4.6.6).
    pub fn rewire_dependency(
        &self,
        blueprint_id: &bp_core::BlueprintId,
        old_dep: &MacroNodeId,
        new_dep: &MacroNodeId,
    ) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE node_dependencies SET dep_id = ?1 \
             WHERE dep_id = ?2 AND node_id IN (SELECT id FROM macro_nodes WHERE blueprint_id = ?3)",
            params![new_dep.as_str(), old_dep.as_str(), blueprint_id.as_str()],
        )?;
        Ok(())
    }

    /// Deletes a node locally. Dependents keep the dangling id in their
    /// dependency list; callers filter it out on resolve (no cascade to
    /// dependents, per §3).
    pub fn delete_node(&self, id: &MacroNodeId) -> StoreResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM macro_nodes WHERE id = ?1", params![id.as_str()])?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("node {id}")));
        }
        Ok(())
    }

    /// Atomically reassigns every node's `order` to its index in
    /// `ordered_ids`. All ids must belong to `blueprint_id`.
    pub fn reorder_nodes(
        &self,
        blueprint_id: &bp_core::BlueprintId,
        ordered_ids: &[MacroNodeId],
    ) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let now = now_str(chrono::Utc::now());
        for (index, id) in ordered_ids.iter().enumerate() {
            let changed = tx.execute(
                "UPDATE macro_nodes SET ord = ?1, updated_at = ?2 WHERE id = ?3 AND blueprint_id = ?4",
                params![index as i64, now, id.as_str(), blueprint_id.as_str()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!(
                    "node {id} not found in blueprint {blueprint_id}"
                )));
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
