// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schema definition and migration tracking.
//!
//! Migrations are incremental, numbered, idempotent steps applied once at
//! Store open, tracked via SQLite's own `PRAGMA user_version`.

use crate::error::StoreResult;
use rusqlite::Connection;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")?;

    let current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if current_version < 1 {
        apply_v1(conn)?;
    }
    conn.execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;
    Ok(())
}

fn apply_v1(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS blueprints (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            project_cwd TEXT,
            status TEXT NOT NULL,
            starred INTEGER NOT NULL DEFAULT 0,
            archived_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS macro_nodes (
            id TEXT PRIMARY KEY,
            blueprint_id TEXT NOT NULL REFERENCES blueprints(id) ON DELETE CASCADE,
            ord INTEGER NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            prompt TEXT,
            status TEXT NOT NULL,
            error TEXT,
            estimated_minutes INTEGER,
            actual_minutes INTEGER,
            parallel_group TEXT,
            agent_type TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_nodes_blueprint ON macro_nodes(blueprint_id, ord);

        -- dep_id intentionally carries no foreign-key constraint: node deletion
        -- is local (§3) and must not cascade to dependents, so a dependent's
        -- dependency edge is allowed to go dangling (dep_id referencing a node
        -- that no longer exists) rather than being blocked or cascaded away.
        -- Dangling ids are filtered out at resolve time, not at delete time.
        CREATE TABLE IF NOT EXISTS node_dependencies (
            node_id TEXT NOT NULL REFERENCES macro_nodes(id) ON DELETE CASCADE,
            dep_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            PRIMARY KEY (node_id, position)
        );

        CREATE INDEX IF NOT EXISTS idx_deps_node ON node_dependencies(node_id);
        CREATE INDEX IF NOT EXISTS idx_deps_dep ON node_dependencies(dep_id);

        CREATE TABLE IF NOT EXISTS artifacts (
            id TEXT PRIMARY KEY,
            blueprint_id TEXT NOT NULL REFERENCES blueprints(id) ON DELETE CASCADE,
            source_node_id TEXT NOT NULL REFERENCES macro_nodes(id) ON DELETE CASCADE,
            target_node_id TEXT REFERENCES macro_nodes(id) ON DELETE CASCADE,
            artifact_type TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_artifacts_source ON artifacts(source_node_id);
        CREATE INDEX IF NOT EXISTS idx_artifacts_target ON artifacts(target_node_id);

        CREATE TABLE IF NOT EXISTS node_executions (
            id TEXT PRIMARY KEY,
            node_id TEXT NOT NULL REFERENCES macro_nodes(id) ON DELETE CASCADE,
            blueprint_id TEXT NOT NULL REFERENCES blueprints(id) ON DELETE CASCADE,
            session_id TEXT,
            execution_type TEXT NOT NULL,
            status TEXT NOT NULL,
            input_context TEXT,
            output_summary TEXT,
            context_tokens_used INTEGER,
            parent_execution_id TEXT REFERENCES node_executions(id) ON DELETE SET NULL,
            cli_pid INTEGER,
            started_at TEXT NOT NULL,
            completed_at TEXT,
            blocker_info TEXT,
            task_summary TEXT,
            reported_status TEXT,
            reported_reason TEXT,
            failure_reason TEXT,
            compact_count INTEGER,
            peak_tokens INTEGER,
            context_pressure TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_executions_node ON node_executions(node_id, started_at);
        CREATE INDEX IF NOT EXISTS idx_executions_blueprint ON node_executions(blueprint_id);
        CREATE INDEX IF NOT EXISTS idx_executions_session ON node_executions(session_id);
        CREATE INDEX IF NOT EXISTS idx_executions_status ON node_executions(status);

        CREATE TABLE IF NOT EXISTS related_sessions (
            id TEXT PRIMARY KEY,
            node_id TEXT NOT NULL REFERENCES macro_nodes(id) ON DELETE CASCADE,
            blueprint_id TEXT NOT NULL REFERENCES blueprints(id) ON DELETE CASCADE,
            session_id TEXT NOT NULL,
            session_type TEXT NOT NULL,
            started_at TEXT NOT NULL,
            completed_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_related_sessions_node ON related_sessions(node_id);
        CREATE INDEX IF NOT EXISTS idx_related_sessions_session ON related_sessions(session_id);
        "#,
    )?;
    Ok(())
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
