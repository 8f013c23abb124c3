// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn init_is_idempotent() {
    let conn = Connection::open_in_memory().unwrap();
    init_schema(&conn).unwrap();
    init_schema(&conn).unwrap();
    let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0)).unwrap();
    assert_eq!(version, SCHEMA_VERSION);
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = Connection::open_in_memory().unwrap();
    init_schema(&conn).unwrap();
    let result = conn.execute(
        "INSERT INTO macro_nodes (id, blueprint_id, ord, title, status, agent_type, created_at, updated_at)
         VALUES ('n1', 'missing-blueprint', 0, 'title', 'pending', 'claude-code', 'now', 'now')",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn cascade_delete_removes_dependent_rows() {
    let conn = Connection::open_in_memory().unwrap();
    init_schema(&conn).unwrap();
    conn.execute(
        "INSERT INTO blueprints (id, title, status, starred, created_at, updated_at)
         VALUES ('bp1', 'title', 'draft', 0, 'now', 'now')",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO macro_nodes (id, blueprint_id, ord, title, status, agent_type, created_at, updated_at)
         VALUES ('n1', 'bp1', 0, 'title', 'pending', 'claude-code', 'now', 'now')",
        [],
    )
    .unwrap();
    conn.execute("DELETE FROM blueprints WHERE id = 'bp1'", []).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM macro_nodes WHERE blueprint_id = 'bp1'", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(count, 0);
}
