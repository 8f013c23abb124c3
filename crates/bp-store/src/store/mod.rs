// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The embedded relational Store: a single SQLite file behind a mutex,
//! foreign keys on, WAL journaling for durability.

pub mod artifact;
pub mod blueprint;
pub mod convert;
pub mod execution;
pub mod hydrate;
pub mod node;
pub mod recovery;
pub mod related_session;

pub use artifact::ArtifactDirection;
pub use hydrate::{BlueprintWithNodes, NodeWithDetails};

use crate::error::StoreResult;
use crate::schema;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

/// Marker embedded in an execution's `output_summary` when the Recovery
/// Supervisor force-marks it failed because the daemon restarted mid-run.
pub const RESTART_SENTINEL: &str = "__restarted_by_recovery_supervisor__";

pub struct Store {
    pub(crate) conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}
