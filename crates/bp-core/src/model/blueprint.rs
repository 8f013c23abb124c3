// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blueprint: a high-level development goal and the root of a dependency
//! graph of macro nodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifies a blueprint.
    pub struct BlueprintId;
}

/// Lifecycle state of a blueprint. `Running` is derived (true whenever any
/// owned node is running), never set directly by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlueprintStatus {
    Draft,
    Approved,
    Running,
    Done,
    Failed,
    Paused,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    pub id: BlueprintId,
    pub title: String,
    pub description: Option<String>,
    pub project_cwd: Option<String>,
    pub status: BlueprintStatus,
    pub starred: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Blueprint {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

#[cfg(test)]
#[path = "blueprint_tests.rs"]
mod tests;
