// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The embedded relational Store backing the blueprint orchestration engine:
//! Blueprint/Macro Node/Artifact/Execution/Related Session CRUD, reverse
//! lookups, and the recovery queries the Recovery Supervisor depends on.

pub mod error;
mod schema;
mod store;

pub use error::{StoreError, StoreResult};
pub use schema::SCHEMA_VERSION;
pub use store::{
    ArtifactDirection, BlueprintWithNodes, NodeWithDetails, Store, RESTART_SENTINEL,
};
pub use store::recovery::StaleExecution;
