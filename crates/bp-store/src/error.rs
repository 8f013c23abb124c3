// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store-local error kinds, converted into `bp_core::EngineError` at the
//! service boundary.

use bp_core::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store not initialized")]
    NotInitialized,

    #[error("foreign key violation: {0}")]
    ForeignKey(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotInitialized => EngineError::Internal,
            StoreError::ForeignKey(msg) => EngineError::bad_request(msg),
            StoreError::Conflict(msg) => EngineError::conflict(msg),
            StoreError::NotFound(msg) => EngineError::not_found(msg),
            StoreError::Invalid(msg) => EngineError::bad_request(msg),
            StoreError::Sqlite(err) => EngineError::external(err.to_string()),
        }
    }
}
