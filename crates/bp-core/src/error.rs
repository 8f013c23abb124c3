// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds shared at every component boundary.
//!
//! Every crate's lower-level error type converts into one of these via
//! `#[from]`. `Internal` is the one variant whose message is intentionally
//! generic: recoverable subsystem failures are logged with full detail at
//! the point they occur and surfaced here only as a redacted phrase.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("external failure: {0}")]
    ExternalFailure(String),

    #[error("internal error")]
    Internal,
}

impl EngineError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn external(msg: impl Into<String>) -> Self {
        Self::ExternalFailure(msg.into())
    }

    /// HTTP status code this error kind maps to at the router boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Precondition(_) => 412,
            Self::ExternalFailure(_) => 502,
            Self::Internal => 500,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
