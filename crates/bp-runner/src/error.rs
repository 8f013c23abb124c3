// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use bp_core::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    /// Subprocess exited non-zero with empty cleaned stdout (§4.3).
    #[error("agent CLI failed: {message} (stderr: {stderr_tail})")]
    CliError { message: String, stderr_tail: String },

    #[error("agent CLI timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("failed to spawn agent CLI: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type RunnerResult<T> = Result<T, RunnerError>;

impl From<RunnerError> for EngineError {
    fn from(err: RunnerError) -> Self {
        EngineError::external(err.to_string())
    }
}
