// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown agent type '{0}'")]
    UnknownAgentType(String),

    #[error("failed to read session log {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed session record at line {line}: {message}")]
    Malformed { line: usize, message: String },
}

pub type SessionResult<T> = Result<T, SessionError>;
