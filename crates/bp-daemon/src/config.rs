// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service directory and token resolution (§6 "Persisted layout").

use std::path::PathBuf;

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine a state directory: set BP_STATE_DIR or HOME")]
    NoStateDir,
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
}

/// Resolved paths and listen settings for one daemon incarnation.
#[derive(Debug, Clone)]
pub struct Config {
    pub state_dir: PathBuf,
    pub db_path: PathBuf,
    pub log_path: PathBuf,
    pub token_path: PathBuf,
    pub uploads_dir: PathBuf,
    pub lock_path: PathBuf,
    pub version_path: PathBuf,
    pub agent_binary: PathBuf,
    pub bind_addr: String,
    pub port: u16,
}

impl Config {
    /// Resolves the state directory (`BP_STATE_DIR` > `XDG_STATE_HOME/blueprint`
    /// > `~/.local/state/blueprint`), ensures it (and `uploads/`) exist, and
    /// loads or mints the 32-hex-character auth token alongside it.
    pub fn load() -> Result<Self, ConfigError> {
        let state_dir = state_dir()?;
        std::fs::create_dir_all(&state_dir).map_err(|source| ConfigError::Io { path: state_dir.clone(), source })?;

        let uploads_dir = state_dir.join("uploads");
        std::fs::create_dir_all(&uploads_dir).map_err(|source| ConfigError::Io { path: uploads_dir.clone(), source })?;

        let db_path = state_dir.join("blueprint.db");
        let log_path = state_dir.join("daemon.log");
        let token_path = state_dir.join("token");
        let lock_path = state_dir.join("daemon.lock");
        let version_path = state_dir.join("daemon.version");

        let agent_binary = std::env::var("BP_AGENT_BINARY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("claude"));

        let bind_addr = std::env::var("BP_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("BP_PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(4317);

        Ok(Self {
            state_dir,
            db_path,
            log_path,
            token_path,
            uploads_dir,
            lock_path,
            version_path,
            agent_binary,
            bind_addr,
            port,
        })
    }

    /// Reads the auth token from `token_path`, minting and persisting a
    /// fresh 32-hex-character one on first run.
    pub fn load_or_create_token(&self) -> Result<String, ConfigError> {
        if let Ok(existing) = std::fs::read_to_string(&self.token_path) {
            let trimmed = existing.trim().to_string();
            if !trimmed.is_empty() {
                return Ok(trimmed);
            }
        }
        let token = Uuid::new_v4().simple().to_string();
        std::fs::write(&self.token_path, &token).map_err(|source| ConfigError::Io { path: self.token_path.clone(), source })?;
        Ok(token)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.bind_addr, self.port)
    }
}

fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("BP_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("blueprint"));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/blueprint"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
