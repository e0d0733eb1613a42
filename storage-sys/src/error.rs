// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Error types for pool operations
#[derive(Error, Debug)]
pub enum SysError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Mount failed for {}: {reason}", path.display())]
    Mount { path: PathBuf, reason: String },

    #[error("Aggregation failed for provider {provider}: {reason}")]
    Aggregation { provider: String, reason: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Failed to execute `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    #[error("`{command}` timed out after {}s", timeout.as_secs())]
    Timeout { command: String, timeout: Duration },
}

impl SysError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SysError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for pool operations
pub type Result<T> = std::result::Result<T, SysError>;
