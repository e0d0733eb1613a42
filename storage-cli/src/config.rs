// SPDX-License-Identifier: GPL-3.0-only

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use clap::ValueEnum;
use storage_types::CloudConfig;

pub const DEFAULT_CONFIG_FILE: &str = "cr.yml";

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, ValueEnum)]
pub enum LoggingLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LoggingLevel {
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Read and validate the account document at `path`.
pub fn load(path: &Path) -> Result<CloudConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    parse(&contents).with_context(|| format!("Invalid config {}", path.display()))
}

/// Like [`load`], but a missing file yields the default settings.
pub fn load_or_default(path: &Path) -> Result<CloudConfig> {
    if !path.exists() {
        return Ok(CloudConfig::default());
    }
    load(path)
}

pub fn parse(contents: &str) -> Result<CloudConfig> {
    // An empty document parses as null.
    if contents.trim().is_empty() {
        return Ok(CloudConfig::default());
    }
    let config: CloudConfig = serde_yaml::from_str(contents)?;
    config.validate().map_err(|e| anyhow!(e))?;
    Ok(config)
}
