// SPDX-License-Identifier: GPL-3.0-only

//! Runtime settings for the pool
//!
//! Locations and helper programs used by the pool. A `PoolSettings` value is
//! handed to each component at construction.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_POOL_ROOT: &str = "/mnt/cloud";
pub const DEFAULT_SECRETS_FILE: &str = "/etc/davfs2/secrets";
pub const DEFAULT_MOUNT_TABLE: &str = "/proc/mounts";
pub const PARTS_DIR_NAME: &str = "parts";
pub const RAID_DIR_NAME: &str = "raid";

/// External programs invoked by the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub mount: String,
    pub umount: String,
    pub aggregator: String,
    pub fusermount: String,
    pub df: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            mount: "mount".to_string(),
            umount: "umount".to_string(),
            aggregator: "mhddfs".to_string(),
            fusermount: "fusermount".to_string(),
            df: "df".to_string(),
        }
    }
}

impl ToolSettings {
    /// Programs needed to mount and aggregate, in invocation order.
    pub fn mount_programs(&self) -> [&str; 2] {
        [&self.mount, &self.aggregator]
    }

    pub fn unmount_programs(&self) -> [&str; 2] {
        [&self.fusermount, &self.umount]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
    /// Pool root; `parts/` and `raid/` live underneath.
    pub root: PathBuf,
    /// Secrets file read by the WebDAV mount helper.
    pub secrets_file: PathBuf,
    /// Mount table consulted for the already-mounted guard.
    pub mount_table: PathBuf,
    /// Filesystem type passed to `mount -t`.
    pub fs_type: String,
    /// Upper bound for any single external command.
    pub command_timeout_secs: u64,
    /// Pass `allow_other` to the aggregator so other users can see the pool.
    pub allow_other: bool,
    pub tools: ToolSettings,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_POOL_ROOT),
            secrets_file: PathBuf::from(DEFAULT_SECRETS_FILE),
            mount_table: PathBuf::from(DEFAULT_MOUNT_TABLE),
            fs_type: "davfs".to_string(),
            command_timeout_secs: 120,
            allow_other: true,
            tools: ToolSettings::default(),
        }
    }
}

impl PoolSettings {
    pub fn layout(&self) -> PoolLayout {
        PoolLayout::new(&self.root)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs.max(1))
    }
}

/// Directory layout under the pool root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolLayout {
    pub root: PathBuf,
    pub parts_root: PathBuf,
    pub raid_root: PathBuf,
}

impl PoolLayout {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            parts_root: root.join(PARTS_DIR_NAME),
            raid_root: root.join(RAID_DIR_NAME),
        }
    }

    /// `<parts-root>/<provider>.<login>`
    pub fn mount_path(&self, provider: &str, login: &str) -> PathBuf {
        self.parts_root.join(format!("{provider}.{login}"))
    }

    /// `<raid-root>/.<provider>`
    pub fn pool_path(&self, provider: &str) -> PathBuf {
        self.raid_root.join(format!(".{provider}"))
    }
}
