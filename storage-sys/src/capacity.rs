// SPDX-License-Identifier: GPL-3.0-only

//! Capacity reporting for the pool and its parts
//!
//! Capacity comes from `df -h -P`; the tabular output is split on whitespace
//! and the filesystem, size and available columns are taken by position.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use storage_types::{
    CapacityEntry, CapacityRecord, CapacityState, PoolLayout, PoolSettings, StatusReport,
};
use tracing::{debug, warn};

use crate::error::{Result, SysError};
use crate::runner::{CommandRunner, CommandSpec};

const FS_COLUMN: usize = 0;
const SIZE_COLUMN: usize = 1;
const AVAIL_COLUMN: usize = 3;

/// Parse the data row of `df` output. Rows wrapped onto a second line by
/// long filesystem names are joined before splitting.
pub fn parse_df_output(output: &str) -> Result<CapacityRecord> {
    let mut lines = output.lines().filter(|line| !line.trim().is_empty());
    let _header = lines
        .next()
        .ok_or_else(|| SysError::Parse("empty df output".to_string()))?;

    let tokens: Vec<&str> = lines.flat_map(str::split_whitespace).collect();
    if tokens.len() <= AVAIL_COLUMN {
        return Err(SysError::Parse(format!(
            "expected at least {} df columns, got {}",
            AVAIL_COLUMN + 1,
            tokens.len()
        )));
    }

    Ok(CapacityRecord {
        filesystem: tokens[FS_COLUMN].to_string(),
        total: tokens[SIZE_COLUMN].to_string(),
        free: tokens[AVAIL_COLUMN].to_string(),
    })
}

pub struct CapacityInspector<'a> {
    runner: &'a dyn CommandRunner,
    settings: &'a PoolSettings,
    layout: PoolLayout,
}

impl<'a> CapacityInspector<'a> {
    pub fn new(runner: &'a dyn CommandRunner, settings: &'a PoolSettings) -> Self {
        Self {
            runner,
            settings,
            layout: settings.layout(),
        }
    }

    /// Query capacity for `path`. `Ok(None)` when the path does not exist.
    pub fn try_inspect(&self, path: &Path) -> Result<Option<CapacityRecord>> {
        match fs::symlink_metadata(path) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SysError::io(path, e)),
        }

        let command = CommandSpec::new(&self.settings.tools.df)
            .arg("-h")
            .arg("-P")
            .path_arg(path);
        let output = match self.runner.run(&command) {
            Ok(output) => output,
            Err(e @ SysError::Timeout { .. }) => return Err(SysError::Parse(e.to_string())),
            Err(e) => return Err(e),
        };
        if !output.success() {
            return Err(SysError::Parse(format!(
                "`{}` exited with {}: {}",
                command.render(),
                output.exit_description(),
                output.diagnostics()
            )));
        }

        parse_df_output(&output.stdout).map(Some)
    }

    /// Like [`Self::try_inspect`] but never fails: problems degrade the entry.
    pub fn inspect(&self, path: &Path) -> CapacityEntry {
        let state = match self.try_inspect(path) {
            Ok(Some(record)) => CapacityState::Available(record),
            Ok(None) => {
                debug!("{:?} not found", path);
                CapacityState::NotFound
            }
            Err(e) => {
                warn!("Cannot read capacity of {:?}: {}", path, e);
                CapacityState::Unreadable {
                    reason: e.to_string(),
                }
            }
        };
        CapacityEntry {
            path: path.to_path_buf(),
            state,
        }
    }

    /// Capacity of the raid root and its pools, then of the parts root and
    /// each per-login mount beneath it.
    pub fn report(&self) -> Result<StatusReport> {
        let raid = self.inspect_root(&self.layout.raid_root);
        let pools = if raid.is_found() {
            self.inspect_children(&self.layout.raid_root)?
        } else {
            Vec::new()
        };

        let parts = self.inspect_root(&self.layout.parts_root);
        let members = if parts.is_found() {
            self.inspect_children(&self.layout.parts_root)?
        } else {
            Vec::new()
        };

        Ok(StatusReport {
            raid,
            pools,
            parts,
            members,
        })
    }

    /// A root that is not a directory holds no mounts and counts as absent.
    fn inspect_root(&self, root: &Path) -> CapacityEntry {
        if !root.is_dir() {
            debug!("{:?} is not a directory", root);
            return CapacityEntry::not_found(root.to_path_buf());
        }
        self.inspect(root)
    }

    fn inspect_children(&self, root: &Path) -> Result<Vec<CapacityEntry>> {
        Ok(list_children(root)?
            .iter()
            .map(|child| self.inspect(child))
            .collect())
    }
}

/// Immediate children of `root`, sorted. Listing errors are returned as-is:
/// a partial inventory must not be presented as complete.
pub fn list_children(root: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(root).map_err(|e| SysError::io(root, e))?;
    let mut children = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SysError::io(root, e))?;
        children.push(entry.path());
    }
    children.sort();
    Ok(children)
}
