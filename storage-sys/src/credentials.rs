// SPDX-License-Identifier: GPL-3.0-only

//! Secrets file for the WebDAV mount helper
//!
//! One line per login: `<local-path> <login> <secret>`. The file is rewritten
//! in full on every mount and is only ever readable by its owner (0600).
//! Fields containing whitespace, quotes, backslashes or `#` are double-quoted
//! with backslash escapes, which the helper's parser accepts.

use std::fs::{self, OpenOptions, Permissions};
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use storage_types::{Accounts, MountPlan, PoolLayout, SecretEntry};
use tracing::{debug, info};

use crate::error::{Result, SysError};
use crate::planner::plan_mounts;

pub const SECRETS_MODE: u32 = 0o600;

fn quote_field(field: &str) -> String {
    let needs_quotes = field.is_empty()
        || field
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\\' | '#'));
    if !needs_quotes {
        return field.to_string();
    }

    let mut quoted = String::with_capacity(field.len() + 2);
    quoted.push('"');
    for c in field.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Serialize entries in the helper's secrets format.
pub fn render_secrets(entries: &[SecretEntry]) -> String {
    let mut contents = String::new();
    for entry in entries {
        contents.push_str(&quote_field(&entry.path.to_string_lossy()));
        contents.push(' ');
        contents.push_str(&quote_field(&entry.login));
        contents.push(' ');
        contents.push_str(&quote_field(&entry.secret));
        contents.push('\n');
    }
    contents
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Plan the mounts for `accounts` and persist the matching secrets.
    ///
    /// Any failure here must abort the mount operation: nothing may be mounted
    /// against a stale or world-readable secrets file.
    pub fn derive(&self, accounts: &Accounts, layout: &PoolLayout) -> Result<MountPlan> {
        let plan = plan_mounts(accounts, layout)?;
        self.write(&plan.secrets)?;
        Ok(plan)
    }

    /// Replace the secrets file atomically with `entries`.
    pub fn write(&self, entries: &[SecretEntry]) -> Result<()> {
        self.replace_contents(render_secrets(entries).as_bytes())?;
        info!(
            "Wrote {} secrets entries to {:?}",
            entries.len(),
            self.path
        );
        Ok(())
    }

    /// Empty the secrets file. A missing file is already invalid.
    pub fn invalidate(&self) -> Result<()> {
        if !self.path.exists() {
            debug!("Secrets file {:?} absent, nothing to invalidate", self.path);
            return Ok(());
        }
        self.replace_contents(b"")?;
        info!("Invalidated secrets file {:?}", self.path);
        Ok(())
    }

    fn replace_contents(&self, contents: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| SysError::io(parent, e))?;
        }

        let tmp_path = self.tmp_path();
        let _ = fs::remove_file(&tmp_path);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(SECRETS_MODE)
            .open(&tmp_path)
            .map_err(|e| SysError::io(&tmp_path, e))?;

        let written = file
            .write_all(contents)
            .and_then(|_| file.set_permissions(Permissions::from_mode(SECRETS_MODE)))
            .and_then(|_| file.sync_all());
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(SysError::io(&tmp_path, e));
        }
        drop(file);

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            SysError::io(&self.path, e)
        })?;

        self.verify_mode()
    }

    fn verify_mode(&self) -> Result<()> {
        let mode = fs::metadata(&self.path)
            .map_err(|e| SysError::io(&self.path, e))?
            .permissions()
            .mode()
            & 0o777;
        if mode != SECRETS_MODE {
            return Err(SysError::io(
                &self.path,
                std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    format!("secrets file has mode {mode:o}, expected {SECRETS_MODE:o}"),
                ),
            ));
        }
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "secrets".to_string());
        self.path.with_file_name(format!(".{name}.tmp"))
    }
}
