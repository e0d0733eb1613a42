// SPDX-License-Identifier: GPL-3.0-only

//! Mount plan and mount results

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountState {
    #[default]
    Planned,
    Mounted,
    Failed,
}

/// A per-login mount: remote endpoint -> `<parts-root>/<provider>.<login>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPoint {
    pub provider: String,
    pub login: String,
    pub path: PathBuf,
    pub endpoint: String,
    #[serde(default)]
    pub state: MountState,
}

impl MountPoint {
    pub fn planned(provider: &str, login: &str, path: PathBuf, endpoint: &str) -> Self {
        Self {
            provider: provider.to_string(),
            login: login.to_string(),
            path,
            endpoint: endpoint.to_string(),
            state: MountState::Planned,
        }
    }
}

/// One line of the mount helper's secrets file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretEntry {
    pub path: PathBuf,
    pub login: String,
    pub secret: String,
}

// Keep secrets out of logs and debug dumps.
impl fmt::Debug for SecretEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretEntry")
            .field("path", &self.path)
            .field("login", &self.login)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Index-aligned secrets and mount points, in deterministic order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountPlan {
    pub secrets: Vec<SecretEntry>,
    pub points: Vec<MountPoint>,
}

impl MountPlan {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MountOutcome {
    Mounted,
    /// The path was already in the mount table; nothing was done.
    AlreadyMounted,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountResult {
    pub point: MountPoint,
    pub outcome: MountOutcome,
    /// Output captured from the mount helper, if it ran.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub diagnostics: String,
}

impl MountResult {
    pub fn mounted(mut point: MountPoint, diagnostics: String) -> Self {
        point.state = MountState::Mounted;
        Self {
            point,
            outcome: MountOutcome::Mounted,
            diagnostics,
        }
    }

    pub fn already_mounted(mut point: MountPoint) -> Self {
        point.state = MountState::Mounted;
        Self {
            point,
            outcome: MountOutcome::AlreadyMounted,
            diagnostics: String::new(),
        }
    }

    pub fn failed(mut point: MountPoint, reason: impl Into<String>, diagnostics: String) -> Self {
        point.state = MountState::Failed;
        Self {
            point,
            outcome: MountOutcome::Failed {
                reason: reason.into(),
            },
            diagnostics,
        }
    }

    /// True only when this run established the mount.
    pub fn success(&self) -> bool {
        matches!(self.outcome, MountOutcome::Mounted)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, MountOutcome::Failed { .. })
    }
}

/// Result of tearing down a single mount (per-login point or pool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UnmountOutcome {
    Unmounted,
    NotMounted,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmountResult {
    pub path: PathBuf,
    pub provider: String,
    pub outcome: UnmountOutcome,
}

impl UnmountResult {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, UnmountOutcome::Failed { .. })
    }
}
