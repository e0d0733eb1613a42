// SPDX-License-Identifier: GPL-3.0-only

//! Capacity records and the status report

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Columns taken from the capacity tool, kept human readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityRecord {
    pub filesystem: String,
    pub total: String,
    pub free: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CapacityState {
    Available(CapacityRecord),
    NotFound,
    Unreadable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityEntry {
    pub path: PathBuf,
    #[serde(flatten)]
    pub state: CapacityState,
}

impl CapacityEntry {
    pub fn not_found(path: PathBuf) -> Self {
        Self {
            path,
            state: CapacityState::NotFound,
        }
    }

    pub fn is_found(&self) -> bool {
        !matches!(self.state, CapacityState::NotFound)
    }

    pub fn record(&self) -> Option<&CapacityRecord> {
        match &self.state {
            CapacityState::Available(record) => Some(record),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// The raid directory itself.
    pub raid: CapacityEntry,
    /// One entry per `.<provider>` pool; empty when the raid root is missing.
    pub pools: Vec<CapacityEntry>,
    pub parts: CapacityEntry,
    /// One entry per `<provider>.<login>` directory, sorted by name.
    pub members: Vec<CapacityEntry>,
}

impl StatusReport {
    pub fn parts_found(&self) -> bool {
        self.parts.is_found()
    }
}
