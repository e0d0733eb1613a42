// SPDX-License-Identifier: GPL-3.0-only

//! Provider pools and mount/unmount reports

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::mount::{MountOutcome, MountResult, UnmountResult};

/// Union of one provider's mounted logins at `<raid-root>/.<provider>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub provider: String,
    pub path: PathBuf,
    /// Member mount paths in planner order.
    pub members: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AggregationOutcome {
    Created { pool: Pool },
    /// The pool path is already mounted; left untouched.
    AlreadyAggregated { path: PathBuf },
    /// None of the provider's logins is mounted, so the pool has no members.
    Skipped { reason: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub provider: String,
    pub outcome: AggregationOutcome,
}

impl AggregationResult {
    pub fn pool(&self) -> Option<&Pool> {
        match &self.outcome {
            AggregationOutcome::Created { pool } => Some(pool),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, AggregationOutcome::Failed { .. })
    }
}

/// Per-provider mount tally, e.g. `acme: 1/2 mounted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSummary {
    pub provider: String,
    pub mounted: usize,
    pub already_mounted: usize,
    pub total: usize,
}

impl ProviderSummary {
    pub fn is_partial(&self) -> bool {
        self.mounted + self.already_mounted < self.total
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountReport {
    pub mounts: Vec<MountResult>,
    pub aggregations: Vec<AggregationResult>,
}

impl MountReport {
    pub fn pools(&self) -> Vec<&Pool> {
        self.aggregations.iter().filter_map(|a| a.pool()).collect()
    }

    pub fn has_failures(&self) -> bool {
        self.mounts.iter().any(MountResult::is_failure)
            || self.aggregations.iter().any(AggregationResult::is_failure)
    }

    /// Tally per provider, in the order providers first appear in `mounts`.
    pub fn provider_summaries(&self) -> Vec<ProviderSummary> {
        let mut summaries: Vec<ProviderSummary> = Vec::new();
        for result in &self.mounts {
            let index = match summaries
                .iter()
                .position(|s| s.provider == result.point.provider)
            {
                Some(index) => index,
                None => {
                    summaries.push(ProviderSummary {
                        provider: result.point.provider.clone(),
                        mounted: 0,
                        already_mounted: 0,
                        total: 0,
                    });
                    summaries.len() - 1
                }
            };
            let summary = &mut summaries[index];
            summary.total += 1;
            match result.outcome {
                MountOutcome::Mounted => summary.mounted += 1,
                MountOutcome::AlreadyMounted => summary.already_mounted += 1,
                MountOutcome::Failed { .. } => {}
            }
        }
        summaries
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmountReport {
    pub pools: Vec<UnmountResult>,
    pub mounts: Vec<UnmountResult>,
    pub secrets_invalidated: bool,
}

impl UnmountReport {
    pub fn has_failures(&self) -> bool {
        !self.secrets_invalidated
            || self.pools.iter().any(UnmountResult::is_failure)
            || self.mounts.iter().any(UnmountResult::is_failure)
    }
}
