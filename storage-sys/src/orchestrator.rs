// SPDX-License-Identifier: GPL-3.0-only

//! Mount, unmount and status flows
//!
//! `mount` runs secrets -> per-login mounts -> provider pools. Configuration
//! and secrets failures abort before anything is mounted; per-mount and
//! per-provider failures are collected into the report.
//!
//! The mount table and the secrets file are shared with the rest of the
//! system. Two invocations must not run at the same time.

use storage_types::{Accounts, MountReport, PoolSettings, StatusReport, UnmountReport};
use tracing::{info, warn};

use crate::aggregator::PoolAggregator;
use crate::capacity::CapacityInspector;
use crate::credentials::CredentialStore;
use crate::error::{Result, SysError};
use crate::executor::MountExecutor;
use crate::mount_table::MountTable;
use crate::planner::plan_mounts;
use crate::runner::CommandRunner;

pub struct Orchestrator<R> {
    settings: PoolSettings,
    runner: R,
}

impl<R: CommandRunner> Orchestrator<R> {
    pub fn new(settings: PoolSettings, runner: R) -> Self {
        Self { settings, runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn credentials(&self) -> CredentialStore {
        CredentialStore::new(&self.settings.secrets_file)
    }

    /// Resolve every program in `programs`, failing on the first missing one.
    pub fn check_tools(&self, programs: &[&str]) -> Result<()> {
        for program in programs {
            let path = self.runner.locate(program)?;
            info!("Using {} at {:?}", program, path);
        }
        Ok(())
    }

    fn providers(accounts: &Accounts) -> Vec<String> {
        accounts.keys().cloned().collect()
    }

    pub fn mount(&self, accounts: &Accounts) -> Result<MountReport> {
        if accounts.is_empty() {
            return Err(SysError::Config("no accounts configured".to_string()));
        }
        self.check_tools(&self.settings.tools.mount_programs())?;

        let table = MountTable::load(&self.settings.mount_table)?;
        let plan = self
            .credentials()
            .derive(accounts, &self.settings.layout())?;

        let executor = MountExecutor::new(&self.runner, &self.settings);
        let mounts = executor.mount_all(&plan.points, &table);

        let aggregator = PoolAggregator::new(&self.runner, &self.settings);
        let aggregations = aggregator.aggregate(&Self::providers(accounts), &mounts, &table);

        let report = MountReport {
            mounts,
            aggregations,
        };

        for summary in report.provider_summaries() {
            if summary.is_partial() {
                warn!(
                    "Provider {} partially mounted: {}/{}",
                    summary.provider,
                    summary.mounted + summary.already_mounted,
                    summary.total
                );
            } else {
                info!(
                    "Provider {} mounted: {}/{}",
                    summary.provider,
                    summary.mounted + summary.already_mounted,
                    summary.total
                );
            }
        }

        Ok(report)
    }

    /// Tear down in reverse: pools, then per-login mounts, then secrets.
    pub fn unmount(&self, accounts: &Accounts) -> Result<UnmountReport> {
        self.check_tools(&self.settings.tools.unmount_programs())?;

        let plan = plan_mounts(accounts, &self.settings.layout())?;
        let table = MountTable::load(&self.settings.mount_table)?;

        let aggregator = PoolAggregator::new(&self.runner, &self.settings);
        let pools = aggregator.disaggregate(&Self::providers(accounts), &table);

        let executor = MountExecutor::new(&self.runner, &self.settings);
        let mounts = executor.unmount_all(&plan.points, &table);

        let secrets_invalidated = match self.credentials().invalidate() {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to invalidate secrets: {}", e);
                false
            }
        };

        Ok(UnmountReport {
            pools,
            mounts,
            secrets_invalidated,
        })
    }

    pub fn status(&self) -> Result<StatusReport> {
        CapacityInspector::new(&self.runner, &self.settings).report()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRunner;
    use std::collections::BTreeMap;
    use std::fs;
    use storage_types::AccountConfig;

    fn settings(root: &std::path::Path) -> PoolSettings {
        PoolSettings {
            root: root.join("cloud"),
            secrets_file: root.join("secrets"),
            mount_table: root.join("mounts"),
            ..PoolSettings::default()
        }
    }

    fn accounts() -> Accounts {
        BTreeMap::from([(
            "acme".to_string(),
            AccountConfig {
                web_dav: "https://acme/dav".to_string(),
                logins: BTreeMap::from([
                    ("alice".to_string(), "pw1".to_string()),
                    ("bob".to_string(), "pw2".to_string()),
                ]),
            },
        )])
    }

    #[test]
    fn missing_tool_aborts_before_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(
            settings(dir.path()),
            FakeRunner::new().missing_program("mhddfs"),
        );

        let err = orchestrator.mount(&accounts()).unwrap_err();
        assert!(matches!(err, SysError::Config(_)));
        assert!(!dir.path().join("secrets").exists());
        assert!(orchestrator.runner().calls().is_empty());
    }

    #[test]
    fn config_error_aborts_before_mounting() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(settings(dir.path()), FakeRunner::new());
        let mut accounts = accounts();
        accounts.insert(
            "empty".to_string(),
            AccountConfig {
                web_dav: "https://empty/dav".to_string(),
                logins: BTreeMap::new(),
            },
        );

        let err = orchestrator.mount(&accounts).unwrap_err();
        assert!(matches!(err, SysError::Config(_)));
        assert!(orchestrator.runner().calls().is_empty());
        assert!(!dir.path().join("secrets").exists());
    }

    #[test]
    fn secrets_write_failure_aborts_before_mounting() {
        let dir = tempfile::tempdir().unwrap();
        let settings = PoolSettings {
            secrets_file: "/proc/cloudpool-test/secrets".into(),
            ..settings(dir.path())
        };
        let orchestrator = Orchestrator::new(settings, FakeRunner::new());

        let err = orchestrator.mount(&accounts()).unwrap_err();
        assert!(matches!(err, SysError::Io { .. }));
        assert!(orchestrator.runner().calls().is_empty());
        assert!(!dir.path().join("cloud/parts").exists());
    }

    #[test]
    fn partial_mount_builds_pool_from_survivors() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(
            settings(dir.path()),
            FakeRunner::new().fail_when_contains("acme.bob", 32, "401 Unauthorized"),
        );

        let report = orchestrator.mount(&accounts()).unwrap();

        let pools = report.pools();
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].members, vec![report.mounts[0].point.path.clone()]);
        let summary = &report.provider_summaries()[0];
        assert_eq!((summary.mounted, summary.total), (1, 2));
        assert!(report.has_failures());
        assert_eq!(
            fs::read_to_string(dir.path().join("secrets")).unwrap().lines().count(),
            2
        );
    }

    #[test]
    fn unmount_runs_in_reverse_and_clears_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let layout = settings.layout();
        fs::write(
            &settings.mount_table,
            format!(
                "dav {} fuse rw 0 0\ndav {} fuse rw 0 0\nmhddfs {} fuse.mhddfs rw 0 0\n",
                layout.mount_path("acme", "alice").display(),
                layout.mount_path("acme", "bob").display(),
                layout.pool_path("acme").display()
            ),
        )
        .unwrap();
        fs::write(&settings.secrets_file, "stale\n").unwrap();
        let orchestrator = Orchestrator::new(settings, FakeRunner::new());

        let report = orchestrator.unmount(&accounts()).unwrap();

        assert!(!report.has_failures());
        let calls = orchestrator.runner().calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].starts_with("fusermount -u "));
        assert!(calls[1].starts_with("umount ") && calls[1].ends_with("acme.bob"));
        assert!(calls[2].starts_with("umount ") && calls[2].ends_with("acme.alice"));
        assert_eq!(fs::read_to_string(dir.path().join("secrets")).unwrap(), "");
    }
}
