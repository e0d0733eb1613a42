// SPDX-License-Identifier: GPL-3.0-only

//! Per-provider pool aggregation
//!
//! Each provider's successfully mounted logins are combined by the union
//! filesystem helper into `<raid-root>/.<provider>`. Members are passed in
//! plan order since the helper resolves path collisions by precedence.
//!
//! Logins found already mounted count as members when a pool is created, so
//! rerunning mount after an interrupted run still builds the pool.

use std::fs;
use std::path::{Path, PathBuf};

use storage_types::{
    AggregationOutcome, AggregationResult, MountResult, MountState, Pool, PoolLayout,
    PoolSettings, UnmountOutcome, UnmountResult,
};
use tracing::{info, warn};

use crate::error::SysError;
use crate::executor::release;
use crate::mount_table::MountTable;
use crate::runner::{CommandRunner, CommandSpec};

pub struct PoolAggregator<'a> {
    runner: &'a dyn CommandRunner,
    settings: &'a PoolSettings,
    layout: PoolLayout,
}

impl<'a> PoolAggregator<'a> {
    pub fn new(runner: &'a dyn CommandRunner, settings: &'a PoolSettings) -> Self {
        Self {
            runner,
            settings,
            layout: settings.layout(),
        }
    }

    pub fn aggregate_command(&self, members: &[PathBuf], pool_path: &Path) -> CommandSpec {
        let joined = members
            .iter()
            .map(|m| m.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(",");

        let command = CommandSpec::new(&self.settings.tools.aggregator)
            .arg(joined)
            .path_arg(pool_path);
        if self.settings.allow_other {
            command.arg("-o").arg("allow_other")
        } else {
            command
        }
    }

    /// Build one pool per provider from the successful mounts in `results`.
    pub fn aggregate(
        &self,
        providers: &[String],
        results: &[MountResult],
        table: &MountTable,
    ) -> Vec<AggregationResult> {
        providers
            .iter()
            .map(|provider| AggregationResult {
                provider: provider.clone(),
                outcome: self.aggregate_provider(provider, results, table),
            })
            .collect()
    }

    fn aggregate_provider(
        &self,
        provider: &str,
        results: &[MountResult],
        table: &MountTable,
    ) -> AggregationOutcome {
        let pool_path = self.layout.pool_path(provider);
        let planned = results
            .iter()
            .filter(|r| r.point.provider == provider)
            .count();
        let members: Vec<PathBuf> = results
            .iter()
            .filter(|r| r.point.provider == provider && r.point.state == MountState::Mounted)
            .map(|r| r.point.path.clone())
            .collect();

        if table.is_mounted(&pool_path) {
            let fresh = results
                .iter()
                .filter(|r| r.point.provider == provider && r.success())
                .count();
            if fresh > 0 {
                warn!(
                    "Pool {:?} is already mounted; {} newly mounted logins of {} are not part of it until it is remounted",
                    pool_path, fresh, provider
                );
            } else {
                info!("Pool {:?} is already mounted, skipping", pool_path);
            }
            return AggregationOutcome::AlreadyAggregated { path: pool_path };
        }

        if members.is_empty() {
            let reason = format!("no logins mounted (0/{planned})");
            warn!("Skipping pool for provider {}: {}", provider, reason);
            return AggregationOutcome::Skipped { reason };
        }

        if let Err(e) = fs::create_dir_all(&pool_path) {
            let error = SysError::io(&pool_path, e);
            warn!("Cannot create pool directory for {}: {}", provider, error);
            return AggregationOutcome::Failed {
                reason: error.to_string(),
            };
        }

        let command = self.aggregate_command(&members, &pool_path);
        info!(
            "Aggregating {}/{} logins of {} into {:?}",
            members.len(),
            planned,
            provider,
            pool_path
        );

        let failure = match self.runner.run(&command) {
            Ok(output) if output.success() => None,
            Ok(output) => Some(format!(
                "`{}` exited with {}: {}",
                command.render(),
                output.exit_description(),
                output.diagnostics()
            )),
            Err(e) => Some(e.to_string()),
        };

        match failure {
            None => {
                info!("Pool {:?} ready", pool_path);
                AggregationOutcome::Created {
                    pool: Pool {
                        provider: provider.to_string(),
                        path: pool_path,
                        members,
                    },
                }
            }
            Some(reason) => {
                let error = SysError::Aggregation {
                    provider: provider.to_string(),
                    reason,
                };
                warn!("{}", error);
                AggregationOutcome::Failed {
                    reason: error.to_string(),
                }
            }
        }
    }

    /// Unmount each provider pool, last provider first.
    pub fn disaggregate(&self, providers: &[String], table: &MountTable) -> Vec<UnmountResult> {
        providers
            .iter()
            .rev()
            .map(|provider| {
                let path = self.layout.pool_path(provider);
                let outcome = if !table.is_mounted(&path) {
                    info!("Pool {:?} is not mounted, skipping", path);
                    UnmountOutcome::NotMounted
                } else {
                    let command = CommandSpec::new(&self.settings.tools.fusermount)
                        .arg("-u")
                        .path_arg(&path);
                    info!("Releasing pool {:?}", path);
                    release(self.runner, &command, &path)
                };
                UnmountResult {
                    path,
                    provider: provider.clone(),
                    outcome,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRunner;
    use storage_types::MountPoint;

    fn settings(root: &std::path::Path) -> PoolSettings {
        PoolSettings {
            root: root.to_path_buf(),
            ..PoolSettings::default()
        }
    }

    fn result(settings: &PoolSettings, provider: &str, login: &str, ok: bool) -> MountResult {
        let point = MountPoint::planned(
            provider,
            login,
            settings.layout().mount_path(provider, login),
            "https://dav",
        );
        if ok {
            MountResult::mounted(point, String::new())
        } else {
            MountResult::failed(point, "exit status 32", String::new())
        }
    }

    #[test]
    fn pools_only_successful_members() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let runner = FakeRunner::new();
        let aggregator = PoolAggregator::new(&runner, &settings);
        let results = vec![
            result(&settings, "acme", "alice", true),
            result(&settings, "acme", "bob", false),
            result(&settings, "acme", "carol", true),
        ];

        let outcomes = aggregator.aggregate(&["acme".to_string()], &results, &MountTable::default());

        let pool = outcomes[0].pool().expect("acme pool");
        assert_eq!(pool.path, dir.path().join("raid/.acme"));
        assert_eq!(
            pool.members,
            vec![results[0].point.path.clone(), results[2].point.path.clone()]
        );
        assert!(pool.path.is_dir());

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        let expected = format!(
            "mhddfs {},{} {} -o allow_other",
            results[0].point.path.display(),
            results[2].point.path.display(),
            pool.path.display()
        );
        assert_eq!(calls[0], expected);
    }

    #[test]
    fn skips_provider_without_mounts() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let runner = FakeRunner::new();
        let aggregator = PoolAggregator::new(&runner, &settings);
        let results = vec![
            result(&settings, "acme", "alice", false),
            result(&settings, "zeta", "carol", true),
        ];

        let outcomes = aggregator.aggregate(
            &["acme".to_string(), "zeta".to_string()],
            &results,
            &MountTable::default(),
        );

        assert!(matches!(&outcomes[0].outcome, AggregationOutcome::Skipped { reason } if reason.contains("0/1")));
        assert!(!dir.path().join("raid/.acme").exists());
        assert!(outcomes[1].pool().is_some());
    }

    #[test]
    fn helper_failure_is_per_provider() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let runner = FakeRunner::new().fail_when_contains("raid/.acme", 1, "fuse: device not found");
        let aggregator = PoolAggregator::new(&runner, &settings);
        let results = vec![
            result(&settings, "acme", "alice", true),
            result(&settings, "zeta", "carol", true),
        ];

        let outcomes = aggregator.aggregate(
            &["acme".to_string(), "zeta".to_string()],
            &results,
            &MountTable::default(),
        );

        assert!(outcomes[0].is_failure());
        assert!(outcomes[1].pool().is_some());
    }

    #[test]
    fn pool_directory_failure_is_per_provider() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        fs::create_dir_all(dir.path().join("raid")).unwrap();
        fs::write(settings.layout().pool_path("acme"), "not a directory").unwrap();
        let runner = FakeRunner::new();
        let aggregator = PoolAggregator::new(&runner, &settings);
        let results = vec![
            result(&settings, "acme", "alice", true),
            result(&settings, "zeta", "carol", true),
        ];

        let outcomes = aggregator.aggregate(
            &["acme".to_string(), "zeta".to_string()],
            &results,
            &MountTable::default(),
        );

        assert!(matches!(
            &outcomes[0].outcome,
            AggregationOutcome::Failed { reason } if reason.contains("raid/.acme")
        ));
        assert!(outcomes[1].pool().is_some());
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].contains("raid/.zeta"));
    }

    #[test]
    fn omits_allow_other_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let settings = PoolSettings {
            allow_other: false,
            ..settings(dir.path())
        };
        let runner = FakeRunner::new();
        let aggregator = PoolAggregator::new(&runner, &settings);

        let command = aggregator.aggregate_command(&[PathBuf::from("/a")], &PathBuf::from("/p"));
        assert_eq!(command.render(), "mhddfs /a /p");
    }

    #[test]
    fn already_mounted_logins_join_a_new_pool() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let runner = FakeRunner::new();
        let aggregator = PoolAggregator::new(&runner, &settings);
        let alice = MountPoint::planned(
            "acme",
            "alice",
            settings.layout().mount_path("acme", "alice"),
            "https://dav",
        );
        let results = vec![
            MountResult::already_mounted(alice),
            result(&settings, "acme", "bob", true),
        ];

        let outcomes = aggregator.aggregate(&["acme".to_string()], &results, &MountTable::default());

        assert_eq!(outcomes[0].pool().unwrap().members.len(), 2);
    }

    #[test]
    fn leaves_mounted_pool_alone() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let runner = FakeRunner::new();
        let aggregator = PoolAggregator::new(&runner, &settings);
        let pool_path = settings.layout().pool_path("acme");
        let table = MountTable::parse(&format!("mhddfs {} fuse.mhddfs rw 0 0\n", pool_path.display()));

        let outcomes = aggregator.aggregate(
            &["acme".to_string()],
            &[result(&settings, "acme", "alice", true)],
            &table,
        );

        assert_eq!(
            outcomes[0].outcome,
            AggregationOutcome::AlreadyAggregated { path: pool_path }
        );
        assert!(runner.calls().is_empty());
    }
}
