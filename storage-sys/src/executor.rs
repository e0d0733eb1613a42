// SPDX-License-Identifier: GPL-3.0-only

//! Per-login WebDAV mounts
//!
//! Mounts run one at a time in plan order. A failing mount never stops the
//! remaining ones; the failure is recorded on that point's result and the
//! aggregator later leaves it out of the provider pool.

use std::fs;
use std::path::Path;

use storage_types::{MountPoint, MountResult, PoolSettings, UnmountOutcome, UnmountResult};
use tracing::{info, warn};

use crate::error::SysError;
use crate::mount_table::MountTable;
use crate::runner::{CommandRunner, CommandSpec};

pub struct MountExecutor<'a> {
    runner: &'a dyn CommandRunner,
    settings: &'a PoolSettings,
}

impl<'a> MountExecutor<'a> {
    pub fn new(runner: &'a dyn CommandRunner, settings: &'a PoolSettings) -> Self {
        Self { runner, settings }
    }

    pub fn mount_command(&self, point: &MountPoint) -> CommandSpec {
        CommandSpec::new(&self.settings.tools.mount)
            .arg("-t")
            .arg(&self.settings.fs_type)
            .arg("-o")
            .arg("rw")
            .arg(&point.endpoint)
            .path_arg(&point.path)
    }

    pub fn unmount_command(&self, point: &MountPoint) -> CommandSpec {
        CommandSpec::new(&self.settings.tools.umount).path_arg(&point.path)
    }

    /// Mount every point in order, skipping those already in `table`.
    pub fn mount_all(&self, points: &[MountPoint], table: &MountTable) -> Vec<MountResult> {
        points
            .iter()
            .map(|point| self.mount_one(point.clone(), table))
            .collect()
    }

    fn mount_one(&self, point: MountPoint, table: &MountTable) -> MountResult {
        if table.is_mounted(&point.path) {
            warn!(
                "{:?} ({}/{}) is already mounted, skipping",
                point.path, point.provider, point.login
            );
            return MountResult::already_mounted(point);
        }

        if let Err(e) = fs::create_dir_all(&point.path) {
            let reason = format!("cannot create mount point: {e}");
            warn!(
                "{}",
                SysError::Mount {
                    path: point.path.clone(),
                    reason: reason.clone(),
                }
            );
            return MountResult::failed(point, reason, String::new());
        }

        let command = self.mount_command(&point);
        info!(
            "Mounting {} for {}/{} at {:?}",
            point.endpoint, point.provider, point.login, point.path
        );

        match self.runner.run(&command) {
            Ok(output) if output.success() => {
                info!("Mounted {:?}", point.path);
                MountResult::mounted(point, output.diagnostics())
            }
            Ok(output) => {
                let error = SysError::Mount {
                    path: point.path.clone(),
                    reason: format!(
                        "`{}` exited with {}",
                        command.render(),
                        output.exit_description()
                    ),
                };
                warn!("{}: {}", error, output.diagnostics());
                MountResult::failed(point, output.exit_description(), output.diagnostics())
            }
            Err(e) => {
                warn!("Mount of {:?} ({}) failed: {}", point.path, point.provider, e);
                MountResult::failed(point, e.to_string(), String::new())
            }
        }
    }

    /// Unmount every point in reverse plan order.
    pub fn unmount_all(&self, points: &[MountPoint], table: &MountTable) -> Vec<UnmountResult> {
        points
            .iter()
            .rev()
            .map(|point| self.unmount_one(point, table))
            .collect()
    }

    fn unmount_one(&self, point: &MountPoint, table: &MountTable) -> UnmountResult {
        let outcome = if !table.is_mounted(&point.path) {
            info!("{:?} is not mounted, skipping", point.path);
            UnmountOutcome::NotMounted
        } else {
            let command = self.unmount_command(point);
            info!("Unmounting {:?}", point.path);
            release(self.runner, &command, &point.path)
        };

        UnmountResult {
            path: point.path.clone(),
            provider: point.provider.clone(),
            outcome,
        }
    }
}

/// Run an unmount command for `path` and map its exit to an outcome.
pub(crate) fn release(
    runner: &dyn CommandRunner,
    command: &CommandSpec,
    path: &Path,
) -> UnmountOutcome {
    match runner.run(command) {
        Ok(output) if output.success() => UnmountOutcome::Unmounted,
        Ok(output) => {
            warn!(
                "`{}` exited with {}: {}",
                command.render(),
                output.exit_description(),
                output.diagnostics()
            );
            UnmountOutcome::Failed {
                reason: output.exit_description(),
            }
        }
        Err(e) => {
            warn!("Unmount of {:?} failed: {}", path, e);
            UnmountOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRunner;
    use storage_types::{MountOutcome, MountState, PoolLayout};

    fn points(root: &Path, logins: &[&str]) -> Vec<MountPoint> {
        let layout = PoolLayout::new(root);
        logins
            .iter()
            .map(|login| {
                MountPoint::planned("acme", login, layout.mount_path("acme", login), "https://acme/dav")
            })
            .collect()
    }

    #[test]
    fn continues_after_a_failed_mount() {
        let dir = tempfile::tempdir().unwrap();
        let settings = PoolSettings::default();
        let runner = FakeRunner::new().fail_when_contains("acme.alice", 32, "connection refused");
        let executor = MountExecutor::new(&runner, &settings);

        let results = executor.mount_all(&points(dir.path(), &["alice", "bob"]), &MountTable::default());

        assert_eq!(results.len(), 2);
        assert!(results[0].is_failure());
        assert_eq!(results[0].point.state, MountState::Failed);
        assert_eq!(results[0].diagnostics, "connection refused");
        assert!(results[1].success());
        assert!(dir.path().join("parts/acme.bob").is_dir());

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].starts_with("mount -t davfs -o rw https://acme/dav "));
        assert!(calls[1].ends_with("parts/acme.bob"));
    }

    #[test]
    fn skips_points_in_mount_table() {
        let dir = tempfile::tempdir().unwrap();
        let settings = PoolSettings::default();
        let runner = FakeRunner::new();
        let executor = MountExecutor::new(&runner, &settings);
        let points = points(dir.path(), &["alice"]);
        let table = MountTable::parse(&format!("dav {} fuse rw 0 0\n", points[0].path.display()));

        let results = executor.mount_all(&points, &table);

        assert_eq!(results[0].outcome, MountOutcome::AlreadyMounted);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn runner_errors_become_failed_results() {
        let dir = tempfile::tempdir().unwrap();
        let settings = PoolSettings::default();
        let runner = FakeRunner::new().timeout_when_contains("acme.alice");
        let executor = MountExecutor::new(&runner, &settings);

        let results = executor.mount_all(&points(dir.path(), &["alice"]), &MountTable::default());
        assert!(matches!(&results[0].outcome, MountOutcome::Failed { reason } if reason.contains("timed out")));
    }

    #[test]
    fn unmounts_in_reverse_order() {
        let dir = tempfile::tempdir().unwrap();
        let settings = PoolSettings::default();
        let runner = FakeRunner::new();
        let executor = MountExecutor::new(&runner, &settings);
        let points = points(dir.path(), &["alice", "bob", "carol"]);
        let table = MountTable::parse(&format!(
            "dav {} fuse rw 0 0\ndav {} fuse rw 0 0\n",
            points[0].path.display(),
            points[2].path.display()
        ));

        let results = executor.unmount_all(&points, &table);

        assert_eq!(results[0].path, points[2].path);
        assert_eq!(results[0].outcome, UnmountOutcome::Unmounted);
        assert_eq!(results[1].outcome, UnmountOutcome::NotMounted);
        assert_eq!(results[2].outcome, UnmountOutcome::Unmounted);
        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].ends_with("acme.carol"));
        assert!(calls[1].ends_with("acme.alice"));
    }

    #[test]
    fn failed_unmount_is_reported_per_point() {
        let dir = tempfile::tempdir().unwrap();
        let settings = PoolSettings::default();
        let runner = FakeRunner::new().fail_when_contains("acme.bob", 32, "target is busy");
        let executor = MountExecutor::new(&runner, &settings);
        let points = points(dir.path(), &["alice", "bob"]);
        let table = MountTable::parse(&format!(
            "dav {} fuse rw 0 0\ndav {} fuse rw 0 0\n",
            points[0].path.display(),
            points[1].path.display()
        ));

        let results = executor.unmount_all(&points, &table);

        assert!(results[0].is_failure());
        assert_eq!(results[1].outcome, UnmountOutcome::Unmounted);
    }
}
