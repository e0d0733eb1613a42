// SPDX-License-Identifier: GPL-3.0-only

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingLevel;

const LOG_DIR_ENV: &str = "CR_LOG_DIR";
const LOG_PREFIX: &str = "cr.log";
const KEEP_DAYS: u64 = 7;

/// Log to stderr, and to a daily file under `$CR_LOG_DIR` when set.
///
/// The returned guard flushes the file writer on drop; hold it until exit.
pub fn init(level: LoggingLevel) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let Some(dir) = std::env::var_os(LOG_DIR_ENV).map(PathBuf::from) else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
        return None;
    };

    match file_writer(&dir) {
        Ok((writer, guard)) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .with(file_layer)
                .init();
            Some(guard)
        }
        Err(e) => {
            eprintln!("cr: failed to initialize file logging: {e:#}");
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}

fn file_writer(
    dir: &Path,
) -> anyhow::Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    fs::create_dir_all(dir)
        .with_context(|| format!("create log directory failed: {}", dir.display()))?;

    let prefix = OsString::from(LOG_PREFIX);
    cleanup_old_logs(dir, &prefix, SystemTime::now());

    let appender = tracing_appender::rolling::daily(dir, &prefix);
    Ok(tracing_appender::non_blocking(appender))
}

fn cleanup_old_logs(dir: &Path, prefix: &OsString, now: SystemTime) {
    let Some(cutoff) = now.checked_sub(Duration::from_secs(KEEP_DAYS * 24 * 60 * 60)) else {
        return;
    };

    let prefix = prefix.to_string_lossy();

    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }

        // Only files written by the rolling appender.
        if !entry
            .file_name()
            .to_string_lossy()
            .starts_with(prefix.as_ref())
        {
            continue;
        }

        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        if modified >= cutoff {
            continue;
        }

        let _ = fs::remove_file(entry.path());
    }
}
