// SPDX-License-Identifier: GPL-3.0-only

//! `cr`: mount WebDAV cloud accounts and pool them per provider

mod config;
mod logging;
mod output;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use storage_sys::{Orchestrator, SystemRunner};
use storage_types::CloudConfig;

use crate::config::LoggingLevel;

/// Exit code for `--strict` runs that completed with per-unit failures.
const EXIT_PARTIAL: u8 = 2;

/// Cloud remember tool
#[derive(Parser)]
#[command(name = "cr", version, propagate_version = true)]
struct Cli {
    /// Account document
    #[arg(
        short,
        long,
        env = "CR_CONFIG",
        default_value = config::DEFAULT_CONFIG_FILE,
        global = true
    )]
    config: PathBuf,

    /// Default log level (RUST_LOG takes precedence)
    #[arg(long, value_enum, default_value_t = LoggingLevel::Info, global = true)]
    log_level: LoggingLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show capacity of the pool directories and every mounted part
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Write secrets, mount every login and build the provider pools
    Mount {
        /// Exit with status 2 if any mount or pool failed
        #[arg(long)]
        strict: bool,
        #[arg(long)]
        json: bool,
    },

    /// Tear down pools and mounts, then clear the secrets file
    #[command(alias = "umount")]
    Unmount {
        /// Exit with status 2 if anything failed to unmount
        #[arg(long)]
        strict: bool,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.log_level);

    match cli.command {
        Commands::Status { json } => {
            let config = config::load_or_default(&cli.config)?;
            let orchestrator = orchestrator(&config);
            let report = orchestrator.status()?;

            let mut stdout = io::stdout().lock();
            if json {
                output::print_json(&mut stdout, &report)?;
            } else {
                output::print_status(&mut stdout, &report)?;
            }
            stdout.flush()?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Mount { strict, json } => {
            let config = config::load(&cli.config)?;
            warn_unless_root();
            let orchestrator = orchestrator(&config);
            let report = orchestrator
                .mount(&config.accounts)
                .context("Mount aborted")?;

            let mut stdout = io::stdout().lock();
            if json {
                output::print_json(&mut stdout, &report)?;
            } else {
                output::print_mount(&mut stdout, &report)?;
            }
            stdout.flush()?;
            Ok(ExitCode::from(exit_status(strict, report.has_failures())))
        }
        Commands::Unmount { strict, json } => {
            let config = config::load(&cli.config)?;
            warn_unless_root();
            let orchestrator = orchestrator(&config);
            let report = orchestrator
                .unmount(&config.accounts)
                .context("Unmount aborted")?;

            let mut stdout = io::stdout().lock();
            if json {
                output::print_json(&mut stdout, &report)?;
            } else {
                output::print_unmount(&mut stdout, &report)?;
            }
            stdout.flush()?;
            Ok(ExitCode::from(exit_status(strict, report.has_failures())))
        }
    }
}

fn orchestrator(config: &CloudConfig) -> Orchestrator<SystemRunner> {
    let settings = config.pool.clone();
    let runner = SystemRunner::new(settings.command_timeout());
    Orchestrator::new(settings, runner)
}

fn warn_unless_root() {
    if unsafe { libc::geteuid() } != 0 {
        tracing::warn!("Not running as root; mounting and writing secrets will likely fail");
    }
}

fn exit_status(strict: bool, has_failures: bool) -> u8 {
    if strict && has_failures { EXIT_PARTIAL } else { 0 }
}
