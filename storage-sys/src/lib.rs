// SPDX-License-Identifier: GPL-3.0-only

//! System operations for the cloud storage pool
//!
//! This crate drives the external helpers that make up the pool:
//! - WebDAV mounts per provider login (`mount -t davfs`)
//! - Per-provider union pools (`mhddfs`)
//! - Capacity queries (`df`)
//! - The mount helper's secrets file
//!
//! Mount and unmount need root privileges on a typical system. All helper
//! invocations go through [`CommandRunner`].

pub mod aggregator;
pub mod capacity;
pub mod credentials;
pub mod error;
pub mod executor;
pub mod mount_table;
pub mod orchestrator;
pub mod planner;
pub mod runner;

#[cfg(test)]
mod testing;

pub use aggregator::PoolAggregator;
pub use capacity::{CapacityInspector, list_children, parse_df_output};
pub use credentials::{CredentialStore, render_secrets};
pub use error::{Result, SysError};
pub use executor::MountExecutor;
pub use mount_table::MountTable;
pub use orchestrator::Orchestrator;
pub use planner::plan_mounts;
pub use runner::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
