// SPDX-License-Identifier: GPL-3.0-only

//! Domain models for the cloud storage pool
//!
//! Types shared by the system layer (`storage-sys`) and the command line
//! front end:
//!
//! - **Accounts**: providers, WebDAV endpoints and logins as read from `cr.yml`
//! - **Mounts**: the deterministic mount plan, secrets entries and per-login results
//! - **Pools**: per-provider aggregated volumes and the mount/unmount reports
//! - **Capacity**: per-directory capacity rows and the status report

pub mod account;
pub mod capacity;
pub mod mount;
pub mod pool;
pub mod settings;

pub use account::{
    AccountConfig, Accounts, CloudConfig, validate_account, validate_login_name,
    validate_provider_name,
};
pub use capacity::{CapacityEntry, CapacityRecord, CapacityState, StatusReport};
pub use mount::{
    MountOutcome, MountPlan, MountPoint, MountResult, MountState, SecretEntry, UnmountOutcome,
    UnmountResult,
};
pub use pool::{
    AggregationOutcome, AggregationResult, MountReport, Pool, ProviderSummary, UnmountReport,
};
pub use settings::{PoolLayout, PoolSettings, ToolSettings};
