// SPDX-License-Identifier: GPL-3.0-only

//! Deterministic mount planning
//!
//! Providers are visited in lexicographic order and logins in sorted order
//! within each provider, so the secrets file and the mount sequence are
//! reproducible from run to run.

use storage_types::{
    Accounts, MountPlan, MountPoint, PoolLayout, SecretEntry, validate_account,
};
use tracing::debug;

use crate::error::{Result, SysError};

/// Build the index-aligned secrets and mount points for `accounts`.
pub fn plan_mounts(accounts: &Accounts, layout: &PoolLayout) -> Result<MountPlan> {
    let mut plan = MountPlan::default();

    // `Accounts` and the per-account login map are both BTreeMaps.
    for (provider, account) in accounts {
        validate_account(provider, account).map_err(SysError::Config)?;

        for (login, secret) in &account.logins {
            let path = layout.mount_path(provider, login);
            plan.secrets.push(SecretEntry {
                path: path.clone(),
                login: login.clone(),
                secret: secret.clone(),
            });
            plan.points
                .push(MountPoint::planned(provider, login, path, &account.web_dav));
        }
    }

    debug!(
        "Planned {} mount points across {} providers",
        plan.len(),
        accounts.len()
    );
    Ok(plan)
}
