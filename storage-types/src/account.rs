// SPDX-License-Identifier: GPL-3.0-only

//! Provider account schema
//!
//! Accounts are keyed by provider name. Provider and login names end up
//! verbatim in mount paths and on helper command lines, so both are
//! restricted to a conservative character set at load time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::settings::PoolSettings;

/// One storage provider: a WebDAV endpoint plus the logins held there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountConfig {
    #[serde(rename = "web-dav")]
    pub web_dav: String,
    /// login name -> secret
    #[serde(default)]
    pub logins: BTreeMap<String, String>,
}

/// Providers keyed by name. A `BTreeMap` keeps iteration lexicographic.
pub type Accounts = BTreeMap<String, AccountConfig>;

/// Top-level configuration document (`cr.yml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CloudConfig {
    #[serde(default)]
    pub accounts: Accounts,
    #[serde(default)]
    pub pool: PoolSettings,
}

impl CloudConfig {
    /// Validate every account; the first violation is returned.
    pub fn validate(&self) -> Result<(), String> {
        for (provider, account) in &self.accounts {
            validate_account(provider, account)?;
        }
        Ok(())
    }
}

pub fn validate_provider_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Provider name cannot be empty".to_string());
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(format!(
            "Provider name '{name}' must contain only alphanumeric characters, dashes, or underscores"
        ));
    }
    Ok(())
}

pub fn validate_login_name(provider: &str, login: &str) -> Result<(), String> {
    if login.is_empty() {
        return Err(format!("Provider '{provider}' has an empty login name"));
    }
    if login.starts_with('.') {
        return Err(format!(
            "Login '{login}' of provider '{provider}' must not start with a dot"
        ));
    }
    if !login
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@' | '+'))
    {
        return Err(format!(
            "Login '{login}' of provider '{provider}' contains characters not allowed in a mount path"
        ));
    }
    Ok(())
}

pub fn validate_account(provider: &str, account: &AccountConfig) -> Result<(), String> {
    validate_provider_name(provider)?;

    if account.web_dav.trim().is_empty() {
        return Err(format!("Provider '{provider}' has no web-dav endpoint"));
    }
    if account.web_dav.chars().any(char::is_whitespace) {
        return Err(format!(
            "Provider '{provider}' web-dav endpoint must not contain whitespace"
        ));
    }
    if account.logins.is_empty() {
        return Err(format!("Provider '{provider}' has no logins"));
    }

    for (login, secret) in &account.logins {
        validate_login_name(provider, login)?;
        if secret.contains(['\n', '\r']) {
            return Err(format!(
                "Secret for login '{login}' of provider '{provider}' must be a single line"
            ));
        }
    }

    Ok(())
}
