//! Who may manage apps

use crate::config::InstallConfig;
use simdesk_host::UserDirectory;

/// Effective acting user: the explicit owner, else the configured default
#[must_use]
pub fn resolve_user(config: &InstallConfig, owner: Option<&str>) -> String {
    owner
        .filter(|o| !o.is_empty())
        .unwrap_or(config.default_user.as_str())
        .to_string()
}

/// Check if `user` is the superuser or a member of the admin group
///
/// Unknown accounts are unprivileged.
#[must_use]
pub fn can_manage_apps(config: &InstallConfig, users: &dyn UserDirectory, user: &str) -> bool {
    if user == config.superuser {
        return true;
    }
    users
        .lookup(user)
        .is_some_and(|account| account.in_group(&config.admin_group))
}
