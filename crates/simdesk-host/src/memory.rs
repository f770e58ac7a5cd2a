//! In-memory collaborators
//!
//! Used by the `simdesk` binary and as building blocks for test fakes.

use crate::collab::{
    FsNode, Filesystem, KeyValueStore, Localizer, NotificationKind, Notifier, UsageTracker,
    UserAccount, UserDirectory,
};
use crate::error::HostError;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// Key-value store held in a map
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, HostError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), HostError> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), HostError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Who may register apps on a [`MemoryFilesystem`]
///
/// `root` and members of the admin group are allowed. Anyone else gets an
/// error notification and the call is dropped.
#[derive(Clone)]
pub struct AppPolicy {
    users: Arc<dyn UserDirectory>,
    notifier: Arc<dyn Notifier>,
    localizer: Arc<dyn Localizer>,
    admin_group: String,
    superuser: String,
}

impl AppPolicy {
    /// Policy admitting `root` and the `admin` group
    #[must_use]
    pub fn new(
        users: Arc<dyn UserDirectory>,
        notifier: Arc<dyn Notifier>,
        localizer: Arc<dyn Localizer>,
    ) -> Self {
        Self {
            users,
            notifier,
            localizer,
            admin_group: "admin".to_string(),
            superuser: "root".to_string(),
        }
    }

    /// Set the group whose members may manage apps
    #[inline]
    #[must_use]
    pub fn with_admin_group(mut self, group: impl Into<String>) -> Self {
        self.admin_group = group.into();
        self
    }

    /// Set the account that may always manage apps
    #[inline]
    #[must_use]
    pub fn with_superuser(mut self, user: impl Into<String>) -> Self {
        self.superuser = user.into();
        self
    }

    /// Check if `owner` may install or remove apps
    #[must_use]
    pub fn allows(&self, owner: &str) -> bool {
        owner == self.superuser
            || self
                .users
                .lookup(owner)
                .is_some_and(|account| account.in_group(&self.admin_group))
    }

    fn refuse(&self, app_id: &str, owner: &str) {
        tracing::warn!(app_id, owner, "app change refused");
        let vars = [("user", owner), ("app", app_id)];
        let title = self.localizer.t("appStore.permission.title", &vars);
        let message = self.localizer.t("appStore.permission.message", &vars);
        self.notifier.notify(NotificationKind::Error, &title, &message);
    }
}

impl fmt::Debug for AppPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppPolicy")
            .field("admin_group", &self.admin_group)
            .field("superuser", &self.superuser)
            .finish_non_exhaustive()
    }
}

/// Virtual filesystem held in a path map
///
/// Installing an app registers it and drops an executable into the bin
/// directory; uninstalling removes both. Without an [`AppPolicy`] every
/// owner is accepted.
#[derive(Debug)]
pub struct MemoryFilesystem {
    nodes: Mutex<BTreeMap<String, FsNode>>,
    installed: Mutex<BTreeSet<String>>,
    bin_dir: String,
    policy: Option<AppPolicy>,
}

impl MemoryFilesystem {
    /// Default directory receiving app executables
    pub const DEFAULT_BIN_DIR: &'static str = "/usr/bin";

    /// Create a filesystem with the standard directory skeleton
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        for dir in ["/", "/usr", Self::DEFAULT_BIN_DIR, "/home"] {
            nodes.insert(dir.to_string(), FsNode::directory("root", 0o755));
        }
        Self {
            nodes: Mutex::new(nodes),
            installed: Mutex::new(BTreeSet::new()),
            bin_dir: Self::DEFAULT_BIN_DIR.to_string(),
            policy: None,
        }
    }

    /// Place app executables under `dir`, creating it and its parents
    #[must_use]
    pub fn with_bin_dir(mut self, dir: impl Into<String>) -> Self {
        let dir = dir.into();
        let trimmed = dir.trim_end_matches('/');
        let dir = if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() };
        {
            let nodes = self.nodes.get_mut();
            let mut path = String::new();
            for part in dir.split('/').filter(|p| !p.is_empty()) {
                path.push('/');
                path.push_str(part);
                nodes
                    .entry(path.clone())
                    .or_insert_with(|| FsNode::directory("root", 0o755));
            }
        }
        self.bin_dir = dir;
        self
    }

    /// Only register apps for owners `policy` allows
    #[inline]
    #[must_use]
    pub fn with_app_policy(mut self, policy: AppPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Directory receiving app executables
    #[inline]
    #[must_use]
    pub fn bin_dir(&self) -> &str {
        &self.bin_dir
    }

    /// Remove the node at `path`, returning it
    pub fn remove_node(&self, path: &str) -> Option<FsNode> {
        self.nodes.lock().remove(path)
    }

    /// Registered app ids, sorted
    #[must_use]
    pub fn installed_apps(&self) -> Vec<String> {
        self.installed.lock().iter().cloned().collect()
    }

    fn permitted(&self, app_id: &str, owner: &str) -> bool {
        match &self.policy {
            Some(policy) if !policy.allows(owner) => {
                policy.refuse(app_id, owner);
                false
            }
            _ => true,
        }
    }

    fn join(dir: &str, name: &str) -> String {
        if dir.ends_with('/') {
            format!("{dir}{name}")
        } else {
            format!("{dir}/{name}")
        }
    }
}

impl Default for MemoryFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Filesystem for MemoryFilesystem {
    fn node_at_path(&self, path: &str) -> Option<FsNode> {
        self.nodes.lock().get(path).cloned()
    }

    fn create_file(&self, dir: &str, name: &str, content: &str, owner: &str, mode: u32) -> bool {
        let mut nodes = self.nodes.lock();
        match nodes.get(dir) {
            Some(parent) if !parent.is_file() => {}
            _ => return false,
        }
        nodes.insert(Self::join(dir, name), FsNode::file(content, owner, mode));
        true
    }

    fn install_app(&self, app_id: &str, owner: &str) {
        if !self.permitted(app_id, owner) {
            return;
        }
        self.installed.lock().insert(app_id.to_string());
        self.nodes.lock().insert(
            Self::join(&self.bin_dir, app_id),
            FsNode::file(format!("#!app {app_id}"), owner, 0o755),
        );
        tracing::debug!(app_id, owner, "app registered");
    }

    fn uninstall_app(&self, app_id: &str, owner: &str) {
        if !self.permitted(app_id, owner) {
            return;
        }
        self.installed.lock().remove(app_id);
        self.nodes.lock().remove(&Self::join(&self.bin_dir, app_id));
        tracing::debug!(app_id, owner, "app removed");
    }

    fn is_installed(&self, app_id: &str) -> bool {
        self.installed.lock().contains(app_id)
    }
}

/// Notifier that writes notifications to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NotificationKind, title: &str, message: &str) {
        match kind {
            NotificationKind::Success => tracing::info!(%kind, title, message, "notification"),
            NotificationKind::Error => tracing::warn!(%kind, title, message, "notification"),
        }
    }
}

/// Built-in English strings for the simulation's user-facing messages
///
/// Unknown keys resolve to the key itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnglishLocalizer;

impl EnglishLocalizer {
    fn template(key: &str) -> Option<&'static str> {
        let text = match key {
            "appStore.noConnection.title" => "No Internet Connection",
            "appStore.noConnection.message" => "Connect to a network to download {app}.",
            "appStore.permission.title" => "Permission Denied",
            "appStore.permission.message" => "{user} is not allowed to manage {app}.",
            "appStore.installed.title" => "App Installed",
            "appStore.installed.message" => "{app} is ready to use.",
            "appStore.restore.success.title" => "App Restored",
            "appStore.restore.success.message" => "{app} was repaired.",
            "appStore.restore.failed.title" => "Restore Failed",
            "appStore.restore.failed.message" => "{app} could not be repaired.",
            _ => return None,
        };
        Some(text)
    }
}

impl Localizer for EnglishLocalizer {
    fn t(&self, key: &str, vars: &[(&str, &str)]) -> String {
        let Some(template) = Self::template(key) else {
            return key.to_string();
        };
        vars.iter().fold(template.to_string(), |text, (name, value)| {
            text.replace(&format!("{{{name}}}"), value)
        })
    }
}

/// Session transfer counter
#[derive(Debug, Default)]
pub struct SessionUsage {
    session_mb: Mutex<f64>,
    total_mb: Mutex<f64>,
}

impl SessionUsage {
    /// Megabytes transferred since the last reset
    #[must_use]
    pub fn session_mb(&self) -> f64 {
        *self.session_mb.lock()
    }

    /// Megabytes transferred since creation
    #[must_use]
    pub fn total_mb(&self) -> f64 {
        *self.total_mb.lock()
    }
}

impl UsageTracker for SessionUsage {
    fn record_transfer(&self, megabytes: f64) {
        *self.session_mb.lock() += megabytes;
        *self.total_mb.lock() += megabytes;
    }

    fn reset_session(&self) {
        *self.session_mb.lock() = 0.0;
    }
}

/// Fixed set of accounts
#[derive(Debug, Clone)]
pub struct StaticUserDirectory {
    accounts: Vec<UserAccount>,
}

impl StaticUserDirectory {
    /// Directory with exactly these accounts
    #[must_use]
    pub fn new(accounts: Vec<UserAccount>) -> Self {
        Self { accounts }
    }
}

impl Default for StaticUserDirectory {
    /// `root`, an `admin` member and an unprivileged `user`
    fn default() -> Self {
        Self::new(vec![
            UserAccount::new("root", &["root", "admin"]),
            UserAccount::new("admin", &["users", "admin"]),
            UserAccount::new("user", &["users"]),
        ])
    }
}

impl UserDirectory for StaticUserDirectory {
    fn lookup(&self, name: &str) -> Option<UserAccount> {
        self.accounts.iter().find(|a| a.name == name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn memory_store_roundtrip_and_remove() {
        let store = MemoryStore::new();
        assert!(store.get("k").unwrap().is_none());

        store.set("k", json!({"a": 1})).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!({"a": 1})));
        assert_eq!(store.len(), 1);

        store.remove("k").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn create_file_requires_directory_parent() {
        let fs = MemoryFilesystem::new();
        assert!(fs.create_file("/usr/bin", "calc", "x", "root", 0o755));
        assert!(fs.node_at_path("/usr/bin/calc").unwrap().is_file());

        assert!(!fs.create_file("/nope", "calc", "x", "root", 0o755));
        assert!(!fs.create_file("/usr/bin/calc", "inner", "x", "root", 0o755));
    }

    #[test]
    fn install_and_uninstall_manage_binary() {
        let fs = MemoryFilesystem::new();
        fs.install_app("paint", "admin");
        assert!(fs.is_installed("paint"));
        assert!(fs.node_at_path("/usr/bin/paint").is_some());
        assert_eq!(fs.installed_apps(), vec!["paint".to_string()]);

        fs.uninstall_app("paint", "admin");
        assert!(!fs.is_installed("paint"));
        assert!(fs.node_at_path("/usr/bin/paint").is_none());
    }

    fn guarded(notifier: Arc<dyn Notifier>) -> MemoryFilesystem {
        let policy = AppPolicy::new(
            Arc::new(StaticUserDirectory::default()),
            notifier,
            Arc::new(EnglishLocalizer),
        );
        MemoryFilesystem::new().with_app_policy(policy)
    }

    #[derive(Default)]
    struct Counting {
        titles: Mutex<Vec<(NotificationKind, String, String)>>,
    }

    impl Notifier for Counting {
        fn notify(&self, kind: NotificationKind, title: &str, message: &str) {
            self.titles.lock().push((kind, title.to_string(), message.to_string()));
        }
    }

    #[test]
    fn policy_refuses_unprivileged_owner() {
        let notes = Arc::new(Counting::default());
        let fs = guarded(notes.clone());

        fs.install_app("paint", "user");
        assert!(!fs.is_installed("paint"));
        assert!(fs.node_at_path("/usr/bin/paint").is_none());

        let seen = notes.titles.lock().clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, NotificationKind::Error);
        assert_eq!(seen[0].1, "Permission Denied");
        assert_eq!(seen[0].2, "user is not allowed to manage paint.");
    }

    #[test]
    fn policy_admits_admin_group_and_superuser() {
        let notes = Arc::new(Counting::default());
        let fs = guarded(notes.clone());

        fs.install_app("paint", "admin");
        fs.install_app("calc", "root");
        assert_eq!(fs.installed_apps(), vec!["calc".to_string(), "paint".to_string()]);

        fs.uninstall_app("paint", "user");
        assert!(fs.is_installed("paint"));
        fs.uninstall_app("paint", "root");
        assert!(!fs.is_installed("paint"));
        assert_eq!(notes.titles.lock().len(), 1);
    }

    #[test]
    fn custom_bin_dir_receives_executables() {
        let fs = MemoryFilesystem::new().with_bin_dir("/opt/apps/");
        assert_eq!(fs.bin_dir(), "/opt/apps");
        assert!(!fs.node_at_path("/opt").unwrap().is_file());

        fs.install_app("paint", "admin");
        assert!(fs.node_at_path("/opt/apps/paint").unwrap().is_file());
        assert!(fs.node_at_path("/usr/bin/paint").is_none());
        assert!(fs.create_file("/opt/apps", "calc", "x", "root", 0o755));
    }

    #[test]
    fn localizer_substitutes_vars() {
        let t = EnglishLocalizer.t("appStore.installed.message", &[("app", "Paint")]);
        assert_eq!(t, "Paint is ready to use.");
        assert_eq!(EnglishLocalizer.t("missing.key", &[]), "missing.key");
    }

    #[test]
    fn session_usage_resets_session_only() {
        let usage = SessionUsage::default();
        usage.record_transfer(1.5);
        usage.record_transfer(0.5);
        usage.reset_session();
        usage.record_transfer(1.0);
        assert_eq!(usage.session_mb(), 1.0);
        assert_eq!(usage.total_mb(), 3.0);
    }

    #[test]
    fn default_directory_has_admin_and_user() {
        let users = StaticUserDirectory::default();
        assert!(users.lookup("admin").unwrap().in_group("admin"));
        assert!(!users.lookup("user").unwrap().in_group("admin"));
        assert!(users.lookup("mallory").is_none());
    }
}
