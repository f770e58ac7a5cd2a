//! Collaborator traits
//!
//! The simulation never reaches for ambient globals: every service receives
//! the collaborators it needs through a [`Host`] bundle at construction.

use crate::error::HostError;
use crate::memory::{
    AppPolicy, EnglishLocalizer, MemoryFilesystem, MemoryStore, SessionUsage, StaticUserDirectory,
    TracingNotifier,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// JSON key-value persistence
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` when the key was never written
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, HostError>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), HostError>;

    /// Delete a value
    fn remove(&self, key: &str) -> Result<(), HostError>;
}

/// Kind of a virtual filesystem node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Regular file
    File,
    /// Directory
    Directory,
}

/// A node in the virtual filesystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsNode {
    /// File or directory
    pub kind: NodeKind,
    /// Owning user
    pub owner: String,
    /// Unix-style permission bits
    pub mode: u32,
    /// File content, `None` for directories
    pub content: Option<String>,
}

impl FsNode {
    /// Create a file node
    #[inline]
    #[must_use]
    pub fn file(content: impl Into<String>, owner: impl Into<String>, mode: u32) -> Self {
        Self {
            kind: NodeKind::File,
            owner: owner.into(),
            mode,
            content: Some(content.into()),
        }
    }

    /// Create a directory node
    #[inline]
    #[must_use]
    pub fn directory(owner: impl Into<String>, mode: u32) -> Self {
        Self {
            kind: NodeKind::Directory,
            owner: owner.into(),
            mode,
            content: None,
        }
    }

    /// Check if this node is a regular file
    #[inline]
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }
}

/// Virtual filesystem and app registry
pub trait Filesystem: Send + Sync {
    /// Look up the node at an absolute path
    fn node_at_path(&self, path: &str) -> Option<FsNode>;

    /// Create a file in `dir`, returning whether it was written
    fn create_file(&self, dir: &str, name: &str, content: &str, owner: &str, mode: u32) -> bool;

    /// Durably register an installed app for `owner`
    ///
    /// The collaborator enforces its own permissions and notifies the user
    /// when it refuses.
    fn install_app(&self, app_id: &str, owner: &str);

    /// Remove an installed app on behalf of `owner`
    fn uninstall_app(&self, app_id: &str, owner: &str);

    /// Check if an app is currently registered
    fn is_installed(&self, app_id: &str) -> bool;
}

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Operation succeeded
    Success,
    /// Operation failed or was refused
    Error,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// User-visible notification sink
pub trait Notifier: Send + Sync {
    /// Show a notification
    fn notify(&self, kind: NotificationKind, title: &str, message: &str);
}

/// Localized string lookup
pub trait Localizer: Send + Sync {
    /// Resolve `key`, substituting `{name}` placeholders from `vars`
    fn t(&self, key: &str, vars: &[(&str, &str)]) -> String;
}

/// Session transfer accounting
pub trait UsageTracker: Send + Sync {
    /// Account megabytes moved over the active connection
    fn record_transfer(&self, megabytes: f64);

    /// Reset session counters, called when the connection is dropped
    fn reset_session(&self);
}

/// A desktop user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    /// Login name
    pub name: String,
    /// Group memberships
    pub groups: Vec<String>,
}

impl UserAccount {
    /// Create an account
    #[must_use]
    pub fn new(name: impl Into<String>, groups: &[&str]) -> Self {
        Self {
            name: name.into(),
            groups: groups.iter().map(|g| (*g).to_string()).collect(),
        }
    }

    /// Check group membership
    #[inline]
    #[must_use]
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

/// Account lookup
pub trait UserDirectory: Send + Sync {
    /// Find an account by login name
    fn lookup(&self, name: &str) -> Option<UserAccount>;
}

/// Bundle of collaborators injected into the simulation services
#[derive(Clone)]
pub struct Host {
    /// Persistence
    pub store: Arc<dyn KeyValueStore>,
    /// Virtual filesystem
    pub fs: Arc<dyn Filesystem>,
    /// Notification sink
    pub notifier: Arc<dyn Notifier>,
    /// String lookup
    pub localizer: Arc<dyn Localizer>,
    /// Session usage counters
    pub usage: Arc<dyn UsageTracker>,
    /// Account lookup
    pub users: Arc<dyn UserDirectory>,
}

impl Host {
    /// Host backed entirely by the in-memory collaborators
    ///
    /// The filesystem only registers apps for `root` and members of the
    /// `admin` group.
    #[must_use]
    pub fn in_memory() -> Self {
        let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
        let localizer: Arc<dyn Localizer> = Arc::new(EnglishLocalizer);
        let users: Arc<dyn UserDirectory> = Arc::new(StaticUserDirectory::default());
        let policy = AppPolicy::new(Arc::clone(&users), Arc::clone(&notifier), Arc::clone(&localizer));
        Self {
            store: Arc::new(MemoryStore::new()),
            fs: Arc::new(MemoryFilesystem::new().with_app_policy(policy)),
            notifier,
            localizer,
            usage: Arc::new(SessionUsage::default()),
            users,
        }
    }

    /// Replace the store
    #[inline]
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = store;
        self
    }

    /// Replace the filesystem
    #[inline]
    #[must_use]
    pub fn with_fs(mut self, fs: Arc<dyn Filesystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Replace the notifier
    #[inline]
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Replace the usage tracker
    #[inline]
    #[must_use]
    pub fn with_usage(mut self, usage: Arc<dyn UsageTracker>) -> Self {
        self.usage = usage;
        self
    }

    /// Replace the user directory
    #[inline]
    #[must_use]
    pub fn with_users(mut self, users: Arc<dyn UserDirectory>) -> Self {
        self.users = users;
        self
    }

    /// Localize and send a notification in one step
    pub fn notify_localized(
        &self,
        kind: NotificationKind,
        title_key: &str,
        message_key: &str,
        vars: &[(&str, &str)],
    ) {
        let title = self.localizer.t(title_key, vars);
        let message = self.localizer.t(message_key, vars);
        self.notifier.notify(kind, &title, &message);
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host").finish_non_exhaustive()
    }
}
