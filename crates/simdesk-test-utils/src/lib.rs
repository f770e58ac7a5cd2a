//! Testing utilities for SimDesk workspace
//!
//! Recording and failing collaborator fakes, plus random sources.

#![allow(missing_docs)]

use parking_lot::Mutex;
use rand::rngs::mock::StepRng;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use simdesk_host::{
    EnglishLocalizer, Filesystem, FsNode, Host, HostError, KeyValueStore, MemoryFilesystem,
    MemoryStore, NotificationKind, Notifier, SessionUsage, StaticUserDirectory,
};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notes: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<Notification> {
        self.notes.lock().clone()
    }

    pub fn count(&self, kind: NotificationKind) -> usize {
        self.notes.lock().iter().filter(|n| n.kind == kind).count()
    }

    pub fn last(&self) -> Option<Notification> {
        self.notes.lock().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NotificationKind, title: &str, message: &str) {
        self.notes.lock().push(Notification {
            kind,
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}

/// Store whose every operation fails
#[derive(Debug, Default)]
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, HostError> {
        Err(HostError::StorageUnavailable(format!("get {key}")))
    }

    fn set(&self, key: &str, _value: serde_json::Value) -> Result<(), HostError> {
        Err(HostError::StorageUnavailable(format!("set {key}")))
    }

    fn remove(&self, key: &str) -> Result<(), HostError> {
        Err(HostError::StorageUnavailable(format!("remove {key}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsCall {
    Install { app_id: String, owner: String },
    Uninstall { app_id: String, owner: String },
    CreateFile { path: String, owner: String, mode: u32 },
}

/// In-memory filesystem that remembers every mutating call
#[derive(Debug, Default)]
pub struct RecordingFilesystem {
    inner: MemoryFilesystem,
    calls: Mutex<Vec<FsCall>>,
    refuse_writes: Mutex<bool>,
}

impl RecordingFilesystem {
    pub fn calls(&self) -> Vec<FsCall> {
        self.calls.lock().clone()
    }

    pub fn installs_of(&self, app_id: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, FsCall::Install { app_id: a, .. } if a == app_id))
            .count()
    }

    pub fn memory(&self) -> &MemoryFilesystem {
        &self.inner
    }

    /// Make `create_file` fail from now on
    pub fn refuse_writes(&self) {
        *self.refuse_writes.lock() = true;
    }
}

impl Filesystem for RecordingFilesystem {
    fn node_at_path(&self, path: &str) -> Option<FsNode> {
        self.inner.node_at_path(path)
    }

    fn create_file(&self, dir: &str, name: &str, content: &str, owner: &str, mode: u32) -> bool {
        self.calls.lock().push(FsCall::CreateFile {
            path: format!("{}/{}", dir.trim_end_matches('/'), name),
            owner: owner.to_string(),
            mode,
        });
        if *self.refuse_writes.lock() {
            return false;
        }
        self.inner.create_file(dir, name, content, owner, mode)
    }

    fn install_app(&self, app_id: &str, owner: &str) {
        self.calls.lock().push(FsCall::Install {
            app_id: app_id.to_string(),
            owner: owner.to_string(),
        });
        self.inner.install_app(app_id, owner);
    }

    fn uninstall_app(&self, app_id: &str, owner: &str) {
        self.calls.lock().push(FsCall::Uninstall {
            app_id: app_id.to_string(),
            owner: owner.to_string(),
        });
        self.inner.uninstall_app(app_id, owner);
    }

    fn is_installed(&self, app_id: &str) -> bool {
        self.inner.is_installed(app_id)
    }
}

/// Host whose collaborators stay inspectable
#[derive(Debug, Clone, Default)]
pub struct TestHost {
    pub store: Arc<MemoryStore>,
    pub fs: Arc<RecordingFilesystem>,
    pub notifier: Arc<RecordingNotifier>,
    pub usage: Arc<SessionUsage>,
}

impl TestHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(&self) -> Host {
        Host {
            store: self.store.clone(),
            fs: self.fs.clone(),
            notifier: self.notifier.clone(),
            localizer: Arc::new(EnglishLocalizer),
            usage: self.usage.clone(),
            users: Arc::new(StaticUserDirectory::default()),
        }
    }
}

pub fn seeded(seed: u64) -> Box<dyn RngCore + Send> {
    Box::new(StdRng::seed_from_u64(seed))
}

/// Random source that always yields zero: `gen::<f64>()` is 0.0 and
/// `gen_range(a..b)` is `a`
pub fn zero_rng() -> Box<dyn RngCore + Send> {
    Box::new(StepRng::new(0, 0))
}
