//! Install pipeline
//!
//! Each job is a self-rescheduling chain of ticks on the pipeline's
//! [`TimerQueue`]: a tick does its work and then schedules exactly one
//! successor, so ticks of one app never overlap. A job holds the handle of
//! its single pending timer, which is what makes cancellation exact.

use crate::config::InstallConfig;
use crate::error::InstallError;
use crate::job::{AppId, InstallJob, InstallPhase};
use crate::link::LinkStatus;
use crate::permission::{can_manage_apps, resolve_user};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use simdesk_host::{Host, NotificationKind, SimTime, TimerQueue};
use std::collections::BTreeMap;
use std::fmt;

/// Lower bound (exclusive) of the slow-finalize window
const STALL_WINDOW_LOW: f64 = 85.0;

/// Upper bound (exclusive) of the slow-finalize window
const STALL_WINDOW_HIGH: f64 = 95.0;

#[derive(Debug, Clone, PartialEq, Eq)]
enum PipelineEvent {
    Tick(AppId),
    Finalize(AppId),
}

/// What happened to an accepted install request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallOutcome {
    /// A new job was created
    Started,
    /// A job for the app already exists; nothing changed
    AlreadyInstalling,
    /// The user is unprivileged; the request went straight to the filesystem
    Delegated,
}

/// Simulated app downloads and installs
pub struct InstallPipeline {
    config: InstallConfig,
    host: Host,
    rng: Box<dyn RngCore + Send>,
    timers: TimerQueue<PipelineEvent>,
    jobs: BTreeMap<AppId, InstallJob>,
}

impl InstallPipeline {
    /// Create an idle pipeline
    #[must_use]
    pub fn new(config: InstallConfig, host: &Host, rng: Box<dyn RngCore + Send>) -> Self {
        Self {
            config,
            host: host.clone(),
            rng,
            timers: TimerQueue::new(),
            jobs: BTreeMap::new(),
        }
    }

    /// Whole-percent progress of every in-flight job
    #[must_use]
    pub fn installing_apps(&self) -> BTreeMap<AppId, u8> {
        self.jobs
            .iter()
            .map(|(id, job)| (id.clone(), job.percent()))
            .collect()
    }

    /// In-flight job for `app_id`
    #[inline]
    #[must_use]
    pub fn job(&self, app_id: &str) -> Option<&InstallJob> {
        self.jobs.get(app_id)
    }

    /// Phase of the job for `app_id`
    #[must_use]
    pub fn job_phase(&self, app_id: &str) -> Option<InstallPhase> {
        self.job(app_id).map(InstallJob::phase)
    }

    /// Check if `app_id` has an in-flight job
    #[inline]
    #[must_use]
    pub fn is_installing(&self, app_id: &str) -> bool {
        self.jobs.contains_key(app_id)
    }

    /// Number of in-flight jobs
    #[inline]
    #[must_use]
    pub fn active_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Simulated time of the pipeline clock
    #[inline]
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.timers.now()
    }

    /// Request an install of `app_id` (`size_mb` to download)
    ///
    /// Checks, in order: a usable connection, the acting user's privileges,
    /// and whether a job already exists.
    ///
    /// # Errors
    /// Returns `InstallError::NoConnection` (after notifying the user) when
    /// there is no usable connection
    pub fn handle_install(
        &mut self,
        app_id: impl Into<AppId>,
        size_mb: f64,
        owner: Option<&str>,
        link: &dyn LinkStatus,
    ) -> Result<InstallOutcome, InstallError> {
        let app_id = app_id.into();

        if link.link_speed_mbps().is_none() {
            tracing::warn!(app_id = %app_id, "install refused: no connection");
            self.host.notify_localized(
                NotificationKind::Error,
                "appStore.noConnection.title",
                "appStore.noConnection.message",
                &[("app", app_id.as_str())],
            );
            return Err(InstallError::NoConnection { app_id });
        }

        let user = resolve_user(&self.config, owner);
        if !can_manage_apps(&self.config, self.host.users.as_ref(), &user) {
            tracing::info!(app_id = %app_id, user = %user, "unprivileged install delegated");
            self.host.fs.install_app(app_id.as_str(), &user);
            return Ok(InstallOutcome::Delegated);
        }

        if self.jobs.contains_key(&app_id) {
            tracing::debug!(app_id = %app_id, "install already running");
            return Ok(InstallOutcome::AlreadyInstalling);
        }

        let mut job = InstallJob::new(app_id.clone(), user, size_mb);
        let first_tick = self
            .timers
            .schedule(self.config.download_tick(), PipelineEvent::Tick(app_id.clone()));
        job.timer = Some(first_tick);
        tracing::info!(app_id = %app_id, size_mb, owner = job.owner(), "install started");
        self.jobs.insert(app_id, job);

        Ok(InstallOutcome::Started)
    }

    /// Abort the job for `app_id`, returning whether one existed
    ///
    /// The pending tick is cancelled before the job is dropped, so nothing
    /// fires for the app afterwards.
    pub fn cancel_install(&mut self, app_id: &str) -> bool {
        let Some(job) = self.jobs.get_mut(app_id) else {
            return false;
        };
        if let Some(timer) = job.timer.take() {
            self.timers.cancel(timer);
        }
        self.jobs.remove(app_id);
        tracing::info!(app_id, "install cancelled");
        true
    }

    /// Remove an installed app
    ///
    /// An in-flight job for the same app is cancelled first.
    ///
    /// # Errors
    /// Returns `InstallError::PermissionDenied` (after notifying the user)
    /// when the acting user may not manage apps
    pub fn handle_uninstall(&mut self, app_id: &str, owner: Option<&str>) -> Result<(), InstallError> {
        let user = self.require_privileged(app_id, owner, "uninstall")?;
        self.cancel_install(app_id);
        self.host.fs.uninstall_app(app_id, &user);
        tracing::info!(app_id, user = %user, "app uninstalled");
        Ok(())
    }

    /// Check if the executable of an installed app has gone missing
    ///
    /// Apps the filesystem has no record of are never broken.
    #[must_use]
    pub fn is_app_broken(&self, app_id: &str) -> bool {
        if !self.host.fs.is_installed(app_id) {
            return false;
        }
        let path = self.config.executable_path(app_id);
        !self
            .host
            .fs
            .node_at_path(&path)
            .is_some_and(|node| node.is_file())
    }

    /// Recreate a placeholder executable for `app_id`
    ///
    /// # Errors
    /// - `InstallError::PermissionDenied` when the acting user may not manage apps
    /// - `InstallError::RestoreFailed` when the filesystem refuses the write
    pub fn handle_restore(&self, app_id: &str, owner: Option<&str>) -> Result<(), InstallError> {
        self.require_privileged(app_id, owner, "restore")?;

        let content = format!("#!simdesk-app\n{app_id}\n");
        let written = self.host.fs.create_file(
            &self.config.bin_dir,
            app_id,
            &content,
            &self.config.superuser,
            0o755,
        );

        if written {
            tracing::info!(app_id, "app restored");
            self.host.notify_localized(
                NotificationKind::Success,
                "appStore.restore.success.title",
                "appStore.restore.success.message",
                &[("app", app_id)],
            );
            Ok(())
        } else {
            tracing::warn!(app_id, "app restore failed");
            self.host.notify_localized(
                NotificationKind::Error,
                "appStore.restore.failed.title",
                "appStore.restore.failed.message",
                &[("app", app_id)],
            );
            Err(InstallError::RestoreFailed {
                app_id: AppId::from(app_id),
            })
        }
    }

    /// Due time of the next scheduled tick
    pub fn next_deadline(&mut self) -> Option<SimTime> {
        self.timers.next_deadline()
    }

    /// Fire every tick due at or before `at`, reading speed from `link`
    pub fn advance_to(&mut self, at: SimTime, link: &dyn LinkStatus) {
        while let Some((_, event)) = self.timers.pop_due(at) {
            match event {
                PipelineEvent::Tick(app_id) => self.on_tick(&app_id, link),
                PipelineEvent::Finalize(app_id) => self.finalize(&app_id),
            }
        }
        self.timers.settle(at);
    }

    /// Drop every job and pending tick
    pub fn shutdown(&mut self) {
        self.timers.clear();
        if !self.jobs.is_empty() {
            tracing::info!(jobs = self.jobs.len(), "discarding in-flight installs");
        }
        self.jobs.clear();
    }

    fn on_tick(&mut self, app_id: &AppId, link: &dyn LinkStatus) {
        let Some(job) = self.jobs.get_mut(app_id) else {
            return;
        };
        job.timer = None;
        let before = job.phase();

        let delay = match before {
            InstallPhase::Downloading => {
                let speed = link.link_speed_mbps().unwrap_or(0.0);
                let moved = job.download(speed, self.config.download_tick());
                if moved > 0.0 {
                    self.host.usage.record_transfer(moved);
                } else {
                    tracing::trace!(app_id = %app_id, "download stalled");
                }
                self.config.download_tick()
            }
            InstallPhase::Installing => {
                job.install(self.rng.gen_range(1.0..4.0));
                let jitter = self.rng.gen_range(0.5..1.5);
                let mut delay = self.config.install_tick().mul_f64(jitter);
                let in_window =
                    job.progress() > STALL_WINDOW_LOW && job.progress() < STALL_WINDOW_HIGH;
                if in_window && self.rng.gen::<f64>() < self.config.stall_chance {
                    delay += self.config.stall_delay();
                    tracing::debug!(app_id = %app_id, progress = job.progress(), "finalize stall");
                }
                delay
            }
            InstallPhase::Finalizing => self.config.finalize_delay(),
        };

        let after = job.phase();
        if after != before {
            tracing::debug!(app_id = %app_id, from = %before, to = %after, "install phase changed");
        }

        let timer = if after == InstallPhase::Finalizing {
            self.timers
                .schedule(self.config.finalize_delay(), PipelineEvent::Finalize(app_id.clone()))
        } else {
            self.timers.schedule(delay, PipelineEvent::Tick(app_id.clone()))
        };
        job.timer = Some(timer);
    }

    fn finalize(&mut self, app_id: &AppId) {
        let Some(job) = self.jobs.remove(app_id) else {
            return;
        };
        self.host.fs.install_app(app_id.as_str(), job.owner());
        tracing::info!(app_id = %app_id, owner = job.owner(), "install complete");
        self.host.notify_localized(
            NotificationKind::Success,
            "appStore.installed.title",
            "appStore.installed.message",
            &[("app", app_id.as_str())],
        );
    }

    fn require_privileged(
        &self,
        app_id: &str,
        owner: Option<&str>,
        action: &'static str,
    ) -> Result<String, InstallError> {
        let user = resolve_user(&self.config, owner);
        if can_manage_apps(&self.config, self.host.users.as_ref(), &user) {
            return Ok(user);
        }

        tracing::warn!(app_id, user = %user, action, "permission denied");
        self.host.notify_localized(
            NotificationKind::Error,
            "appStore.permission.title",
            "appStore.permission.message",
            &[("user", user.as_str()), ("app", app_id)],
        );
        Err(InstallError::PermissionDenied {
            user,
            action,
            app_id: AppId::from(app_id),
        })
    }
}

impl fmt::Debug for InstallPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallPipeline")
            .field("jobs", &self.jobs.keys().collect::<Vec<_>>())
            .field("timers", &self.timers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    const LINK_80: Option<f64> = Some(80.0);
    const NO_LINK: Option<f64> = None;

    fn pipeline(seed: u64) -> InstallPipeline {
        InstallPipeline::new(
            InstallConfig::default().with_default_user("admin"),
            &Host::in_memory(),
            Box::new(StdRng::seed_from_u64(seed)),
        )
    }

    fn step(p: &mut InstallPipeline, ms: u64, link: &dyn LinkStatus) {
        let at = p.now() + Duration::from_millis(ms);
        p.advance_to(at, link);
    }

    #[test]
    fn first_tick_after_download_interval() {
        let mut p = pipeline(1);
        assert_eq!(p.handle_install("paint", 50.0, None, &LINK_80).unwrap(), InstallOutcome::Started);
        assert_eq!(p.installing_apps().get("paint"), Some(&0));

        step(&mut p, 99, &LINK_80);
        assert_eq!(p.job("paint").unwrap().downloaded_mb(), 0.0);

        step(&mut p, 1, &LINK_80);
        let job = p.job("paint").unwrap();
        assert!((job.downloaded_mb() - 1.0).abs() < 1e-9);
        assert!((job.progress() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn no_link_refuses() {
        let mut p = pipeline(2);
        let err = p.handle_install("paint", 50.0, None, &NO_LINK).unwrap_err();
        assert!(matches!(err, InstallError::NoConnection { .. }));
        assert_eq!(p.active_jobs(), 0);
        assert_eq!(p.next_deadline(), None);
    }

    #[test]
    fn second_request_is_noop() {
        let mut p = pipeline(3);
        p.handle_install("paint", 50.0, None, &LINK_80).unwrap();
        step(&mut p, 300, &LINK_80);
        let progress = p.job("paint").unwrap().progress();

        assert_eq!(
            p.handle_install("paint", 999.0, None, &LINK_80).unwrap(),
            InstallOutcome::AlreadyInstalling
        );
        assert_eq!(p.active_jobs(), 1);
        assert_eq!(p.job("paint").unwrap().size_mb(), 50.0);
        assert_eq!(p.job("paint").unwrap().progress(), progress);
    }

    #[test]
    fn stalls_without_link_and_resumes() {
        let mut p = pipeline(4);
        p.handle_install("paint", 50.0, None, &LINK_80).unwrap();
        step(&mut p, 100, &LINK_80);
        let before = p.job("paint").unwrap().progress();

        step(&mut p, 60_000, &NO_LINK);
        assert_eq!(p.job("paint").unwrap().progress(), before);
        assert_eq!(p.job_phase("paint"), Some(InstallPhase::Downloading));

        step(&mut p, 100, &LINK_80);
        assert!(p.job("paint").unwrap().progress() > before);
    }

    #[test]
    fn runs_to_completion() {
        let mut p = pipeline(5);
        p.handle_install("paint", 5.0, None, &LINK_80).unwrap();
        for _ in 0..2000 {
            if !p.is_installing("paint") {
                break;
            }
            step(&mut p, 100, &LINK_80);
        }
        assert!(!p.is_installing("paint"));
        assert!(p.installing_apps().is_empty());
        assert_eq!(p.next_deadline(), None);
    }

    #[test]
    fn cancel_is_exact() {
        let mut p = pipeline(6);
        p.handle_install("paint", 50.0, None, &LINK_80).unwrap();
        step(&mut p, 250, &LINK_80);
        assert!(p.cancel_install("paint"));
        assert!(!p.cancel_install("paint"));
        assert_eq!(p.next_deadline(), None);

        step(&mut p, 600_000, &LINK_80);
        assert!(!p.is_installing("paint"));
    }

    #[test]
    fn cancel_unknown_is_noop() {
        let mut p = pipeline(7);
        assert!(!p.cancel_install("ghost"));
    }

    #[test]
    fn unknown_app_is_not_broken() {
        let mut p = pipeline(9);
        assert!(!p.is_app_broken("ghost"));

        p.handle_install("paint", 1.0, None, &LINK_80).unwrap();
        for _ in 0..2000 {
            if !p.is_installing("paint") {
                break;
            }
            step(&mut p, 100, &LINK_80);
        }
        assert!(!p.is_app_broken("paint"));
        assert!(!p.is_app_broken("ghost"));
    }

    #[test]
    fn shutdown_clears_everything() {
        let mut p = pipeline(8);
        p.handle_install("paint", 50.0, None, &LINK_80).unwrap();
        p.handle_install("chess", 10.0, None, &LINK_80).unwrap();
        p.shutdown();
        assert_eq!(p.active_jobs(), 0);
        assert_eq!(p.next_deadline(), None);
    }
}
