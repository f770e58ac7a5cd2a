//! End-to-end scenarios for the desktop coordinator.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use simdesk_core::{memory_host, Desktop, DesktopConfig, DesktopError};
use simdesk_host::{Filesystem, Host, NotificationKind, SimTime};
use simdesk_install::{InstallError, InstallOutcome, InstallPhase};
use simdesk_net::NetError;
use simdesk_test_utils::{RecordingNotifier, TestHost};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

fn desktop(test_host: &TestHost, seed: u64) -> Desktop {
    Desktop::new(DesktopConfig::default().with_seed(seed), test_host.host()).unwrap()
}

fn join_first(d: &mut Desktop) -> String {
    let ssid = d.available_networks()[0].ssid().to_string();
    d.connect_to_network(&ssid);
    ssid
}

#[test]
fn install_over_live_network() {
    let test_host = TestHost::new();
    let mut d = desktop(&test_host, 11);
    join_first(&mut d);

    assert_eq!(d.handle_install("paint", 10.0, Some("root")).unwrap(), InstallOutcome::Started);
    d.advance(Duration::from_millis(100));
    assert_eq!(d.job_phase("paint"), Some(InstallPhase::Downloading));

    d.advance(Duration::from_secs(600));
    assert!(d.installing_apps().is_empty());
    assert_eq!(test_host.fs.installs_of("paint"), 1);
    assert!(!d.is_app_broken("paint"));
    assert_eq!(test_host.notifier.last().unwrap().kind, NotificationKind::Success);
    assert!(test_host.usage.session_mb() >= 10.0 - 1e-6);
}

#[test]
fn download_waits_for_connection() {
    let test_host = TestHost::new();
    let mut d = desktop(&test_host, 12);
    let ssid = join_first(&mut d);

    d.handle_install("paint", 500.0, Some("root")).unwrap();
    d.advance(Duration::from_secs(1));
    d.disconnect();
    let stalled = d.installer().job("paint").unwrap().progress();

    d.advance(Duration::from_secs(120));
    assert_eq!(d.installer().job("paint").unwrap().progress(), stalled);
    assert_eq!(d.job_phase("paint"), Some(InstallPhase::Downloading));

    d.connect_to_network(&ssid);
    d.advance(Duration::from_secs(1));
    assert!(d.installer().job("paint").unwrap().progress() > stalled);
}

#[test]
fn wifi_off_refuses_scans_and_installs() {
    let test_host = TestHost::new();
    let mut d = desktop(&test_host, 13);
    join_first(&mut d);
    d.set_wifi_enabled(false);

    let err = d.scan_networks().unwrap_err();
    assert!(matches!(err, DesktopError::Net(NetError::WifiDisabled)));
    assert!(err.is_precondition());

    let err = d.handle_install("paint", 10.0, Some("root")).unwrap_err();
    assert!(matches!(err, DesktopError::Install(InstallError::NoConnection { .. })));
    assert_eq!(test_host.notifier.count(NotificationKind::Error), 1);
}

#[test]
fn cancelled_install_stays_cancelled() {
    let test_host = TestHost::new();
    let mut d = desktop(&test_host, 14);
    join_first(&mut d);

    d.handle_install("paint", 10.0, Some("root")).unwrap();
    d.advance(Duration::from_millis(350));
    assert!(d.cancel_install("paint"));

    d.advance(Duration::from_secs(3_600));
    assert!(d.installing_apps().is_empty());
    assert_eq!(test_host.fs.installs_of("paint"), 0);
}

#[test]
fn scan_lands_after_delay() {
    let test_host = TestHost::new();
    let mut d = desktop(&test_host, 15);
    d.scan_networks().unwrap();

    d.advance(Duration::from_millis(1_499));
    assert!(d.is_scanning());
    d.advance(Duration::from_millis(1));
    assert!(!d.is_scanning());
    assert_eq!(d.now(), SimTime::from_millis(1_500));
}

#[test]
fn restore_after_breakage() {
    let test_host = TestHost::new();
    let mut d = desktop(&test_host, 16);
    join_first(&mut d);
    d.handle_install("paint", 1.0, Some("admin")).unwrap();
    d.advance(Duration::from_secs(120));

    test_host.fs.memory().remove_node("/usr/bin/paint");
    assert!(d.is_app_broken("paint"));

    let err = d.handle_restore("paint", Some("user")).unwrap_err();
    assert!(err.is_precondition());
    assert!(d.is_app_broken("paint"));

    d.handle_restore("paint", Some("admin")).unwrap();
    assert!(!d.is_app_broken("paint"));

    d.handle_uninstall("paint", Some("admin")).unwrap();
    assert!(!test_host.fs.memory().is_installed("paint"));
}

#[test]
fn delegated_install_by_plain_user_is_refused() {
    let config = DesktopConfig::default().with_seed(18);
    let notes = Arc::new(RecordingNotifier::default());
    let host = memory_host(Host::in_memory().with_notifier(notes.clone()), &config.install);
    let mut d = Desktop::new(config, host).unwrap();
    join_first(&mut d);

    assert_eq!(d.handle_install("paint", 10.0, Some("user")).unwrap(), InstallOutcome::Delegated);
    assert!(!d.host().fs.is_installed("paint"));
    assert!(d.host().fs.node_at_path("/usr/bin/paint").is_none());
    assert!(!d.is_app_broken("paint"));

    assert_eq!(notes.count(NotificationKind::Error), 1);
    assert_eq!(notes.last().unwrap().title, "Permission Denied");
}

#[test]
fn completed_install_lands_in_custom_bin_dir() {
    let mut config = DesktopConfig::default().with_seed(19);
    config.install.bin_dir = "/opt/apps".to_string();
    let mut d = Desktop::in_memory(config).unwrap();
    join_first(&mut d);

    d.handle_install("paint", 2.0, Some("admin")).unwrap();
    d.advance(Duration::from_secs(300));
    assert!(d.installing_apps().is_empty());
    assert!(d.host().fs.is_installed("paint"));
    assert!(d.host().fs.node_at_path("/opt/apps/paint").unwrap().is_file());
    assert!(!d.is_app_broken("paint"));

    d.handle_uninstall("paint", Some("admin")).unwrap();
    assert!(d.host().fs.node_at_path("/opt/apps/paint").is_none());
}

#[test]
fn snapshot_serializes_camel_case() {
    let test_host = TestHost::new();
    let mut d = desktop(&test_host, 17);
    let ssid = join_first(&mut d);
    d.handle_install("paint", 10.0, Some("root")).unwrap();

    let value = serde_json::to_value(d.snapshot()).unwrap();
    assert_eq!(value["wifiEnabled"], true);
    assert_eq!(value["currentNetwork"], ssid.as_str());
    assert_eq!(value["installing"]["paint"], 0);
    assert!(value["networks"][0]["maxSpeed"].is_number());
}

#[test]
fn config_file_round_trip() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "seed = 3\n\n[network]\nscan_delay_ms = 250").unwrap();

    let config = DesktopConfig::load(file.path()).unwrap();
    assert_eq!(config.seed, Some(3));

    let test_host = TestHost::new();
    let mut d = Desktop::new(config, test_host.host()).unwrap();
    d.scan_networks().unwrap();
    d.advance(Duration::from_millis(250));
    assert!(!d.is_scanning());
}

#[test]
fn missing_config_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = DesktopConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, DesktopError::Io { .. }));
    assert!(err.is_config());
}

proptest! {
    /// The result of advancing does not depend on how the interval is cut.
    #[test]
    fn stepping_granularity_is_irrelevant(
        seed in any::<u64>(),
        steps in prop::collection::vec(1u64..700, 1..40),
    ) {
        let total: u64 = steps.iter().sum();

        let host_a = TestHost::new();
        let mut whole = desktop(&host_a, seed);
        let host_b = TestHost::new();
        let mut pieces = desktop(&host_b, seed);

        for d in [&mut whole, &mut pieces] {
            join_first(d);
            d.handle_install("paint", 3.0, Some("root")).unwrap();
            d.scan_networks().unwrap();
        }

        whole.advance(Duration::from_millis(total));
        for ms in steps {
            pieces.advance(Duration::from_millis(ms));
        }

        prop_assert_eq!(whole.snapshot(), pieces.snapshot());
        prop_assert_eq!(host_a.fs.calls(), host_b.fs.calls());
    }
}
