//! Integration tests for bus enablement and setup configuration
//!
//! These run against temp firmware files only; the orchestration steps
//! that shell out to apt/git/pip are exercised via their dry-run path in
//! `tests/dry_run_tests.rs`, not here.

use mi48_bringup::{enable_bus, BusInterface, FailurePolicy, FirmwareConfig, SetupConfig};
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;

fn seeded(content: &str) -> (NamedTempFile, FirmwareConfig) {
    let mut file = NamedTempFile::new().expect("create temp config");
    file.write_all(content.as_bytes()).expect("seed content");
    let fw = FirmwareConfig::open(file.path()).expect("open config");
    (file, fw)
}

#[test]
fn full_bus_enablement_on_fresh_config() {
    let (file, fw) = seeded("# Raspberry Pi firmware config\ndtparam=audio=on\n");

    assert!(enable_bus(&fw, BusInterface::Spi).unwrap());
    assert!(enable_bus(&fw, BusInterface::I2c).unwrap());

    let content = fs::read_to_string(file.path()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines,
        vec![
            "# Raspberry Pi firmware config",
            "dtparam=audio=on",
            "dtparam=spi=on",
            "dtoverlay=spi0-1cs",
            "dtparam=i2c_arm=on",
        ]
    );
}

#[test]
fn bus_enablement_reports_no_change_when_configured() {
    let (_file, fw) = seeded(
        "dtparam=spi=on\ndtoverlay=spi0-1cs\ndtparam=i2c_arm=on\n",
    );

    assert!(!enable_bus(&fw, BusInterface::Spi).unwrap());
    assert!(!enable_bus(&fw, BusInterface::I2c).unwrap());
}

#[test]
fn stale_zero_cs_overlay_is_replaced() {
    // Other guides enable the sensor on CE0; the MI48 reference wiring
    // uses CE1, so the old overlay must go
    let (file, fw) = seeded("dtparam=spi=on\ndtoverlay=spi0-0cs\n");

    assert!(enable_bus(&fw, BusInterface::Spi).unwrap());

    let content = fs::read_to_string(file.path()).unwrap();
    assert!(!content.contains("dtoverlay=spi0-0cs"));
    assert!(content.contains("dtoverlay=spi0-1cs"));
}

#[test]
fn enabling_one_bus_leaves_the_other_alone() {
    let (file, fw) = seeded("");
    enable_bus(&fw, BusInterface::I2c).unwrap();

    let fw_check = FirmwareConfig::open(file.path()).unwrap();
    assert!(fw_check.directive_present("dtparam=i2c_arm=on").unwrap());
    assert!(!fw_check.directive_present("dtparam=spi=on").unwrap());
}

#[test]
fn setup_config_roundtrip_preserves_policy_and_wiring() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("setup.json");

    let config = SetupConfig {
        i2c_address: 0x41,
        failure_policy: FailurePolicy::Continue,
        extra_apt_packages: vec!["python3-matplotlib".to_string()],
        ..Default::default()
    };
    config.validate().unwrap();
    config.save_to_file(&path).unwrap();

    let loaded = SetupConfig::load_from_file(&path).unwrap();
    loaded.validate().unwrap();
    assert_eq!(loaded.i2c_address, 0x41);
    assert_eq!(loaded.failure_policy, FailurePolicy::Continue);
    assert_eq!(loaded.extra_apt_packages, vec!["python3-matplotlib"]);
}

#[test]
fn setup_config_rejects_garbage_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("setup.json");
    fs::write(&path, "{not json").unwrap();
    assert!(SetupConfig::load_from_file(&path).is_err());
}

#[test]
fn verify_flow_reads_status_without_mutating() {
    use mi48_bringup::BringupStatus;

    let (file, fw) = seeded("dtparam=spi=on\ndtoverlay=spi0-1cs\ndtparam=i2c_arm=on\n");
    let before = fs::read_to_string(file.path()).unwrap();

    let config = SetupConfig::default();
    let status = BringupStatus::detect(&fw, &config).unwrap();

    // Directives are read correctly
    assert!(status.spi.directive_enabled);
    assert!(status.i2c.directive_enabled);

    // Detection never writes
    assert_eq!(fs::read_to_string(file.path()).unwrap(), before);
}
