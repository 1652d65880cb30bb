//! Dry-run behavior tests
//!
//! The dry-run flag is process-global, so these live in their own test
//! binary: every test here runs with dry-run enabled and asserts that
//! nothing on disk changes while outcomes are still previewed.

use mi48_bringup::{
    enable_bus, enable_dry_run, BusInterface, FirmwareConfig, PatchOutcome,
};
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;

fn seeded(content: &str) -> (NamedTempFile, FirmwareConfig) {
    enable_dry_run();
    let mut file = NamedTempFile::new().expect("create temp config");
    file.write_all(content.as_bytes()).expect("seed content");
    let fw = FirmwareConfig::open(file.path()).expect("open config");
    (file, fw)
}

#[test]
fn ensure_directive_previews_without_writing() {
    let (file, fw) = seeded("dtparam=spi=on\n");
    let before = fs::read_to_string(file.path()).unwrap();

    let outcome = fw
        .ensure_directive("dtoverlay=spi0-1cs", Some("dtparam=spi=on"))
        .unwrap();

    // Outcome reflects what would happen, the file stays untouched
    assert_eq!(outcome, PatchOutcome::InsertedAfterAnchor);
    assert_eq!(fs::read_to_string(file.path()).unwrap(), before);
}

#[test]
fn remove_directive_previews_without_writing() {
    let (file, fw) = seeded("dtoverlay=spi0-0cs\n");
    let before = fs::read_to_string(file.path()).unwrap();

    assert!(fw.remove_directive("dtoverlay=spi0-0cs").unwrap());
    assert_eq!(fs::read_to_string(file.path()).unwrap(), before);
}

#[test]
fn enable_bus_previews_reboot_requirement() {
    let (file, fw) = seeded("# fresh config\n");
    let before = fs::read_to_string(file.path()).unwrap();

    // Reports that a change would happen so the reboot notice still shows
    assert!(enable_bus(&fw, BusInterface::Spi).unwrap());
    assert_eq!(fs::read_to_string(file.path()).unwrap(), before);
}

#[test]
fn vendor_driver_install_touches_nothing() {
    enable_dry_run();
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("vendor/pysenxor");

    mi48_bringup::driver::install_vendor_driver("https://github.com/melexis/pysenxor", &target)
        .unwrap();

    // Neither the clone nor the parent directory may exist
    assert!(!target.exists());
    assert!(!target.parent().unwrap().exists());
}

#[test]
fn read_only_checks_still_work() {
    let (_file, fw) = seeded("dtparam=i2c_arm=on\n");
    assert!(fw.directive_present("dtparam=i2c_arm=on").unwrap());
    assert!(!fw.directive_present("dtparam=spi=on").unwrap());
}
