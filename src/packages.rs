//! OS and Python package installation for the sensor stack.
//!
//! The package manager and pip are external collaborators; this module
//! only sequences them. Raspberry Pi OS Bookworm marks the system Python
//! as externally managed, so pip installs use `--break-system-packages`
//! (matching the vendor's own instructions).

use anyhow::Result;
use log::info;

use crate::executor::{run_mutating, run_probe};

/// OS packages required before the Python stack can be installed
pub const APT_PACKAGES: &[&str] = &[
    "python3-pip",
    "python3-numpy",
    "python3-opencv",
    "i2c-tools",
    "git",
];

/// Python packages for bus access and GPIO on the Pi 5
pub const PIP_PACKAGES: &[&str] = &["smbus2", "spidev", "gpiozero", "lgpio"];

/// Refresh the apt package index.
pub fn update_package_index() -> Result<()> {
    run_mutating("apt-get", &["update"])?.ensure_success("apt-get update")
}

/// Install the bring-up apt package set plus any extras. Packages dpkg
/// already reports installed are skipped, keeping reruns fast and quiet.
pub fn install_apt_packages(extra: &[String]) -> Result<()> {
    let candidates: Vec<&str> = APT_PACKAGES
        .iter()
        .copied()
        .chain(extra.iter().map(String::as_str))
        .collect();
    let missing = select_missing(&candidates, package_installed);

    if missing.is_empty() {
        info!("All {} apt packages already installed", candidates.len());
        return Ok(());
    }

    info!("Installing {} apt package(s)", missing.len());
    let mut args = vec!["install", "-y"];
    args.extend_from_slice(&missing);
    run_mutating("apt-get", &args)?.ensure_success("apt-get install")
}

/// Filter the candidate list down to packages `installed` does not report.
fn select_missing<'a>(candidates: &[&'a str], installed: impl Fn(&str) -> bool) -> Vec<&'a str> {
    candidates
        .iter()
        .copied()
        .filter(|pkg| !installed(pkg))
        .collect()
}

/// Install the Python dependency set plus any extras.
pub fn install_pip_packages(extra: &[String]) -> Result<()> {
    let mut args = vec!["install", "--break-system-packages"];
    args.extend_from_slice(PIP_PACKAGES);
    args.extend(extra.iter().map(String::as_str));

    info!("Installing {} pip package(s)", args.len() - 2);
    run_mutating("pip3", &args)?.ensure_success("pip3 install")
}

/// Read-only check whether a Debian package is installed.
pub fn package_installed(name: &str) -> bool {
    run_probe("dpkg", &["-s", name])
        .map(|output| output.success)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apt_set_covers_bus_tooling() {
        assert!(APT_PACKAGES.contains(&"i2c-tools"));
        assert!(APT_PACKAGES.contains(&"git"));
        assert!(APT_PACKAGES.contains(&"python3-pip"));
    }

    #[test]
    fn test_pip_set_covers_bus_bindings() {
        assert!(PIP_PACKAGES.contains(&"smbus2"));
        assert!(PIP_PACKAGES.contains(&"spidev"));
        assert!(PIP_PACKAGES.contains(&"lgpio"));
    }

    #[test]
    fn test_select_missing_skips_installed_packages() {
        let candidates = ["git", "python3-pip", "i2c-tools"];
        let missing = select_missing(&candidates, |pkg| pkg == "git");
        assert_eq!(missing, vec!["python3-pip", "i2c-tools"]);
    }

    #[test]
    fn test_select_missing_empty_when_all_installed() {
        let candidates = ["git", "python3-pip"];
        assert!(select_missing(&candidates, |_| true).is_empty());
    }

    #[test]
    fn test_package_installed_nonexistent() {
        // dpkg may be missing on non-Debian test hosts; both outcomes
        // map to "not installed"
        assert!(!package_installed("this-package-does-not-exist-12345"));
    }
}
