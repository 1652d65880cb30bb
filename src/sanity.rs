//! Pre-flight sanity checks for runtime environment
//!
//! Verifies the system environment before any mutating step runs:
//! - Required runtime binaries are present
//! - Running with root privileges (EUID 0)
//! - The firmware configuration file exists
//!
//! If any check fails, the program exits with a clear error message
//! before anything is modified.

use std::path::{Path, PathBuf};

use crate::executor::binary_exists;

/// Candidate firmware config locations, newest image layout first.
/// Raspberry Pi OS Bookworm moved the file under /boot/firmware.
pub const FIRMWARE_CONFIG_CANDIDATES: &[&str] =
    &["/boot/firmware/config.txt", "/boot/config.txt"];

/// Required runtime binaries for the bring-up
const REQUIRED_BINARIES: &[&str] = &[
    "apt-get", // OS package installation
    "git",     // Vendor driver clone
    "pip3",    // Python dependency installation
];

/// Optional binaries (warn if missing but don't fail)
const OPTIONAL_BINARIES: &[&str] = &[
    "i2cdetect", // Sensor address probe (i2c-tools, installed by the bring-up itself)
];

/// Result of environment verification
#[derive(Debug)]
pub struct SanityCheckResult {
    pub missing_binaries: Vec<String>,
    pub is_root: bool,
    pub firmware_config: Option<PathBuf>,
}

impl SanityCheckResult {
    /// Returns true if all checks passed
    pub fn is_ok(&self) -> bool {
        self.missing_binaries.is_empty() && self.is_root && self.firmware_config.is_some()
    }
}

/// Locate the firmware config file on this system.
pub fn locate_firmware_config() -> Option<PathBuf> {
    FIRMWARE_CONFIG_CANDIDATES
        .iter()
        .map(Path::new)
        .find(|p| p.is_file())
        .map(Path::to_path_buf)
}

/// Check if running as root (EUID 0)
fn is_running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Perform all sanity checks and return the result.
///
/// `firmware_override` is the operator-supplied config path (`--file` or
/// the `firmware_config` field of the setup config); when given it
/// replaces the candidate-path autodetection.
pub fn verify_environment(firmware_override: Option<&Path>) -> SanityCheckResult {
    let mut missing = Vec::new();

    for binary in REQUIRED_BINARIES {
        if !binary_exists(binary) {
            missing.push((*binary).to_string());
        }
    }

    for binary in OPTIONAL_BINARIES {
        if !binary_exists(binary) {
            log::debug!(
                "Optional binary not found: {} (installed later by the bring-up)",
                binary
            );
        }
    }

    let firmware_config = match firmware_override {
        Some(path) => path.is_file().then(|| path.to_path_buf()),
        None => locate_firmware_config(),
    };

    SanityCheckResult {
        missing_binaries: missing,
        is_root: is_running_as_root(),
        firmware_config,
    }
}

/// Print a pretty error message to stderr and exit
pub fn print_error_and_exit(result: &SanityCheckResult) -> ! {
    eprintln!();
    eprintln!("╔══════════════════════════════════════════════════════════════════╗");
    eprintln!("║           MI48 Bring-up - Pre-flight Check Failed                ║");
    eprintln!("╚══════════════════════════════════════════════════════════════════╝");
    eprintln!();

    if !result.is_root {
        eprintln!("❌ ERROR: Root privileges required");
        eprintln!("   Editing the firmware config and installing packages requires root.");
        eprintln!();
        eprintln!("   Solution: Run with sudo:");
        eprintln!("     sudo mi48-bringup install");
        eprintln!();
    }

    if !result.missing_binaries.is_empty() {
        eprintln!("❌ ERROR: Missing required binaries");
        eprintln!();
        for binary in &result.missing_binaries {
            let package = get_package_for_binary(binary);
            eprintln!("   • {} (install: apt install {})", binary, package);
        }
        eprintln!();
        eprintln!("   Solution: Install missing packages:");
        let packages: Vec<&str> = result
            .missing_binaries
            .iter()
            .map(|b| get_package_for_binary(b))
            .collect();
        eprintln!("     apt install {}", packages.join(" "));
        eprintln!();
    }

    if result.firmware_config.is_none() {
        eprintln!("❌ ERROR: Firmware config file not found");
        eprintln!("   Checked:");
        for candidate in FIRMWARE_CONFIG_CANDIDATES {
            eprintln!("   • {}", candidate);
        }
        eprintln!();
        eprintln!("   Is this a Raspberry Pi? On other boards, pass the path explicitly");
        eprintln!("   with --file or the firmware_config field of the setup config.");
        eprintln!();
    }

    eprintln!("╔══════════════════════════════════════════════════════════════════╗");
    eprintln!("║  Fix the above issues and try again.                             ║");
    eprintln!("╚══════════════════════════════════════════════════════════════════╝");
    eprintln!();

    std::process::exit(1);
}

/// Map binary names to their Debian package names
fn get_package_for_binary(binary: &str) -> &'static str {
    match binary {
        "apt-get" => "apt",
        "git" => "git",
        "pip3" => "python3-pip",
        "i2cdetect" => "i2c-tools",
        _ => "unknown", // Fallback for unknown binaries
    }
}

/// Skip root check (for development/testing)
/// Set MI48_BRINGUP_SKIP_ROOT_CHECK=1 to skip
pub fn should_skip_root_check() -> bool {
    std::env::var("MI48_BRINGUP_SKIP_ROOT_CHECK")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false)
}

/// Run pre-flight checks with optional root check skip. An explicit
/// firmware config path bypasses the candidate-path autodetection.
pub fn run_preflight_checks(skip_root: bool, firmware_override: Option<&Path>) {
    log::debug!("Running pre-flight sanity checks (skip_root={})...", skip_root);

    let mut result = verify_environment(firmware_override);

    if skip_root || should_skip_root_check() {
        log::warn!("Root check skipped (MI48_BRINGUP_SKIP_ROOT_CHECK=1)");
        result.is_root = true;
    }

    if !result.is_ok() {
        print_error_and_exit(&result);
    }

    log::info!(
        "Pre-flight checks passed: root={}, firmware config at {:?}",
        result.is_root,
        result.firmware_config
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_mapping() {
        assert_eq!(get_package_for_binary("pip3"), "python3-pip");
        assert_eq!(get_package_for_binary("i2cdetect"), "i2c-tools");
        assert_eq!(get_package_for_binary("git"), "git");
    }

    #[test]
    fn test_sanity_result_is_ok() {
        let ok_result = SanityCheckResult {
            missing_binaries: vec![],
            is_root: true,
            firmware_config: Some(PathBuf::from("/boot/firmware/config.txt")),
        };
        assert!(ok_result.is_ok());

        let missing_binary = SanityCheckResult {
            missing_binaries: vec!["git".to_string()],
            is_root: true,
            firmware_config: Some(PathBuf::from("/boot/firmware/config.txt")),
        };
        assert!(!missing_binary.is_ok());

        let not_root = SanityCheckResult {
            missing_binaries: vec![],
            is_root: false,
            firmware_config: Some(PathBuf::from("/boot/firmware/config.txt")),
        };
        assert!(!not_root.is_ok());

        let no_config = SanityCheckResult {
            missing_binaries: vec![],
            is_root: true,
            firmware_config: None,
        };
        assert!(!no_config.is_ok());
    }

    #[test]
    fn test_override_path_satisfies_firmware_check() {
        use std::io::Write;

        // An explicit config path counts even when /boot has no config.txt
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dtparam=spi=on").unwrap();

        let result = verify_environment(Some(file.path()));
        assert_eq!(result.firmware_config.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_missing_override_path_fails_firmware_check() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("config.txt");

        let result = verify_environment(Some(&missing));
        assert_eq!(result.firmware_config, None);
    }

    #[test]
    fn test_candidates_prefer_bookworm_layout() {
        assert_eq!(
            FIRMWARE_CONFIG_CANDIDATES[0],
            "/boot/firmware/config.txt"
        );
    }
}
