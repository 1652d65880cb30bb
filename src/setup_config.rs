//! Setup configuration handling for saving and loading bring-up configs.
//!
//! Captures the wiring and software choices of a sensor installation so a
//! bring-up can be replayed non-interactively (`install --config`).
//! Defaults match the reference MI48 wiring: I2C bus 1 at 0x40, SPI bus 0
//! chip-select 1.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::FailurePolicy;

/// Default I2C bus number on the Pi's 40-pin header
pub const DEFAULT_I2C_BUS: u8 = 1;
/// Factory sensor address; some units ship strapped to 0x41
pub const DEFAULT_I2C_ADDRESS: u8 = 0x40;
/// Default SPI bus
pub const DEFAULT_SPI_BUS: u8 = 0;
/// Default SPI chip-select (the sensor is wired to CE1)
pub const DEFAULT_SPI_DEVICE: u8 = 1;
/// Default camera framerate passed to the streaming program
pub const DEFAULT_FPS: f64 = 7.0;
/// Upstream vendor driver repository
pub const DEFAULT_DRIVER_REPO: &str = "https://github.com/melexis/pysenxor";
/// Where the vendor driver is cloned
pub const DEFAULT_DRIVER_DIR: &str = "/usr/local/src/pysenxor";

/// Bring-up configuration that can be saved/loaded as JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupConfig {
    // Sensor wiring
    pub i2c_bus: u8,
    pub i2c_address: u8,
    pub spi_bus: u8,
    pub spi_device: u8,

    // Streaming defaults recorded for the operator
    pub framerate: f64,

    // Vendor driver
    pub driver_repo_url: String,
    pub driver_dir: PathBuf,

    // Override for the firmware config path (autodetected when None)
    pub firmware_config: Option<PathBuf>,

    // Extra packages on top of the built-in bring-up set
    pub extra_apt_packages: Vec<String>,
    pub extra_pip_packages: Vec<String>,

    // What to do when a step fails
    pub failure_policy: FailurePolicy,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            i2c_bus: DEFAULT_I2C_BUS,
            i2c_address: DEFAULT_I2C_ADDRESS,
            spi_bus: DEFAULT_SPI_BUS,
            spi_device: DEFAULT_SPI_DEVICE,
            framerate: DEFAULT_FPS,
            driver_repo_url: DEFAULT_DRIVER_REPO.to_string(),
            driver_dir: PathBuf::from(DEFAULT_DRIVER_DIR),
            firmware_config: None,
            extra_apt_packages: Vec::new(),
            extra_pip_packages: Vec::new(),
            failure_policy: FailurePolicy::Halt,
        }
    }
}

impl SetupConfig {
    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // 7-bit I2C address space, reserved ranges excluded
        if !(0x08..=0x77).contains(&self.i2c_address) {
            anyhow::bail!(
                "I2C address 0x{:02X} outside the valid range 0x08-0x77 \
                 (the MI48 uses 0x40 or 0x41)",
                self.i2c_address
            );
        }

        if self.framerate <= 0.0 || !self.framerate.is_finite() {
            anyhow::bail!("Framerate must be a positive number");
        }

        let url = self.driver_repo_url.trim();
        if url.is_empty() {
            anyhow::bail!("Driver repository URL must be specified");
        }
        if !url.starts_with("http://")
            && !url.starts_with("https://")
            && !url.starts_with("git://")
            && !url.starts_with("ssh://")
        {
            anyhow::bail!(
                "Driver repository URL must start with http://, https://, git://, or ssh://"
            );
        }

        if self.driver_dir.as_os_str().is_empty() {
            anyhow::bail!("Driver install directory must be specified");
        }

        if let Some(path) = &self.firmware_config {
            if path.as_os_str().is_empty() {
                anyhow::bail!("Firmware config override must not be empty");
            }
        }

        for pkg in self
            .extra_apt_packages
            .iter()
            .chain(self.extra_pip_packages.iter())
        {
            if pkg.trim().is_empty() || pkg.chars().any(char::is_whitespace) {
                anyhow::bail!("Package name {pkg:?} is invalid");
            }
        }

        Ok(())
    }
}
