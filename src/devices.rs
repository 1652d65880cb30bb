//! Device node verification.
//!
//! Once a bus is enabled in firmware (and the Pi rebooted), the OS
//! exposes character devices for it. This module performs read-only
//! checks: are the enable directives in place, do the device nodes
//! exist, and does the sensor answer on its I2C address. Used by the
//! `verify` flow and the post-install summary.

use anyhow::Result;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::executor::run_probe;
use crate::firmware::FirmwareConfig;
use crate::setup_config::SetupConfig;
use crate::types::BusInterface;

/// Expected device nodes for a bus given the configured wiring.
pub fn expected_nodes(bus: BusInterface, config: &SetupConfig) -> Vec<PathBuf> {
    match bus {
        BusInterface::Spi => vec![PathBuf::from(format!(
            "/dev/spidev{}.{}",
            config.spi_bus, config.spi_device
        ))],
        BusInterface::I2c => vec![PathBuf::from(format!("/dev/i2c-{}", config.i2c_bus))],
    }
}

/// Verification result for one bus.
#[derive(Debug, Clone)]
pub struct BusStatus {
    pub interface: BusInterface,
    /// Enable directive found in the firmware config
    pub directive_enabled: bool,
    pub present_nodes: Vec<PathBuf>,
    pub missing_nodes: Vec<PathBuf>,
}

impl BusStatus {
    pub fn is_ready(&self) -> bool {
        self.directive_enabled && self.missing_nodes.is_empty()
    }
}

impl fmt::Display for BusStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let directive = if self.directive_enabled {
            "enabled"
        } else {
            "disabled"
        };
        write!(f, "{}: firmware {}", self.interface, directive)?;
        for node in &self.present_nodes {
            write!(f, ", {} present", node.display())?;
        }
        for node in &self.missing_nodes {
            write!(f, ", {} MISSING", node.display())?;
        }
        Ok(())
    }
}

/// Aggregated verification results.
#[derive(Debug, Clone)]
pub struct BringupStatus {
    pub spi: BusStatus,
    pub i2c: BusStatus,
    /// Sensor answered on its configured address; None if the probe
    /// could not run (i2cdetect missing or bus absent)
    pub sensor_detected: Option<bool>,
}

impl BringupStatus {
    /// Collect the full read-only status report. Never mutates anything
    /// and does not require root.
    pub fn detect(firmware: &FirmwareConfig, config: &SetupConfig) -> Result<Self> {
        let spi = bus_status(BusInterface::Spi, firmware, config)?;
        let i2c = bus_status(BusInterface::I2c, firmware, config)?;

        // Probing only makes sense once the I2C node exists
        let sensor_detected = if i2c.missing_nodes.is_empty() {
            probe_sensor(config.i2c_bus, config.i2c_address).ok()
        } else {
            None
        };

        log::info!(
            "Bring-up status: spi ready={}, i2c ready={}, sensor={:?}",
            spi.is_ready(),
            i2c.is_ready(),
            sensor_detected
        );

        Ok(Self {
            spi,
            i2c,
            sensor_detected,
        })
    }

    pub fn all_ready(&self) -> bool {
        self.spi.is_ready() && self.i2c.is_ready()
    }
}

impl fmt::Display for BringupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.spi)?;
        writeln!(f, "{}", self.i2c)?;
        match self.sensor_detected {
            Some(true) => write!(f, "sensor: responding"),
            Some(false) => write!(f, "sensor: no response (check wiring/address)"),
            None => write!(f, "sensor: not probed"),
        }
    }
}

fn bus_status(
    bus: BusInterface,
    firmware: &FirmwareConfig,
    config: &SetupConfig,
) -> Result<BusStatus> {
    let directive_enabled = firmware.directive_present(bus.enable_directive())?;

    let (present_nodes, missing_nodes) = expected_nodes(bus, config)
        .into_iter()
        .partition(|node: &PathBuf| Path::new(node).exists());

    Ok(BusStatus {
        interface: bus,
        directive_enabled,
        present_nodes,
        missing_nodes,
    })
}

/// Probe the I2C bus for the sensor address using i2cdetect.
pub fn probe_sensor(bus: u8, address: u8) -> Result<bool> {
    let bus_arg = bus.to_string();
    let output = run_probe("i2cdetect", &["-y", &bus_arg])?;
    output.ensure_success("i2cdetect")?;
    Ok(scan_contains_address(&output.stdout, address))
}

/// Parse i2cdetect table output for a responding address.
///
/// Each data row is `ROW: xx xx ...` where a responding device shows its
/// hex address and `--` marks silence. `UU` (claimed by a kernel driver)
/// is not counted as a response; nothing should claim the sensor address.
fn scan_contains_address(scan: &str, address: u8) -> bool {
    let needle = format!("{:02x}", address);
    scan.lines()
        .filter_map(|line| line.split_once(':'))
        .flat_map(|(_, cells)| cells.split_whitespace())
        .any(|cell| cell.eq_ignore_ascii_case(&needle))
}
