//! Bring-up orchestration.
//!
//! Sequences the whole installation: package index refresh, apt and pip
//! installs, firmware patching for both buses, vendor driver install and
//! a final device check. Strictly sequential, one step at a time; the
//! only state shared between steps is the firmware config file itself.
//!
//! Step failures are handled per the configured `FailurePolicy`: halt at
//! the first failure, or record it and keep going best-effort.

use anyhow::{Context, Result};
use log::{error, info, warn};
use std::cell::Cell;
use std::fmt;
use std::path::PathBuf;

use crate::devices::BringupStatus;
use crate::firmware::FirmwareConfig;
use crate::sanity;
use crate::setup_config::SetupConfig;
use crate::types::{BusInterface, DirectiveEdit, FailurePolicy};
use crate::{driver, packages};

/// Outcome of a single bring-up step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    Failed(String),
}

/// Record of one executed step.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub name: &'static str,
    pub outcome: StepOutcome,
}

impl fmt::Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            StepOutcome::Completed => write!(f, "✓ {}", self.name),
            StepOutcome::Failed(msg) => write!(f, "✗ {}: {}", self.name, msg),
        }
    }
}

/// Summary of a full bring-up run.
#[derive(Debug)]
pub struct BringupReport {
    pub steps: Vec<StepReport>,
    /// A firmware directive was actually added or removed; the new bus
    /// setup only takes effect after the next boot
    pub reboot_required: bool,
    /// Final device status (None when halted before the check)
    pub status: Option<BringupStatus>,
}

impl BringupReport {
    pub fn success(&self) -> bool {
        self.steps
            .iter()
            .all(|s| matches!(s.outcome, StepOutcome::Completed))
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepReport> {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, StepOutcome::Failed(_)))
    }
}

/// Resolve the firmware config path: explicit override first, then the
/// platform's known locations.
pub fn resolve_firmware_path(config: &SetupConfig) -> Result<PathBuf> {
    if let Some(path) = &config.firmware_config {
        return Ok(path.clone());
    }
    sanity::locate_firmware_config().context(
        "Firmware config file not found (checked /boot/firmware/config.txt and \
         /boot/config.txt); set firmware_config in the setup config",
    )
}

/// Apply the firmware edits that enable one bus. Returns whether the
/// file was actually modified (i.e. a reboot is needed).
pub fn enable_bus(firmware: &FirmwareConfig, bus: BusInterface) -> crate::error::Result<bool> {
    let mut changed = false;
    for edit in bus.directive_edits() {
        match edit {
            DirectiveEdit::Ensure { directive, anchor } => {
                changed |= firmware.ensure_directive(directive, anchor)?.changed();
            }
            DirectiveEdit::Remove { directive } => {
                changed |= firmware.remove_directive(directive)?;
            }
        }
    }
    if changed {
        info!("{bus} enabled in {}", firmware.path().display());
    } else {
        info!("{bus} already enabled in {}", firmware.path().display());
    }
    Ok(changed)
}

/// One named bring-up step, its work deferred behind a closure so the
/// runner decides what still executes after a failure.
struct Step<'a> {
    name: &'static str,
    action: Box<dyn FnOnce() -> Result<()> + 'a>,
}

/// Run the steps in order, honoring the failure policy. Returns the
/// per-step reports and whether the run halted before finishing.
fn execute_steps(steps: Vec<Step<'_>>, policy: FailurePolicy) -> (Vec<StepReport>, bool) {
    let mut reports = Vec::with_capacity(steps.len());

    for step in steps {
        match (step.action)() {
            Ok(()) => {
                info!("Step completed: {}", step.name);
                reports.push(StepReport {
                    name: step.name,
                    outcome: StepOutcome::Completed,
                });
            }
            Err(e) => {
                let msg = format!("{e:#}");
                reports.push(StepReport {
                    name: step.name,
                    outcome: StepOutcome::Failed(msg.clone()),
                });
                match policy {
                    FailurePolicy::Halt => {
                        error!("Step failed: {}: {msg}", step.name);
                        return (reports, true);
                    }
                    FailurePolicy::Continue => {
                        warn!("Step failed (continuing): {}: {msg}", step.name);
                    }
                }
            }
        }
    }

    (reports, false)
}

/// Run the full bring-up sequence.
pub fn run_bringup(config: &SetupConfig, policy: FailurePolicy) -> Result<BringupReport> {
    config.validate()?;

    let firmware_path = resolve_firmware_path(config)?;
    let firmware = FirmwareConfig::open(&firmware_path)
        .with_context(|| format!("Cannot open {}", firmware_path.display()))?;

    println!("Starting MI48 bring-up (firmware config: {})", firmware_path.display());

    // Shared across the two bus steps; set when a directive actually changed
    let reboot_required = Cell::new(false);
    let enable = |bus: BusInterface| -> Result<()> {
        let changed = enable_bus(&firmware, bus)?;
        reboot_required.set(reboot_required.get() || changed);
        Ok(())
    };

    let steps = vec![
        Step {
            name: "update package index",
            action: Box::new(packages::update_package_index),
        },
        Step {
            name: "install OS packages",
            action: Box::new(|| packages::install_apt_packages(&config.extra_apt_packages)),
        },
        Step {
            name: "install Python packages",
            action: Box::new(|| packages::install_pip_packages(&config.extra_pip_packages)),
        },
        Step {
            name: "enable SPI interface",
            action: Box::new(|| enable(BusInterface::Spi)),
        },
        Step {
            name: "enable I2C interface",
            action: Box::new(|| enable(BusInterface::I2c)),
        },
        Step {
            name: "install vendor driver",
            action: Box::new(|| {
                driver::install_vendor_driver(&config.driver_repo_url, &config.driver_dir)
            }),
        },
    ];

    let (reports, halted) = execute_steps(steps, policy);

    // Read-only status check; informational, never a step failure
    let status = if halted {
        None
    } else {
        match BringupStatus::detect(&firmware, config) {
            Ok(status) => Some(status),
            Err(e) => {
                warn!("Device verification skipped: {e:#}");
                None
            }
        }
    };

    Ok(BringupReport {
        steps: reports,
        reboot_required: reboot_required.get(),
        status,
    })
}

/// Print the human-readable run summary.
pub fn print_report(report: &BringupReport) {
    println!();
    println!("=== Bring-up summary ===");
    for step in &report.steps {
        println!("  {step}");
    }
    if let Some(status) = &report.status {
        println!();
        println!("{status}");
    }
    if report.reboot_required {
        println!();
        println!("Firmware configuration changed — reboot to activate the bus interfaces:");
        println!("  sudo reboot");
    }
    if report.success() {
        println!();
        println!("✓ Bring-up completed successfully");
    } else {
        println!();
        println!("✗ Bring-up finished with failures:");
        for step in report.failed_steps() {
            println!("  {step}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn firmware_with(content: &str) -> (NamedTempFile, FirmwareConfig) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let fw = FirmwareConfig::open(file.path()).unwrap();
        (file, fw)
    }

    #[test]
    fn test_enable_spi_from_scratch() {
        let (file, fw) = firmware_with("# config\n");
        assert!(enable_bus(&fw, BusInterface::Spi).unwrap());

        let content = fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["# config", "dtparam=spi=on", "dtoverlay=spi0-1cs"]);
    }

    #[test]
    fn test_enable_spi_removes_stale_overlay() {
        let (file, fw) = firmware_with("dtoverlay=spi0-0cs\ndtparam=spi=on\n");
        assert!(enable_bus(&fw, BusInterface::Spi).unwrap());

        let content = fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["dtparam=spi=on", "dtoverlay=spi0-1cs"]);
    }

    #[test]
    fn test_enable_bus_is_idempotent() {
        let (file, fw) = firmware_with("");
        assert!(enable_bus(&fw, BusInterface::I2c).unwrap());
        let after_once = fs::read_to_string(file.path()).unwrap();

        // Second run reports no change and leaves the file identical
        assert!(!enable_bus(&fw, BusInterface::I2c).unwrap());
        assert_eq!(fs::read_to_string(file.path()).unwrap(), after_once);
    }

    #[test]
    fn test_overlay_lands_after_enable_line() {
        let (file, fw) = firmware_with("dtparam=audio=on\ndtparam=spi=on\ndtparam=i2c_arm=on\n");
        enable_bus(&fw, BusInterface::Spi).unwrap();

        let content = fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        let spi_idx = lines.iter().position(|l| *l == "dtparam=spi=on").unwrap();
        assert_eq!(lines[spi_idx + 1], "dtoverlay=spi0-1cs");
    }

    #[test]
    fn test_resolve_firmware_path_honors_override() {
        let config = SetupConfig {
            firmware_config: Some(PathBuf::from("/tmp/custom-config.txt")),
            ..Default::default()
        };
        assert_eq!(
            resolve_firmware_path(&config).unwrap(),
            PathBuf::from("/tmp/custom-config.txt")
        );
    }

    #[test]
    fn test_halt_policy_stops_at_first_failure() {
        let ran_later_step = Cell::new(false);
        let steps = vec![
            Step {
                name: "a",
                action: Box::new(|| Ok(())),
            },
            Step {
                name: "b",
                action: Box::new(|| anyhow::bail!("boom")),
            },
            Step {
                name: "c",
                action: Box::new(|| {
                    ran_later_step.set(true);
                    Ok(())
                }),
            },
        ];

        let (reports, halted) = execute_steps(steps, FailurePolicy::Halt);
        assert!(halted);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].outcome, StepOutcome::Completed);
        assert!(matches!(reports[1].outcome, StepOutcome::Failed(_)));
        assert!(!ran_later_step.get());
    }

    #[test]
    fn test_continue_policy_runs_remaining_steps() {
        let ran_later_step = Cell::new(false);
        let steps = vec![
            Step {
                name: "a",
                action: Box::new(|| anyhow::bail!("boom")),
            },
            Step {
                name: "b",
                action: Box::new(|| {
                    ran_later_step.set(true);
                    Ok(())
                }),
            },
        ];

        let (reports, halted) = execute_steps(steps, FailurePolicy::Continue);
        assert!(!halted);
        assert_eq!(reports.len(), 2);
        assert!(matches!(reports[0].outcome, StepOutcome::Failed(_)));
        assert_eq!(reports[1].outcome, StepOutcome::Completed);
        assert!(ran_later_step.get());
    }

    #[test]
    fn test_failure_message_carries_error_chain() {
        let steps = vec![Step {
            name: "install OS packages",
            action: Box::new(|| {
                Err(anyhow::anyhow!("exit code 100")).context("apt-get install")
            }),
        }];

        let (reports, _) = execute_steps(steps, FailurePolicy::Halt);
        match &reports[0].outcome {
            StepOutcome::Failed(msg) => {
                assert!(msg.contains("apt-get install"));
                assert!(msg.contains("exit code 100"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_report_success_and_failed_steps() {
        let report = BringupReport {
            steps: vec![
                StepReport {
                    name: "a",
                    outcome: StepOutcome::Completed,
                },
                StepReport {
                    name: "b",
                    outcome: StepOutcome::Failed("boom".to_string()),
                },
            ],
            reboot_required: false,
            status: None,
        };
        assert!(!report.success());
        assert_eq!(report.failed_steps().count(), 1);

        let ok = BringupReport {
            steps: vec![StepReport {
                name: "a",
                outcome: StepOutcome::Completed,
            }],
            reboot_required: true,
            status: None,
        };
        assert!(ok.success());
    }

    #[test]
    fn test_step_report_display() {
        let ok = StepReport {
            name: "enable SPI interface",
            outcome: StepOutcome::Completed,
        };
        assert_eq!(ok.to_string(), "✓ enable SPI interface");

        let bad = StepReport {
            name: "install OS packages",
            outcome: StepOutcome::Failed("apt-get update failed".to_string()),
        };
        assert!(bad.to_string().contains("✗ install OS packages"));
    }
}
