//! MI48 Bring-up - Main entry point
//!
//! Sequences OS package installation, firmware bus enablement and vendor
//! driver installation for the MI48 thermal camera on a Raspberry Pi.

mod bringup;
mod cli;
mod devices;
mod driver;
mod error;
mod executor;
mod firmware;
mod packages;
mod process_guard;
mod sanity;
mod setup_config;
mod types;

use log::{debug, error, info};
use std::path::PathBuf;
use std::str::FromStr;

use crate::bringup::resolve_firmware_path;
use crate::cli::{Cli, Commands};
use crate::devices::BringupStatus;
use crate::firmware::{FirmwareConfig, PatchOutcome};
use crate::setup_config::SetupConfig;
use crate::types::{BusInterface, FailurePolicy};

/// Initialize the logger with appropriate settings
fn init_logger() {
    use env_logger::Builder;
    use std::io::Write;

    Builder::from_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}:{}] {}",
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(log::LevelFilter::Info)
        .parse_default_env() // Allows RUST_LOG env var to override
        .init();
}

/// Main application entry point
fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    info!("MI48 bring-up helper starting up");

    // Ensure apt/git/pip children are terminated if we receive a signal
    if let Err(e) = process_guard::init_signal_handlers() {
        log::warn!("Failed to initialize signal handlers: {}", e);
        // Continue anyway - cleanup will still work via Drop
    }
    debug!("Signal handlers initialized");

    let cli = Cli::parse_args();
    debug!("CLI arguments parsed");

    if cli.dry_run {
        executor::enable_dry_run();
        println!("── dry-run mode: no changes will be made ──");
    }

    let policy = if cli.continue_on_error {
        FailurePolicy::Continue
    } else {
        FailurePolicy::Halt
    };

    match cli.command {
        Some(Commands::Validate { config }) => {
            info!("Validating configuration file: {:?}", config);
            match SetupConfig::load_from_file(&config) {
                Ok(setup) => match setup.validate() {
                    Ok(_) => {
                        info!("Configuration validation successful");
                        println!("✓ Configuration file is valid: {:?}", config);
                    }
                    Err(e) => {
                        error!("Configuration validation failed: {}", e);
                        eprintln!("✗ Configuration validation failed: {}", e);
                        std::process::exit(1);
                    }
                },
                Err(e) => {
                    error!("Failed to load configuration file: {}", e);
                    eprintln!("✗ Failed to load configuration file: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Verify { config }) => {
            // Read-only; works without root
            let setup = load_setup(config)?;
            let path = resolve_firmware_path(&setup)?;
            let fw = FirmwareConfig::open(&path)?;
            let status = BringupStatus::detect(&fw, &setup)?;
            println!("Firmware config: {}", path.display());
            println!("{status}");
            if !status.all_ready() {
                println!();
                println!("Some interfaces are not ready. If you just ran the installer,");
                println!("a reboot is required before the device nodes appear.");
            }
        }
        Some(Commands::Enable { bus, file }) => {
            let bus: BusInterface = BusInterface::from_str(&bus).unwrap_or_else(|_| {
                eprintln!("❌ Unknown bus interface: {}", bus);
                eprintln!("   Valid interfaces: spi, i2c");
                std::process::exit(1);
            });
            if !cli.dry_run {
                sanity::run_preflight_checks(false, file.as_deref());
            }
            let path = firmware_path_or_detected(file)?;
            let fw = FirmwareConfig::open(&path)?;
            let changed = bringup::enable_bus(&fw, bus)?;
            if changed {
                println!("✓ {} enabled in {} — reboot to activate", bus, path.display());
            } else {
                println!("✓ {} already enabled in {}", bus, path.display());
            }
        }
        Some(Commands::Patch {
            directive,
            anchor,
            file,
        }) => {
            let path = firmware_path_or_detected(file)?;
            let fw = FirmwareConfig::open(&path)?;
            let outcome = fw.ensure_directive(&directive, anchor.as_deref())?;
            match outcome {
                PatchOutcome::AlreadyPresent => {
                    println!("✓ {:?} already present in {}", directive, path.display());
                }
                PatchOutcome::InsertedAfterAnchor => {
                    println!(
                        "✓ {:?} inserted after {:?} in {}",
                        directive,
                        anchor.as_deref().unwrap_or_default(),
                        path.display()
                    );
                }
                PatchOutcome::Appended => {
                    println!("✓ {:?} appended to {}", directive, path.display());
                }
            }
        }
        Some(Commands::Remove { directive, file }) => {
            let path = firmware_path_or_detected(file)?;
            let fw = FirmwareConfig::open(&path)?;
            if fw.remove_directive(&directive)? {
                println!("✓ {:?} removed from {}", directive, path.display());
            } else {
                println!("✓ {:?} was not present in {}", directive, path.display());
            }
        }
        Some(Commands::Install {
            config,
            save_config,
        }) => {
            let setup = load_setup(config)?;

            if let Some(save_path) = save_config {
                setup.save_to_file(&save_path)?;
                println!("✓ Configuration saved to {}", save_path.display());
                println!(
                    "  Run: sudo mi48-bringup install --config {}",
                    save_path.display()
                );
                return Ok(());
            }

            run_install(&setup, policy, cli.dry_run)?;
        }
        None => {
            info!("No command specified, running full bring-up");
            let setup = SetupConfig::default();
            run_install(&setup, policy, cli.dry_run)?;
        }
    }

    Ok(())
}

/// Load a setup config from file, or fall back to the wiring defaults.
fn load_setup(path: Option<PathBuf>) -> Result<SetupConfig, Box<dyn std::error::Error>> {
    let setup = match path {
        Some(path) => {
            info!("Loading setup configuration from {:?}", path);
            let setup = SetupConfig::load_from_file(&path)?;
            setup.validate()?;
            setup
        }
        None => SetupConfig::default(),
    };
    Ok(setup)
}

/// Explicit --file argument wins; otherwise detect the platform path.
fn firmware_path_or_detected(
    file: Option<PathBuf>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(path) = file {
        return Ok(path);
    }
    sanity::locate_firmware_config().ok_or_else(|| {
        error::BringupError::config(
            "firmware config file not found; pass --file explicitly",
        )
        .into()
    })
}

/// Run the full bring-up and report, honoring the failure policy.
fn run_install(
    setup: &SetupConfig,
    cli_policy: FailurePolicy,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    // CLI flag overrides the policy recorded in the config file
    let policy = if cli_policy == FailurePolicy::Continue {
        FailurePolicy::Continue
    } else {
        setup.failure_policy
    };

    if !dry_run {
        sanity::run_preflight_checks(false, setup.firmware_config.as_deref());
    }

    let _guard = process_guard::ProcessGuard::new();
    let report = bringup::run_bringup(setup, policy)?;
    bringup::print_report(&report);

    if !report.success() {
        std::process::exit(1);
    }
    Ok(())
}
