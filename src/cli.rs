use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// MI48 Bring-up - thermal camera installation helper for Raspberry Pi
#[derive(Parser)]
#[command(name = "mi48-bringup")]
#[command(about = "Installs and configures the MI48 thermal camera sensor stack")]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: show what would be executed without making changes.
    ///
    /// Mutating operations (package installs, firmware edits, driver
    /// clone) are skipped and logged. Read-only probes (device nodes,
    /// i2cdetect) still execute so the preview is realistic.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Keep running remaining steps after a step fails (best-effort mode)
    #[arg(long, global = true)]
    pub continue_on_error: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full bring-up sequence (default when no command is given)
    Install {
        /// Path to a saved setup configuration to use
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the effective configuration to file and exit without installing
        #[arg(long)]
        save_config: Option<PathBuf>,
    },
    /// Enable one bus interface in the firmware configuration
    Enable {
        /// Bus to enable (spi or i2c)
        bus: String,

        /// Firmware config file (autodetected when omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Read-only verification: directives, device nodes, sensor probe
    Verify {
        /// Path to a saved setup configuration to use
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Guarantee a single directive line is present in the firmware config
    Patch {
        /// Directive line to ensure, e.g. "dtparam=spi=on"
        #[arg(short, long)]
        directive: String,

        /// Insert immediately after this existing directive when absent
        #[arg(short, long)]
        anchor: Option<String>,

        /// Firmware config file (autodetected when omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Remove a directive line from the firmware config
    Remove {
        /// Directive line to remove, e.g. "dtoverlay=spi0-0cs"
        #[arg(short, long)]
        directive: String,

        /// Firmware config file (autodetected when omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Validate a saved setup configuration file
    Validate {
        /// Path to configuration file to validate
        config: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
