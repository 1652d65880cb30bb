//! MI48 Bring-up Library
//!
//! Core functionality for installing and configuring the MI48 thermal
//! camera sensor stack on a Raspberry Pi: firmware config patching,
//! package installation sequencing, vendor driver install and device
//! verification.

pub mod bringup;
pub mod cli;
pub mod devices;
pub mod driver;
pub mod error;
pub mod executor;
pub mod firmware;
pub mod packages;
pub mod process_guard;
pub mod sanity;
pub mod setup_config;
pub mod types;

// Re-export main types for convenience
pub use bringup::{enable_bus, run_bringup, BringupReport, StepOutcome, StepReport};
pub use devices::{expected_nodes, probe_sensor, BringupStatus, BusStatus};
pub use error::{BringupError, Result};
pub use executor::{enable_dry_run, is_dry_run, CommandOutput};
pub use firmware::{FirmwareConfig, PatchOutcome};
pub use process_guard::{ChildRegistry, CommandProcessGroup, ProcessGuard};
pub use setup_config::SetupConfig;
pub use types::{BusInterface, DirectiveEdit, FailurePolicy};
