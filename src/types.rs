//! Shared type-safe enums for the bring-up helper.
//!
//! Uses strum for string conversions so CLI parsing and config files
//! share a single source of truth with compile-time validation.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A hardware bus interface that must be enabled in firmware
/// configuration before the OS exposes a device node for it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BusInterface {
    /// SPI bus — carries the thermal frame data
    Spi,
    /// I2C bus — carries sensor control/register traffic
    I2c,
}

/// One firmware directive edit required to enable a bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveEdit {
    /// Guarantee the directive is present, optionally anchored after
    /// another directive.
    Ensure {
        directive: &'static str,
        anchor: Option<&'static str>,
    },
    /// Guarantee the directive is absent (stale overlay cleanup).
    Remove { directive: &'static str },
}

impl BusInterface {
    /// The primary enable directive for this bus.
    pub fn enable_directive(self) -> &'static str {
        match self {
            Self::Spi => "dtparam=spi=on",
            Self::I2c => "dtparam=i2c_arm=on",
        }
    }

    /// The full set of firmware edits required to bring this bus up.
    ///
    /// SPI additionally needs the single-chip-select overlay (the sensor
    /// is wired to CE1) and must not carry the zero-chip-select overlay
    /// left behind by other guides.
    pub fn directive_edits(self) -> Vec<DirectiveEdit> {
        match self {
            Self::Spi => vec![
                DirectiveEdit::Ensure {
                    directive: "dtparam=spi=on",
                    anchor: None,
                },
                DirectiveEdit::Ensure {
                    directive: "dtoverlay=spi0-1cs",
                    anchor: Some("dtparam=spi=on"),
                },
                DirectiveEdit::Remove {
                    directive: "dtoverlay=spi0-0cs",
                },
            ],
            Self::I2c => vec![DirectiveEdit::Ensure {
                directive: "dtparam=i2c_arm=on",
                anchor: None,
            }],
        }
    }
}

/// What to do when a bring-up step fails.
///
/// The reference shell installer silently continued after some failed
/// steps; rather than baking in either behavior this is an explicit,
/// operator-selectable policy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, Default,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failed step (default)
    #[default]
    Halt,
    /// Record the failure and run the remaining steps best-effort
    Continue,
}
