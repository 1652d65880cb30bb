//! Vendor sensor-driver installation.
//!
//! The MI48 register protocol, frame decoding and calibration all live in
//! the vendor's pysenxor library. It is treated as an opaque collaborator:
//! cloned (or updated) from upstream and handed to pip, never modified.

use anyhow::{Context, Result};
use log::info;
use std::path::Path;

use crate::executor::{is_dry_run, run_mutating};

/// Clone or update the vendor driver repository, then install it as an
/// editable pip package so upstream fixes are a `git pull` away.
pub fn install_vendor_driver(repo_url: &str, install_dir: &Path) -> Result<()> {
    let dir = install_dir
        .to_str()
        .context("Driver install directory is not valid UTF-8")?;

    if install_dir.is_dir() {
        info!("Driver repo already cloned at {}, updating", dir);
        run_mutating("git", &["-C", dir, "pull", "--ff-only"])?
            .ensure_success("git pull (vendor driver)")?;
    } else {
        if let Some(parent) = install_dir.parent() {
            if !is_dry_run() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create {}", parent.display())
                })?;
            }
        }
        info!("Cloning vendor driver from {}", repo_url);
        run_mutating("git", &["clone", repo_url, dir])?
            .ensure_success("git clone (vendor driver)")?;
    }

    run_mutating("pip3", &["install", "-e", dir, "--break-system-packages"])?
        .ensure_success("pip3 install (vendor driver)")
}
