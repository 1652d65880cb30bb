//! External command execution
//!
//! This module provides the ONLY sanctioned way to invoke the external
//! collaborators (apt-get, git, pip3, i2cdetect). All execution goes
//! through here to ensure:
//!
//! - Process group isolation and PID registration for cleanup
//! - Captured stdout/stderr with a uniform `CommandOutput`
//! - Dry-run handling: mutating commands are logged and skipped, while
//!   read-only probes still execute so previews stay realistic

use crate::process_guard::{ChildRegistry, CommandProcessGroup};
use anyhow::{Context, Result};
use log::info;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};

/// Global dry-run flag, set once from the CLI before any step runs.
static DRY_RUN: AtomicBool = AtomicBool::new(false);

/// Enable dry-run mode: mutating commands are logged but not executed.
pub fn enable_dry_run() {
    DRY_RUN.store(true, Ordering::SeqCst);
}

/// Check whether dry-run mode is active.
pub fn is_dry_run() -> bool {
    DRY_RUN.load(Ordering::SeqCst)
}

/// Output from an external command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Standard output from the command.
    pub stdout: String,
    /// Standard error from the command.
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    /// Whether the command exited successfully (exit code 0).
    pub success: bool,
}

impl CommandOutput {
    /// Check that the command succeeded and return an error if not.
    pub fn ensure_success(&self, context: &str) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            let code = self.exit_code.unwrap_or(-1);
            anyhow::bail!(
                "{} failed (exit code {}): {}",
                context,
                code,
                self.stderr.trim()
            )
        }
    }

    /// Synthetic success for steps skipped in dry-run mode.
    fn skipped() -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: Some(0),
            success: true,
        }
    }
}

/// Run a command that mutates system state (installs packages, clones
/// repositories). Skipped entirely in dry-run mode.
pub fn run_mutating(program: &str, args: &[&str]) -> Result<CommandOutput> {
    if is_dry_run() {
        info!("[dry-run] would execute: {} {}", program, args.join(" "));
        println!("[dry-run] {} {}", program, args.join(" "));
        return Ok(CommandOutput::skipped());
    }
    run(program, args)
}

/// Run a read-only probe (dpkg -s, i2cdetect, which). Always executes,
/// even in dry-run mode.
pub fn run_probe(program: &str, args: &[&str]) -> Result<CommandOutput> {
    run(program, args)
}

fn run(program: &str, args: &[&str]) -> Result<CommandOutput> {
    info!("executing: {} {}", program, args.join(" "));

    let child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(Stdio::null())
        .in_new_process_group()
        .spawn()
        .with_context(|| format!("Failed to spawn {}", program))?;
    let pid = child.id();

    // Register PID for cleanup on parent exit
    {
        let registry = ChildRegistry::global();
        let mut guard = registry.lock().expect("ChildRegistry mutex poisoned");
        guard.register(pid);
    }

    let output = child
        .wait_with_output()
        .with_context(|| format!("Failed waiting for {}", program))?;

    {
        let registry = ChildRegistry::global();
        let mut guard = registry.lock().expect("ChildRegistry mutex poisoned");
        guard.unregister(pid);
    }

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code();
    let success = output.status.success();

    if success {
        info!("{} completed successfully", program);
    } else {
        info!(
            "{} failed with exit code {}",
            program,
            exit_code.unwrap_or(-1)
        );
    }

    Ok(CommandOutput {
        stdout,
        stderr,
        exit_code,
        success,
    })
}

/// Check if a binary is available in PATH.
pub fn binary_exists(name: &str) -> bool {
    run_probe("which", &[name])
        .map(|output| output.success)
        .unwrap_or(false)
}
