//! Firmware configuration patcher.
//!
//! The Raspberry Pi firmware loader reads a line-oriented config file
//! (`/boot/firmware/config.txt` on Bookworm, `/boot/config.txt` on older
//! images) made of `key=value`/bare-key directives, `#` comments and blank
//! lines. Enabling a bus interface means guaranteeing specific directive
//! lines exist in that file, exactly once, optionally right after an
//! anchor directive.
//!
//! All edits are line-wise and idempotent: the file is never recreated or
//! truncated, unrelated lines keep their content and order, the file's
//! line-terminator style (LF, or CRLF from SD cards edited on Windows) is
//! kept, and re-running a patch with the directive already present is a
//! no-op. No backup copy is created.

use crate::error::{BringupError, Result};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Result of an `ensure_directive` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The directive was already in the file; nothing was written.
    AlreadyPresent,
    /// The directive was inserted immediately after the anchor line.
    InsertedAfterAnchor,
    /// The directive was appended as the final line (no anchor given,
    /// or the anchor was absent).
    Appended,
}

impl PatchOutcome {
    /// Returns true if the call wrote to the file.
    pub fn changed(self) -> bool {
        !matches!(self, Self::AlreadyPresent)
    }
}

/// Handle to the firmware configuration file.
///
/// The file must already exist (it is created by the OS image, never by
/// this tool). Mutating operations additionally require write access,
/// which in practice means running as root.
#[derive(Debug, Clone)]
pub struct FirmwareConfig {
    path: PathBuf,
}

impl FirmwareConfig {
    /// Open a handle to an existing firmware config file.
    ///
    /// Fails with `BringupError::NotFound` if the path does not exist.
    /// Writability is checked lazily by the mutating operations so that
    /// read-only flows (`verify`) work without elevated privilege.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(BringupError::not_found(path));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Guarantee `directive` is present in the file.
    ///
    /// If a line equal to `directive` already exists this is a no-op.
    /// Otherwise the directive is inserted immediately after `anchor`
    /// when that line exists, or appended as the final line.
    pub fn ensure_directive(
        &self,
        directive: &str,
        anchor: Option<&str>,
    ) -> Result<PatchOutcome> {
        let directive = normalize(directive)?;
        self.check_writable()?;

        let content = self.read_content()?;
        let mut lines = split_lines(&content);
        if lines.iter().any(|l| line_matches(l, directive)) {
            log::debug!("{directive:?} already present in {}", self.path.display());
            return Ok(PatchOutcome::AlreadyPresent);
        }

        let outcome = match anchor.and_then(|a| {
            lines.iter().position(|l| line_matches(l, a.trim()))
        }) {
            Some(idx) => {
                lines.insert(idx + 1, directive.to_string());
                PatchOutcome::InsertedAfterAnchor
            }
            None => {
                lines.push(directive.to_string());
                PatchOutcome::Appended
            }
        };

        if crate::executor::is_dry_run() {
            println!(
                "[dry-run] would add {:?} to {}",
                directive,
                self.path.display()
            );
            return Ok(outcome);
        }

        self.write_lines(&lines, line_ending(&content))?;
        log::info!(
            "Patched {}: added {directive:?} ({outcome:?})",
            self.path.display()
        );
        Ok(outcome)
    }

    /// Read-only check: is a line equal to `directive` present?
    pub fn directive_present(&self, directive: &str) -> Result<bool> {
        let directive = normalize(directive)?;
        let content = self.read_content()?;
        Ok(content.lines().any(|l| line_matches(l, directive)))
    }

    /// Remove every line equal to `directive`. Returns whether anything
    /// was removed. Removing an absent directive is idempotent success.
    pub fn remove_directive(&self, directive: &str) -> Result<bool> {
        let directive = normalize(directive)?;
        self.check_writable()?;

        let content = self.read_content()?;
        let lines = split_lines(&content);
        let kept: Vec<String> = lines
            .iter()
            .filter(|l| !line_matches(l, directive))
            .cloned()
            .collect();

        if kept.len() == lines.len() {
            return Ok(false);
        }

        if crate::executor::is_dry_run() {
            println!(
                "[dry-run] would remove {:?} from {}",
                directive,
                self.path.display()
            );
            return Ok(true);
        }

        self.write_lines(&kept, line_ending(&content))?;
        log::info!(
            "Patched {}: removed {directive:?}",
            self.path.display()
        );
        Ok(true)
    }

    fn read_content(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| self.map_io(e))
    }

    /// Write lines back using the file's own line terminator. An empty
    /// line set writes an empty file; the file itself is never deleted.
    fn write_lines(&self, lines: &[String], eol: &str) -> Result<()> {
        let mut content = lines.join(eol);
        if !content.is_empty() {
            content.push_str(eol);
        }
        fs::write(&self.path, content).map_err(|e| self.map_io(e))
    }

    /// Verify the file can be opened for writing before touching it.
    /// Skipped in dry-run mode so previews work without privilege.
    fn check_writable(&self) -> Result<()> {
        if crate::executor::is_dry_run() {
            return Ok(());
        }
        match OpenOptions::new().append(true).open(&self.path) {
            Ok(_) => Ok(()),
            Err(e) => Err(self.map_io(e)),
        }
    }

    fn map_io(&self, e: std::io::Error) -> BringupError {
        match e.kind() {
            ErrorKind::NotFound => BringupError::not_found(&self.path),
            ErrorKind::PermissionDenied => BringupError::permission(format!(
                "{} is not writable (run with sudo)",
                self.path.display()
            )),
            _ => BringupError::Io(e),
        }
    }
}

/// Validate and trim a directive argument. Directives are single lines;
/// embedded newlines would corrupt the file.
fn normalize(directive: &str) -> Result<&str> {
    let trimmed = directive.trim();
    if trimmed.is_empty() {
        return Err(BringupError::validation("directive must not be empty"));
    }
    if trimmed.contains('\n') || trimmed.contains('\r') {
        return Err(BringupError::validation(
            "directive must be a single line",
        ));
    }
    Ok(trimmed)
}

/// Exact-match comparison, ignoring surrounding whitespace. Comment
/// lines never match because of the `#` prefix.
fn line_matches(line: &str, directive: &str) -> bool {
    line.trim() == directive
}

/// `str::lines` strips both LF and CRLF, so the terminators never leak
/// into the line set.
fn split_lines(content: &str) -> Vec<String> {
    content.lines().map(str::to_string).collect()
}

/// The terminator style the file already uses.
fn line_ending(content: &str) -> &'static str {
    if content.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}
