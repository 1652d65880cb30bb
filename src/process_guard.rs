//! Process lifecycle management for child processes
//!
//! The bring-up spawns long-running children (apt-get, git clone, pip3).
//! If the helper is interrupted mid-install, those children must not be
//! left orphaned half-way through a package transaction.
//!
//! - Children are spawned in their own process group
//! - All child PIDs live in a global registry
//! - On parent exit (Drop, SIGTERM, SIGINT, SIGHUP) the whole group gets
//!   SIGTERM, then SIGKILL after a grace period

use nix::libc;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

/// Global registry of child process IDs
static CHILD_REGISTRY: OnceLock<Arc<Mutex<ChildRegistry>>> = OnceLock::new();

/// Registry tracking all spawned child processes
#[derive(Debug, Default)]
pub struct ChildRegistry {
    /// Set of child PIDs currently running
    pids: HashSet<u32>,
    /// Whether cleanup has already been initiated
    cleanup_initiated: bool,
}

impl ChildRegistry {
    /// Get or create the global child registry
    pub fn global() -> Arc<Mutex<ChildRegistry>> {
        CHILD_REGISTRY
            .get_or_init(|| Arc::new(Mutex::new(ChildRegistry::default())))
            .clone()
    }

    /// Register a new child process
    pub fn register(&mut self, pid: u32) {
        self.pids.insert(pid);
        log::debug!("Registered child process PID {}", pid);
    }

    /// Unregister a child process (called when it exits normally)
    pub fn unregister(&mut self, pid: u32) {
        self.pids.remove(&pid);
        log::debug!("Unregistered child process PID {}", pid);
    }

    /// Get count of tracked children
    pub fn count(&self) -> usize {
        self.pids.len()
    }

    /// Terminate all tracked child processes.
    /// Sends SIGTERM first, waits up to `grace_period`, then SIGKILL.
    pub fn terminate_all(&mut self, grace_period: Duration) {
        if self.cleanup_initiated {
            log::debug!("Cleanup already initiated, skipping");
            return;
        }
        self.cleanup_initiated = true;

        if self.pids.is_empty() {
            log::debug!("No child processes to terminate");
            return;
        }

        log::info!("Terminating {} child process(es)...", self.pids.len());

        // Signal the process GROUPS so grandchildren (dpkg under apt-get,
        // pip's build subprocesses) receive the signal too
        let pids_to_kill: Vec<u32> = self.pids.iter().copied().collect();
        for &pid in &pids_to_kill {
            if let Err(e) = send_signal_to_group(pid, Signal::SIGTERM) {
                log::warn!("Failed to send SIGTERM to process group {}: {}", pid, e);
                if let Err(e2) = send_signal(pid, Signal::SIGTERM) {
                    log::warn!("Failed to send SIGTERM to PID {}: {}", pid, e2);
                }
            } else {
                log::debug!("Sent SIGTERM to process group {}", pid);
            }
        }

        let start = Instant::now();
        while start.elapsed() < grace_period {
            let still_alive: Vec<u32> = pids_to_kill
                .iter()
                .filter(|&&pid| is_process_alive(pid))
                .copied()
                .collect();

            if still_alive.is_empty() {
                log::info!("All child processes terminated gracefully");
                self.pids.clear();
                return;
            }

            std::thread::sleep(Duration::from_millis(100));
        }

        for &pid in &pids_to_kill {
            if is_process_alive(pid) {
                log::warn!("Process group {} did not terminate, sending SIGKILL", pid);
                if let Err(e) = send_signal_to_group(pid, Signal::SIGKILL) {
                    log::error!("Failed to send SIGKILL to process group {}: {}", pid, e);
                    let _ = send_signal(pid, Signal::SIGKILL);
                }
            }
        }

        self.pids.clear();
        log::info!("Child process cleanup complete");
    }
}

/// Send a signal to a process
fn send_signal(pid: u32, signal: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(pid as i32), signal)
}

/// Send a signal to an entire process group (negative PID)
fn send_signal_to_group(pgid: u32, signal: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(-(pgid as i32)), signal)
}

/// Check if a process is still alive (not dead or zombie)
fn is_process_alive(pid: u32) -> bool {
    if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
        return false;
    }

    // Zombies can still receive signals but are not running.
    // Field 3 of /proc/pid/stat is the state: Z=zombie, X=dead.
    if let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        let fields: Vec<&str> = stat.split_whitespace().collect();
        if fields.len() > 2 {
            return !matches!(fields[2], "Z" | "X");
        }
    }

    true
}

/// RAII guard that terminates all children on drop
pub struct ProcessGuard {
    registry: Arc<Mutex<ChildRegistry>>,
}

impl ProcessGuard {
    /// Create a new process guard attached to the global registry
    pub fn new() -> Self {
        Self {
            registry: ChildRegistry::global(),
        }
    }
}

impl Default for ProcessGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        log::debug!("ProcessGuard dropped, initiating cleanup");
        if let Ok(mut registry) = self.registry.lock() {
            registry.terminate_all(Duration::from_secs(5));
        }
    }
}

/// Initialize global signal handlers for graceful shutdown.
/// Handles SIGINT (Ctrl+C), SIGTERM, and SIGHUP. Call once at startup.
pub fn init_signal_handlers() -> Result<(), std::io::Error> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;
    use std::thread;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

    thread::spawn(move || {
        for sig in signals.forever() {
            let signal_name = match sig {
                SIGINT => "SIGINT",
                SIGTERM => "SIGTERM",
                SIGHUP => "SIGHUP",
                _ => "UNKNOWN",
            };

            log::info!("Received {} signal, cleaning up...", signal_name);

            if let Ok(mut registry) = ChildRegistry::global().lock() {
                registry.terminate_all(Duration::from_secs(3));
            }

            // 128 + signal number, matching shell convention
            std::process::exit(128 + sig);
        }
    });

    Ok(())
}

/// Extension trait for std::process::Command to set up process groups
pub trait CommandProcessGroup {
    /// Configure the command to run in its own process group so the
    /// entire process tree can be killed with a single signal
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        unsafe {
            self.pre_exec(|| {
                // Make this process the leader of a new process group
                nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

                // Child dies if the parent dies, so an interrupted bring-up
                // never leaves a package transaction running unattended
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }

                Ok(())
            });
        }
        self
    }
}
