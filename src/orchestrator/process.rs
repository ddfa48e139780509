//! Process registry and lifecycle management for the development loop.
//!
//! The registry owns every spawned process for the session. Each entry
//! runs with stdout and stderr merged into a single stream that a
//! background reader drains to the console. Termination is a two-phase
//! escalation: a graceful signal with a bounded wait, then a forced kill
//! with a shorter bounded wait.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessesToUpdate, System};

use super::error::{Error, Result};
use super::output;
use crate::constants::{FORCED_TIMEOUT_SECS, GRACEFUL_TIMEOUT_SECS, STOP_POLL_INTERVAL_MS};

/// Observed lifecycle state of a managed process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Spawned and not yet observed to have exited.
    Running,
    /// Exited on its own with a code the role treats as success
    /// (a one-shot asset build finishing, for example).
    ExitedExpected,
    /// Exited on its own without being asked to.
    ExitedUnexpected,
    /// Stopped by the orchestrator.
    Terminated,
}

/// Parameters for spawning a managed process.
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    /// Role key the process is registered under (e.g. "server").
    pub name: String,
    /// Full argument vector; the first element is the program.
    pub command: Vec<String>,
    /// Working directory for the process.
    pub working_dir: PathBuf,
    /// Environment overrides applied on top of the inherited environment.
    pub env: Vec<(String, String)>,
    /// Forward output verbatim instead of prefixing it with `[name]`.
    pub passthrough: bool,
    /// Treat a voluntary zero exit as expected rather than as a death.
    pub zero_exit_ok: bool,
}

impl SpawnSpec {
    /// Create a spec with the inherited environment and the current
    /// directory as the working directory.
    pub fn new(name: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command,
            working_dir: PathBuf::from("."),
            env: Vec::new(),
            passthrough: false,
            zero_exit_ok: false,
        }
    }

    /// Set the working directory.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Add an environment override.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Forward this process's output unprefixed.
    #[must_use]
    pub const fn passthrough(mut self, enabled: bool) -> Self {
        self.passthrough = enabled;
        self
    }

    /// Exempt a voluntary zero exit from unexpected-death reporting.
    #[must_use]
    pub const fn zero_exit_ok(mut self, enabled: bool) -> Self {
        self.zero_exit_ok = enabled;
        self
    }
}

#[derive(Debug)]
struct ExitState {
    status: ProcessStatus,
    exit_code: Option<i32>,
}

/// One spawned OS process and its metadata.
///
/// Owned by the registry and shared with background threads through `Arc`.
/// Status fields are interior-mutable; registry membership is mutated only
/// by the controlling thread.
#[derive(Debug)]
pub struct ManagedProcess {
    /// Role key the process is registered under.
    pub name: String,
    /// Argument vector the process was spawned with.
    pub command: Vec<String>,
    /// Working directory the process was spawned in.
    pub working_dir: PathBuf,
    /// Spawn time, for uptime reporting.
    pub started_at: DateTime<Utc>,
    pid: u32,
    zero_exit_ok: bool,
    child: Mutex<Child>,
    state: Mutex<ExitState>,
}

impl ManagedProcess {
    /// OS process id.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Last observed status without polling the OS.
    pub fn status(&self) -> ProcessStatus {
        self.state.lock().status
    }

    /// Exit code, set once the process has been observed to exit.
    pub fn exit_code(&self) -> Option<i32> {
        self.state.lock().exit_code
    }

    /// Poll the OS for an exit and update the recorded status.
    ///
    /// A voluntary exit is classified as expected only for roles with the
    /// zero-exit exemption and a success code. Poll errors leave the
    /// status unchanged; the next sweep retries.
    pub(crate) fn refresh_status(&self) -> ProcessStatus {
        let mut state = self.state.lock();
        if state.status != ProcessStatus::Running {
            return state.status;
        }
        match self.child.lock().try_wait() {
            Ok(Some(exit)) => {
                state.exit_code = exit.code();
                state.status = if self.zero_exit_ok && exit.success() {
                    ProcessStatus::ExitedExpected
                } else {
                    ProcessStatus::ExitedUnexpected
                };
            },
            Ok(None) | Err(_) => {},
        }
        state.status
    }

    fn mark_terminated(&self) {
        let mut state = self.state.lock();
        state.status = ProcessStatus::Terminated;
    }

    fn force_kill(&self) {
        // Process may already be gone; that counts as stopped.
        let _ = self.child.lock().kill();
    }
}

/// Shared session state: the registry map plus the global shutdown flag
/// observed by every background thread.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub(crate) processes: Mutex<HashMap<String, Arc<ManagedProcess>>>,
    pub(crate) shutdown: AtomicBool,
}

/// Session-scoped process orchestrator.
///
/// Cheap to clone; clones share the same registry and shutdown flag.
/// The API assumes a single controlling thread performs launches and
/// shutdown; background threads only read handles and update per-entry
/// status.
#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    pub(crate) shared: Arc<Shared>,
}

impl Orchestrator {
    /// Create an orchestrator with an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether group shutdown has been requested.
    pub fn shutdown_requested(&self) -> bool {
        self.shared.shutdown.load(Ordering::SeqCst)
    }

    /// Spawn a process and register it under its role name.
    ///
    /// Starting a name that already has a live entry is a no-op that
    /// returns the existing handle. The process runs with stdout and
    /// stderr merged into one stream drained by a background reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the spec has an empty command or the OS fails
    /// to spawn the process; nothing is registered in that case.
    pub fn start(&self, spec: SpawnSpec) -> Result<Arc<ManagedProcess>> {
        let mut processes = self.shared.processes.lock();

        if let Some(existing) = processes.get(&spec.name)
            && existing.refresh_status() == ProcessStatus::Running
        {
            tracing::warn!(
                name = %spec.name,
                pid = existing.pid(),
                "process already running, returning existing handle"
            );
            return Ok(existing.clone());
        }

        let (program, args) = spec
            .command
            .split_first()
            .ok_or_else(|| Error::InvalidLaunch(format!("empty command for '{}'", spec.name)))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(&spec.working_dir)
            .stdin(Stdio::null());
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        // Merge stdout and stderr into one readable stream.
        #[cfg(unix)]
        let merged = merged_output(&mut cmd).map_err(|e| Error::spawn(&spec.name, e))?;
        #[cfg(windows)]
        {
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        }

        #[allow(unused_mut)] // mut needed on Windows to take the pipe ends
        let mut child = cmd.spawn().map_err(|e| Error::spawn(&spec.name, e))?;
        let pid = child.id();

        #[cfg(windows)]
        let pipes = (child.stdout.take(), child.stderr.take());

        let process = Arc::new(ManagedProcess {
            name: spec.name.clone(),
            command: spec.command,
            working_dir: spec.working_dir,
            started_at: Utc::now(),
            pid,
            zero_exit_ok: spec.zero_exit_ok,
            child: Mutex::new(child),
            state: Mutex::new(ExitState {
                status: ProcessStatus::Running,
                exit_code: None,
            }),
        });
        processes.insert(spec.name.clone(), process.clone());
        drop(processes);

        #[cfg(unix)]
        output::spawn_reader(
            self.shared.clone(),
            spec.name.clone(),
            spec.passthrough,
            merged,
        );
        #[cfg(windows)]
        {
            for pipe in [
                pipes.0.map(|p| Box::new(p) as Box<dyn std::io::Read + Send>),
                pipes.1.map(|p| Box::new(p) as Box<dyn std::io::Read + Send>),
            ]
            .into_iter()
            .flatten()
            {
                output::spawn_reader(
                    self.shared.clone(),
                    spec.name.clone(),
                    spec.passthrough,
                    pipe,
                );
            }
        }

        tracing::info!(name = %spec.name, pid, "spawned process");
        Ok(process)
    }

    /// True iff a process is registered under `name` and has not exited.
    pub fn is_running(&self, name: &str) -> bool {
        let process = self.shared.processes.lock().get(name).cloned();
        process.is_some_and(|p| p.refresh_status() == ProcessStatus::Running)
    }

    /// Registered handle for `name`, if any.
    pub fn get(&self, name: &str) -> Option<Arc<ManagedProcess>> {
        self.shared.processes.lock().get(name).cloned()
    }

    /// Stop one process with graceful-then-forced escalation.
    ///
    /// `timeout` bounds the graceful phase (default 2 seconds); the forced
    /// phase is bounded separately. Termination is best-effort: signal
    /// errors are suppressed, a missing name is already-stopped, and the
    /// entry is removed from the registry on completion. Always returns
    /// true.
    pub fn stop(&self, name: &str, timeout: Option<Duration>) -> bool {
        let process = self.shared.processes.lock().get(name).cloned();
        let Some(process) = process else {
            tracing::debug!(name, "stop requested for unregistered process");
            return true;
        };

        terminate(&process, timeout.unwrap_or(Duration::from_secs(GRACEFUL_TIMEOUT_SECS)));
        self.shared.processes.lock().remove(name);
        true
    }

    /// Stop every registered process and end the session.
    ///
    /// Idempotent: the shutdown flag is checked-and-set atomically and a
    /// second invocation is a no-op. Background threads observe the flag
    /// and exit on their own; they are never joined. When this returns,
    /// every managed process is confirmed stopped or killed.
    pub fn stop_all(&self, timeout: Option<Duration>) {
        if self.shared.shutdown.swap(true, Ordering::SeqCst) {
            tracing::debug!("shutdown already in progress, ignoring");
            return;
        }
        tracing::info!("stopping all processes");

        let snapshot: Vec<Arc<ManagedProcess>> =
            self.shared.processes.lock().values().cloned().collect();
        let graceful = timeout.unwrap_or(Duration::from_secs(GRACEFUL_TIMEOUT_SECS));
        for process in snapshot {
            terminate(&process, graceful);
        }
        self.shared.processes.lock().clear();
    }
}

/// Two-phase termination: graceful signal, bounded wait, forced kill,
/// shorter bounded wait. Every step suppresses errors; a process that is
/// already gone counts as stopped.
fn terminate(process: &ManagedProcess, graceful_timeout: Duration) {
    if process.refresh_status() == ProcessStatus::Running {
        send_graceful_signal(process.pid());

        if !wait_for_exit(process, graceful_timeout) {
            tracing::warn!(
                name = %process.name,
                pid = process.pid(),
                "process ignored graceful termination, killing"
            );
            process.force_kill();

            if !wait_for_exit(process, Duration::from_secs(FORCED_TIMEOUT_SECS))
                && pid_alive(process.pid())
            {
                tracing::warn!(name = %process.name, pid = process.pid(), "process survived forced kill");
            }
        }
    }

    process.mark_terminated();
    tracing::info!(name = %process.name, pid = process.pid(), "stopped process");
}

/// Poll until the process exits or the timeout elapses.
fn wait_for_exit(process: &ManagedProcess, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if process.refresh_status() != ProcessStatus::Running {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(STOP_POLL_INTERVAL_MS));
    }
}

/// Send the polite termination request (SIGTERM on Unix, `taskkill` on
/// Windows). Failures are suppressed: the process may have exited between
/// the status check and the signal.
#[cfg(unix)]
fn send_graceful_signal(pid: u32) {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid as NixPid;

    let _ = signal::kill(NixPid::from_raw(pid as i32), Signal::SIGTERM);
}

#[cfg(windows)]
fn send_graceful_signal(pid: u32) {
    use std::os::windows::process::CommandExt;

    let _ = Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T"])
        .creation_flags(0x0800_0000) // CREATE_NO_WINDOW
        .status();
}

/// Check the OS process table for the pid. Backs up `try_wait` during
/// kill escalation; a missing process reads as not running.
fn pid_alive(pid: u32) -> bool {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    system.process(Pid::from(pid as usize)).is_some()
}

/// Build a single merged pipe for stdout and stderr. The read end is set
/// non-blocking so the reader loop can poll the shutdown flag between
/// reads and is not pinned by grandchildren that inherit the write end.
#[cfg(unix)]
fn merged_output(cmd: &mut Command) -> std::io::Result<std::fs::File> {
    use nix::fcntl::{FcntlArg, OFlag, fcntl};
    use std::os::fd::AsRawFd;

    let (read_fd, write_fd) = nix::unistd::pipe()?;
    let write_clone = write_fd.try_clone()?;
    cmd.stdout(Stdio::from(write_fd));
    cmd.stderr(Stdio::from(write_clone));

    fcntl(read_fd.as_raw_fd(), FcntlArg::F_SETFL(OFlag::O_NONBLOCK))?;
    Ok(std::fs::File::from(read_fd))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_spec_defaults() {
        let spec = SpawnSpec::new("server", vec!["sleep".into(), "5".into()]);
        assert_eq!(spec.name, "server");
        assert_eq!(spec.working_dir, PathBuf::from("."));
        assert!(spec.env.is_empty());
        assert!(!spec.passthrough);
        assert!(!spec.zero_exit_ok);
    }

    #[test]
    fn spawn_spec_builder() {
        let spec = SpawnSpec::new("asset-watcher", vec!["tailwindcss".into()])
            .working_dir("/tmp")
            .env("NO_COLOR", "1")
            .passthrough(true)
            .zero_exit_ok(true);
        assert_eq!(spec.working_dir, PathBuf::from("/tmp"));
        assert_eq!(spec.env, vec![("NO_COLOR".to_string(), "1".to_string())]);
        assert!(spec.passthrough);
        assert!(spec.zero_exit_ok);
    }

    #[test]
    fn start_rejects_empty_command() {
        let orch = Orchestrator::new();
        let result = orch.start(SpawnSpec::new("server", vec![]));
        assert!(matches!(result, Err(Error::InvalidLaunch(_))));
        assert!(!orch.is_running("server"));
    }

    #[test]
    fn spawn_failure_registers_nothing() {
        let orch = Orchestrator::new();
        let result = orch.start(SpawnSpec::new(
            "server",
            vec!["devloop-test-no-such-binary".into()],
        ));
        assert!(matches!(result, Err(Error::Spawn { .. })));
        assert!(orch.get("server").is_none());
    }

    #[test]
    fn pid_alive_sees_current_process() {
        assert!(pid_alive(std::process::id()));
    }

    #[test]
    fn stop_unknown_name_succeeds() {
        let orch = Orchestrator::new();
        assert!(orch.stop("server", None));
    }
}
