//! Exit monitoring: the blocking wait that decides when the development
//! session ends.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::Utc;

use super::process::{ManagedProcess, Orchestrator, ProcessStatus};
use crate::constants::{EXIT_POLL_INTERVAL_MS, ROLE_SERVER};
use crate::utils::format_duration;

impl Orchestrator {
    /// Block until the application server dies unexpectedly or shutdown
    /// is requested externally.
    ///
    /// Polls every registered process's status on each tick. A process
    /// with the zero-exit exemption that finished successfully (the asset
    /// watcher completing a one-shot build) is not a death. Every other
    /// exited process is reported and dropped from the registry; only the
    /// primary server ends the wait. The caller is expected to follow up
    /// with [`Orchestrator::stop_all`].
    pub fn wait_for_any_exit(&self) {
        while !self.shared.shutdown.load(Ordering::SeqCst) {
            let snapshot: Vec<Arc<ManagedProcess>> =
                self.shared.processes.lock().values().cloned().collect();

            let mut primary_dead = false;
            for process in snapshot {
                match process.refresh_status() {
                    ProcessStatus::ExitedExpected => {
                        tracing::info!(
                            name = %process.name,
                            pid = process.pid(),
                            "process finished successfully"
                        );
                        println!("[devloop] '{}' finished (one-shot build)", process.name);
                        self.shared.processes.lock().remove(&process.name);
                    },
                    ProcessStatus::ExitedUnexpected => {
                        report_death(&process);
                        self.shared.processes.lock().remove(&process.name);
                        if process.name == ROLE_SERVER {
                            primary_dead = true;
                        }
                    },
                    ProcessStatus::Running | ProcessStatus::Terminated => {},
                }
            }

            if primary_dead {
                return;
            }
            std::thread::sleep(Duration::from_millis(EXIT_POLL_INTERVAL_MS));
        }
    }
}

/// Console report for an unexpected death. Not an error: steady-state
/// failures degrade gracefully to keep the session alive.
fn report_death(process: &ManagedProcess) {
    let uptime = format_duration(Utc::now() - process.started_at);
    let code = process
        .exit_code()
        .map_or_else(|| "signal".to_string(), |c| c.to_string());

    tracing::warn!(
        name = %process.name,
        pid = process.pid(),
        exit_code = %code,
        uptime = %uptime,
        "process exited unexpectedly"
    );
    println!(
        "[devloop] '{}' (pid {}) exited unexpectedly with code {} after {}",
        process.name,
        process.pid(),
        code,
        uptime
    );
}
