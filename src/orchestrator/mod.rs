//! Development-loop process orchestration.
//!
//! Starts, supervises, and tears down the long-running processes of a
//! development session: the application server and the asset-build
//! watcher. Output from every process is multiplexed into one console
//! stream, the built asset artifact is watched for changes, and
//! unexpected process death is detected to decide when the session ends.
//!
//! Scheduling model: OS processes plus one lightweight background thread
//! per output reader and per watched path; no event loop. The controlling
//! thread launches, blocks in [`Orchestrator::wait_for_any_exit`], then
//! shuts down. Background threads observe a single shutdown flag and are
//! never joined. The API assumes a single orchestrating owner.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use devloop::orchestrator::Orchestrator;
//!
//! # fn main() -> devloop::orchestrator::Result<()> {
//! let orch = Orchestrator::new();
//! orch.launch_application_server(Path::new("main.py"), 8000, &["*.py".into()], true, false)?;
//! orch.wait_for_any_exit();
//! orch.stop_all(None);
//! # Ok(())
//! # }
//! ```

pub mod error;
mod launcher;
mod monitor;
mod output;
mod process;
pub mod shim;
mod watch;

pub use error::{Error, Result};
pub use process::{ManagedProcess, Orchestrator, ProcessStatus, SpawnSpec};
pub use watch::{WatchCallback, WatchTarget};
