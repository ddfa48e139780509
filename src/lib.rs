// =============================================================================
// Lint Configuration
// =============================================================================

// Safety: no unsafe anywhere in this crate
#![deny(unsafe_code)]
// Correctness: must handle all fallible operations
#![deny(unused_must_use)]
// Quality: pedantic but pragmatic
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(rust_2018_idioms)]
#![warn(unreachable_pub)]
// Allowed with documented reasons
#![allow(clippy::missing_errors_doc)] // Error returns self-documenting via type
#![allow(clippy::module_name_repetitions)] // e.g., config::ServerConfig is clearer
#![allow(clippy::must_use_candidate)] // Not all returned values need annotation
#![allow(clippy::cast_possible_wrap)] // Intentional in pid conversions for signals

//! Library crate for devloop - a development-loop process orchestrator.
//!
//! devloop starts, supervises, and tears down the long-running processes
//! needed while iterating on a web application: the application server
//! and the asset-build watcher. It multiplexes their output into a single
//! console stream, watches the built asset artifact for changes, and
//! detects unexpected process death to decide when the session ends.
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
//! orch.launch_asset_watcher(
//!     Path::new("tailwindcss"),
//!     Path::new("assets/input.css"),
//!     Path::new("static/build.css"),
//!     Path::new("."),
//!     None,
//! )?;
//! orch.wait_for_any_exit();
//! orch.stop_all(None);
//! # Ok(())
//! # }
//! ```

/// Process orchestration: registry, output multiplexing, file watching,
/// launch shapes, exit monitoring, and coordinated shutdown.
pub mod orchestrator;

/// Configuration types for the devloop.toml manifest.
///
/// All configuration types support serde for TOML parsing and provide
/// sensible defaults suitable for development use.
pub mod config;

/// Centralized constants for timings, reserved names, and defaults.
///
/// All magic numbers in the orchestrator should be defined here with
/// documented rationale.
pub mod constants;

/// Shared utility functions.
pub mod utils;
