//! Centralized constants for the development loop.
//!
//! All magic numbers and reserved names used by the orchestrator should be
//! defined here with documented rationale. This enables:
//! - Consistent timing behavior across modules
//! - Easy tuning without code search

// =============================================================================
// Process Roles
// =============================================================================

/// Registry name of the application server process. Its unexpected death
/// ends the whole development session.
pub const ROLE_SERVER: &str = "server";

/// Registry name of the asset-build watcher process. A zero exit code from
/// this role is a completed one-shot build, not a failure.
pub const ROLE_ASSET_WATCHER: &str = "asset-watcher";

// =============================================================================
// Timing
// =============================================================================

/// Graceful termination wait (T1). SIGTERM is given this long before
/// escalating to a forced kill.
pub const GRACEFUL_TIMEOUT_SECS: u64 = 2;

/// Forced termination wait (T2) after SIGKILL.
pub const FORCED_TIMEOUT_SECS: u64 = 1;

/// Sleep between liveness polls while waiting for a signalled process to
/// exit. Small enough to keep `stop` latency well under T1 + T2.
pub const STOP_POLL_INTERVAL_MS: u64 = 50;

/// Sleep between reads when a process has produced no output.
pub const OUTPUT_POLL_INTERVAL_MS: u64 = 100;

/// Sleep between modification-time checks on a watched file.
pub const WATCH_POLL_INTERVAL_MS: u64 = 500;

/// Sleep between process-status sweeps in the exit-wait loop.
pub const EXIT_POLL_INTERVAL_MS: u64 = 500;

// =============================================================================
// Server Launch
// =============================================================================

/// Default HTTP port for the application server.
pub const DEFAULT_PORT: u16 = 8000;

/// Attribute name of the ASGI application object in the entry module.
pub const APP_SYMBOL: &str = "app";

/// Route reserved for the orchestrator's own live-reload notifications.
/// The shim removes any pre-existing handler on this path before
/// installing its own.
pub const RELOAD_ROUTE: &str = "/__devloop__/live-reload";

/// Glob patterns never watched for server reload: generated style output,
/// static asset directories, temporary files, cache directories, and the
/// shim's own naming pattern.
pub const RELOAD_EXCLUDES: &[&str] = &[
    "*.css",
    "static/*",
    "*.tmp",
    ".*.swp",
    "__pycache__/*",
    ".devloop_cache/*",
    "*_devloop_*.py",
];

/// Default glob patterns that trigger a server reload.
pub const DEFAULT_WATCH_PATTERNS: &[&str] = &["*.py"];

// =============================================================================
// Paths
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "devloop.toml";

/// Default application entry file.
pub const DEFAULT_ENTRY: &str = "main.py";

/// Default asset-build tool binary.
pub const DEFAULT_ASSET_BIN: &str = "tailwindcss";

/// Default asset input file.
pub const DEFAULT_ASSET_INPUT: &str = "assets/input.css";

/// Default asset output file.
pub const DEFAULT_ASSET_OUTPUT: &str = "static/build.css";
