//! Error types for the process orchestrator.
//!
//! Only launch-time failures are surfaced through these variants; all
//! steady-state failures (output reads, watch stats, termination signals)
//! are suppressed at their call sites so the development session keeps
//! running as long as possible.

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Orchestrator errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Process failed to spawn (missing executable, permission denied).
    #[error("failed to spawn process '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error with context (e.g. writing the hot-reload shim).
    #[error("IO error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Launch parameters that cannot form a valid command line.
    #[error("invalid launch configuration: {0}")]
    InvalidLaunch(String),
}

impl Error {
    /// Create a spawn error for the named process.
    pub fn spawn(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            name: name.into(),
            source,
        }
    }

    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
