//! CLI command handlers.

pub mod dev;
