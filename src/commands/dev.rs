//! Start the development session.
//!
//! Wires the devloop.toml manifest and CLI flags into the orchestrator,
//! launches the application server and the asset watcher, then blocks
//! until Ctrl+C or until the server dies unexpectedly. Either way the
//! whole process group is stopped before returning.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use devloop::config::Config;
use devloop::orchestrator::{Orchestrator, WatchCallback};

/// Flags collected from the command line. `None`/empty values fall back
/// to the manifest.
#[derive(Debug, Default)]
pub struct DevOptions {
    pub entry: Option<PathBuf>,
    pub port: Option<u16>,
    pub watch: Vec<String>,
    pub no_hot_reload: bool,
    pub debug: bool,
    pub no_assets: bool,
}

/// Run the development session until it ends.
pub async fn execute(options: DevOptions) -> Result<()> {
    init_logging();

    let mut config = Config::load_or_default()?;
    apply_overrides(&mut config, &options);
    config.validate()?;

    print_banner(&config);

    let orch = Orchestrator::new();
    let result = run_session(&orch, &config).await;

    orch.stop_all(None);
    println!("All processes stopped.");
    result
}

/// Launch both roles and wait for the session to end. The caller owns
/// teardown, so any error here still results in a clean `stop_all`.
async fn run_session(orch: &Orchestrator, config: &Config) -> Result<()> {
    orch.launch_application_server(
        &config.server.entry,
        config.server.port,
        &config.server.watch,
        config.server.hot_reload,
        config.server.debug,
    )
    .context("Failed to launch application server")?;

    if config.assets.enabled {
        let on_rebuild: WatchCallback = Arc::new(|path: &Path| {
            tracing::debug!(artifact = %path.display(), "asset build artifact updated");
            println!("[devloop] assets rebuilt: {}", path.display());
        });

        let project_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        orch.launch_asset_watcher(
            &config.assets.bin,
            &config.assets.input,
            &config.assets.output,
            &project_root,
            Some(on_rebuild),
        )
        .context("Failed to launch asset watcher")?;
    }

    let waiter = orch.clone();
    let wait = tokio::task::spawn_blocking(move || waiter.wait_for_any_exit());

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
        _ = wait => {
            println!("Application server exited; ending session");
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut Config, options: &DevOptions) {
    if let Some(entry) = &options.entry {
        config.server.entry = entry.clone();
    }
    if let Some(port) = options.port {
        config.server.port = port;
    }
    if !options.watch.is_empty() {
        config.server.watch = options.watch.clone();
    }
    if options.no_hot_reload {
        config.server.hot_reload = false;
    }
    if options.debug {
        config.server.debug = true;
    }
    if options.no_assets {
        config.assets.enabled = false;
    }
}

fn print_banner(config: &Config) {
    println!("Starting development session");
    println!(
        "  Server:  http://127.0.0.1:{}  (entry: {})",
        config.server.port,
        config.server.entry.display()
    );
    if config.assets.enabled {
        println!(
            "  Assets:  {} -> {}",
            config.assets.input.display(),
            config.assets.output.display()
        );
    }
    println!("  Watch:   {}", config.server.watch.join(", "));
    println!("\nPress Ctrl+C to stop\n");
}

/// Initialize stdout logging.
fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_take_precedence() {
        let mut config = Config::default();
        let options = DevOptions {
            entry: Some(PathBuf::from("site.py")),
            port: Some(5000),
            watch: vec!["src/**/*.py".to_string()],
            no_hot_reload: true,
            debug: true,
            no_assets: true,
        };

        apply_overrides(&mut config, &options);
        assert_eq!(config.server.entry, PathBuf::from("site.py"));
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.watch, vec!["src/**/*.py".to_string()]);
        assert!(!config.server.hot_reload);
        assert!(config.server.debug);
        assert!(!config.assets.enabled);
    }

    #[test]
    fn empty_options_keep_manifest_values() {
        let mut config = Config::default();
        apply_overrides(&mut config, &DevOptions::default());
        assert_eq!(config.server.port, devloop::constants::DEFAULT_PORT);
        assert!(config.server.hot_reload);
        assert!(config.assets.enabled);
    }
}
