//! devloop - Development-loop orchestrator for web applications.
//!
//! This is the main entry point for the devloop CLI. It provides commands
//! for:
//!
//! - Running the development session (`devloop dev`)
//! - Generating shell completions (`devloop completions`)
//!
//! See `devloop --help` for full usage information.

// Use mimalloc for better multi-core performance (especially important for musl builds)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Generator, Shell};
use std::path::PathBuf;

mod commands;

const AFTER_HELP: &str = "\
COMMON WORKFLOWS:
  # Start the development session (server + asset watcher)
  devloop dev

  # Custom entry point and port
  devloop dev --entry site.py --port 5000

  # Server only, no asset watcher
  devloop dev --no-assets

EXAMPLES:
  devloop dev                       Run with devloop.toml or defaults
  devloop dev --watch 'src/**/*.py' Add a reload pattern
  devloop dev --no-hot-reload       Skip the live-reload shim

For more help, see: https://github.com/dufeutech/devloop";

#[derive(Parser)]
#[command(name = "devloop")]
#[command(version)]
#[command(about = "devloop CLI - Run a web app development session")]
#[command(
    long_about = "Development-loop orchestrator.\n\nStarts the application server and the asset-build watcher, multiplexes their output, and tears everything down when the session ends."
)]
#[command(after_help = AFTER_HELP)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose/debug output for any command
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the development session
    ///
    /// Launches the application server with reload patterns and the asset
    /// build tool in watch mode, multiplexing both into one console
    /// stream. The session ends on Ctrl+C or when the server dies.
    ///
    /// Examples:
    ///   devloop dev                    # devloop.toml or defaults
    ///   devloop dev --port 5000        # Custom port
    ///   devloop dev --no-assets        # Skip the asset watcher
    Dev {
        /// Application entry file (default: from devloop.toml or main.py)
        #[arg(short, long)]
        entry: Option<PathBuf>,
        /// Port for the HTTP server (default: from devloop.toml or 8000)
        #[arg(short, long)]
        port: Option<u16>,
        /// Glob pattern that triggers a server reload (repeatable)
        #[arg(long, value_name = "GLOB")]
        watch: Vec<String>,
        /// Skip the live-reload shim and serve the entry module directly
        #[arg(long)]
        no_hot_reload: bool,
        /// Run the server with debug logging
        #[arg(long)]
        debug: bool,
        /// Skip the asset-build watcher
        #[arg(long)]
        no_assets: bool,
    },
    /// Generate shell completions
    ///
    /// Outputs shell completion script to stdout.
    /// Add to your shell config for tab completion support.
    ///
    /// Examples:
    ///   devloop completions bash > ~/.bash_completion.d/devloop
    ///   devloop completions zsh > ~/.zfunc/_devloop
    ///   devloop completions fish > ~/.config/fish/completions/devloop.fish
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn print_completions<G: Generator>(generator: G, cmd: &mut clap::Command) {
    clap_complete::generate(
        generator,
        cmd,
        cmd.get_name().to_string(),
        &mut std::io::stdout(),
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle --verbose flag: set RUST_LOG=debug if not already set
    if cli.verbose && std::env::var("RUST_LOG").is_err() {
        // SAFETY: This is called at program startup before any threads are spawned,
        // so there are no concurrent reads/writes to environment variables.
        unsafe { std::env::set_var("RUST_LOG", "debug") };
    }

    // Handle missing subcommand
    let Some(command) = cli.command else {
        eprintln!("Error: A subcommand is required");
        eprintln!("Run 'devloop --help' for usage information");
        std::process::exit(1);
    };

    match command {
        Commands::Dev {
            entry,
            port,
            watch,
            no_hot_reload,
            debug,
            no_assets,
        } => {
            let options = commands::dev::DevOptions {
                entry,
                port,
                watch,
                no_hot_reload,
                debug,
                no_assets,
            };
            commands::dev::execute(options).await?;
        },
        Commands::Completions { shell } => {
            print_completions(shell, &mut Cli::command());
        },
    }

    Ok(())
}
