use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod backend;
mod commands;
mod config;

/// vaultstate: inspect and prepare persisted wallet state.
///
/// Works on a single state file. `.db`, `.sqlite` and `.sqlite3` files are
/// opened as SQLite; anything else is read as a JSON document.
#[derive(Parser)]
#[command(name = "vaultstate", version, about, long_about = None)]
struct Cli {
    /// Path to a vaultstate.toml file. Defaults to ./vaultstate.toml if present.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version, storage kind and controller sizes.
    Status {
        /// Path to the state file.
        path: PathBuf,
    },

    /// List controllers, or print one controller's state.
    Inspect {
        /// Path to the state file.
        path: PathBuf,

        /// Controller to print. If omitted, lists all controllers.
        controller: Option<String>,
    },

    /// Print the whole state as JSON.
    Export {
        /// Path to the state file.
        path: PathBuf,
    },

    /// Check the state passes structural validation. Exits 1 if not.
    Check {
        /// Path to the state file.
        path: PathBuf,
    },

    /// Write a fresh state, as a new install would.
    Init {
        /// Path to the state file to create.
        path: PathBuf,

        /// JSON object with the initial controller states.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Version to stamp. Defaults to 0.
        #[arg(long)]
        version: Option<u32>,

        /// Mark the state as split (one record per controller).
        #[arg(long)]
        split: bool,

        /// Overwrite an existing state.
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Status { path } => commands::status(&path, &config).map(|_| true),
        Commands::Inspect { path, controller } => {
            commands::inspect(&path, controller.as_deref()).map(|_| true)
        }
        Commands::Export { path } => commands::export(&path).map(|_| true),
        Commands::Check { path } => commands::check(&path),
        Commands::Init {
            path,
            data,
            version,
            split,
            force,
        } => commands::init(
            &path,
            &config,
            commands::InitOptions {
                data: data.as_deref(),
                version: version.unwrap_or(0),
                split,
                force,
            },
        )
        .map(|_| true),
    }
}
