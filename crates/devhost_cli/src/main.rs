//! devhost CLI
//!
//! Local development server and filetree snapshot tools.
//!
//! # Commands
//!
//! - `serve` - Serve the project root and its write endpoints
//! - `filetree` - Write a fresh filetree snapshot, optionally on every change
//! - `reset-build` - Reset the snapshot's build marker

mod commands;

use clap::{Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Local development server with guestbook and filetree endpoints.
#[derive(Parser)]
#[command(name = "devhost")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project root directory
    #[arg(global = true, short, long, default_value = ".")]
    root: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve static files and the write endpoints
    Serve {
        /// Address to bind to
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: IpAddr,

        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Do not mirror guestbook changes even if GITHUB_TOKEN is set
        #[arg(long)]
        no_mirror: bool,
    },

    /// Write filetree.json for the project root
    Filetree {
        /// Keep running and rewrite the snapshot whenever the tree changes
        #[arg(short, long)]
        watch: bool,

        /// Polling interval in seconds for --watch
        #[arg(short, long, default_value = "2.5")]
        interval: f64,

        /// Extra names to skip, on top of .git and node_modules
        #[arg(short, long)]
        exclude: Vec<String>,
    },

    /// Reset build to 1 and buildTime to now in filetree.json
    ResetBuild,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flag.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve {
            bind,
            port,
            no_mirror,
        } => {
            commands::serve::run(&cli.root, (bind, port).into(), !no_mirror)?;
        }
        Commands::Filetree {
            watch,
            interval,
            exclude,
        } => {
            let options = commands::filetree::options(exclude);
            if watch {
                let interval = commands::filetree::interval(interval)?;
                commands::filetree::watch(&cli.root, &options, interval)?;
            } else {
                commands::filetree::run(&cli.root, &options)?;
            }
        }
        Commands::ResetBuild => {
            commands::reset_build::run(&cli.root)?;
        }
    }

    Ok(())
}
