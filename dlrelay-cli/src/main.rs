//! dlrelay CLI
//!
//! Drives a Chrome DevTools session to download a file into an isolated
//! directory, then hands the finished file back on stdout or to a path.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::clean::CleanArgs;
use commands::config::ConfigCommands;
use commands::fetch::FetchArgs;

#[derive(Debug, Parser)]
#[command(name = "dlrelay", version = dlrelay::VERSION, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download a URL through the browser and write the file out
    Fetch {
        /// URL that triggers the download
        url: String,

        /// DevTools WebSocket URL of the page (overrides browser.cdp_url)
        #[arg(long)]
        cdp: Option<String>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stream the file chunk by chunk instead of as a whole file
        #[arg(long)]
        chunked: bool,

        /// Seconds to wait for the download to finish (overrides download.poll_timeout_secs)
        #[arg(long)]
        timeout: Option<u64>,

        /// Directory session folders are created in (overrides workspace.root)
        #[arg(long)]
        workspace: Option<PathBuf>,
    },

    /// Remove download directories left behind by interrupted runs
    Clean {
        /// Only remove directories older than this many seconds
        #[arg(long)]
        min_age: Option<u64>,

        /// Workspace to sweep (overrides workspace.root)
        #[arg(long)]
        workspace: Option<PathBuf>,
    },

    /// View or change configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Create the configuration file with defaults
    Init,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Fetch {
            url,
            cdp,
            output,
            chunked,
            timeout,
            workspace,
        } => commands::fetch::run(FetchArgs {
            url,
            cdp,
            output,
            chunked,
            timeout,
            workspace,
        }),
        Commands::Clean { min_age, workspace } => {
            commands::clean::run(CleanArgs { min_age, workspace })
        }
        Commands::Config { command } => commands::config::run(command),
        Commands::Init => commands::init::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
