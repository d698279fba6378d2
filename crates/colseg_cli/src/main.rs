//! colseg CLI
//!
//! Command-line tools for colseg storage directories.
//!
//! # Commands
//!
//! - `status` - Report whether an engine holds the directory lock
//! - `ls` - List the segment files in the directory
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// colseg storage directory tools.
#[derive(Parser)]
#[command(name = "colseg")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the storage directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report whether the directory is locked by a running engine
    ///
    /// The check takes the directory lock for a moment and releases it
    /// again. An engine opening the directory at that exact moment fails
    /// with "directory locked", so avoid polling a directory that is being
    /// opened.
    Status {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List segment files
    Ls {
        /// Only show files of this type (unsorted, sorted)
        #[arg(short = 't', long = "type")]
        file_type: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Status { format } => {
            let path = cli.path.ok_or("Storage path required for status")?;
            commands::status::run(&path, &format)?;
        }
        Commands::Ls { file_type, format } => {
            let path = cli.path.ok_or("Storage path required for ls")?;
            commands::ls::run(&path, file_type.as_deref(), &format)?;
        }
        Commands::Version => {
            println!("colseg CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("colseg core v{}", colseg_core::VERSION);
        }
    }

    Ok(())
}
