//! FloorTrack CLI - command-line interface
//!
//! Front end for the floortrack library: runs the ingestion engine
//! against a scene document and validates scene files.

mod commands;
mod error;

use clap::{Parser, Subcommand};

use commands::run::RunArgs;
use commands::validate::ValidateArgs;

#[derive(Debug, Parser)]
#[command(
    name = "floortrack",
    version = floortrack::VERSION,
    about = "Real-time indoor positioning and geofencing engine"
)]
struct Cli {
    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the ingestion engine against a scene
    Run(RunArgs),
    /// Validate a scene document and exit
    Validate(ValidateArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args, cli.verbose),
        Commands::Validate(args) => commands::validate::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
