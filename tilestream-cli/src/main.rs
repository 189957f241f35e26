//! Tilestream CLI - command-line access to the tile streaming library.
//!
//! Commands:
//! - `altitude`: terrain height at a point, blocking or progressively refined
//! - `prefetch`: stream every tile of a region at one level through the loaders
//! - `config`: inspect and edit `config.ini`

mod commands;
mod error;
mod runner;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::altitude::AltitudeArgs;
use commands::config::ConfigArgs;
use commands::prefetch::PrefetchArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "tilestream", version, about = "Quadtree tile streaming for planet-scale rasters")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Query terrain altitude at a point
    Altitude {
        /// Latitude in degrees, north positive
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude in degrees, east positive
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Load the finest tile directly instead of refining level by level
        #[arg(long)]
        blocking: bool,
    },

    /// Load every tile of a region at one level
    Prefetch {
        /// Quadtree level to load
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..=20))]
        level: u32,

        /// Western edge in degrees
        #[arg(long, allow_negative_numbers = true)]
        west: f64,

        /// Southern edge in degrees
        #[arg(long, allow_negative_numbers = true)]
        south: f64,

        /// Eastern edge in degrees
        #[arg(long, allow_negative_numbers = true)]
        east: f64,

        /// Northern edge in degrees
        #[arg(long, allow_negative_numbers = true)]
        north: f64,
    },

    /// View and modify configuration settings
    Config(ConfigArgs),
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Altitude { lat, lon, blocking } => {
            commands::altitude::run(AltitudeArgs { lat, lon, blocking })
        }
        Commands::Prefetch {
            level,
            west,
            south,
            east,
            north,
        } => commands::prefetch::run(PrefetchArgs {
            level,
            west,
            south,
            east,
            north,
        }),
        Commands::Config(args) => commands::config::run(args),
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
