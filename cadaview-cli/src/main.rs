//! Cadaview CLI - Command-line interface
//!
//! Drives the cadaview library from a terminal: configuration management,
//! MBTiles inspection, lot search, attribute filtering, layer export and
//! the data preparation pipeline.

mod commands;
mod console;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::tiles::TilesCommands;

#[derive(Parser)]
#[command(name = "cadaview")]
#[command(version)]
#[command(about = "Cadastral map viewer: tile overlays, parcel search and data preparation", long_about = None)]
struct Cli {
    /// Path to config file (default: ~/.cadaview/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default configuration file if none exists
    Init,

    /// View or modify configuration settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Inspect MBTiles archives
    Tiles {
        #[command(subcommand)]
        command: TilesCommands,
    },

    /// Load the configured layers and locate a lot by identifier
    Search {
        /// Lot number (or part of one)
        term: String,
    },

    /// Count features of a layer matching an attribute value
    Filter {
        /// Layer id (the suffix of its [layer.<id>] section)
        layer: String,

        /// Attribute to filter on
        attribute: String,

        /// Value to match; omit to list the distinct values
        value: Option<String>,
    },

    /// Export a loaded layer as GeoJSON
    Export {
        /// Layer id
        layer: String,

        /// Output format
        #[arg(long, default_value = "geojson")]
        format: String,

        /// Directory the export file is written to
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Simplify and clean raw GeoJSON exports into publishable layers
    Process,
}

fn main() {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .unwrap_or_else(cadaview::config::config_file_path);

    let result = match cli.command {
        Commands::Init => commands::init::run(&config_path),
        Commands::Config { command } => commands::config::run(command, &config_path),
        Commands::Tiles { command } => commands::tiles::run(command, cli.debug),
        Commands::Search { term } => commands::search::run_search(&config_path, cli.debug, &term),
        Commands::Filter {
            layer,
            attribute,
            value,
        } => commands::search::run_filter(
            &config_path,
            cli.debug,
            &layer,
            &attribute,
            value.as_deref(),
        ),
        Commands::Export {
            layer,
            format,
            output_dir,
        } => commands::export::run(&config_path, cli.debug, &layer, &format, &output_dir),
        Commands::Process => commands::process::run(&config_path, cli.debug),
    };

    if let Err(e) = result {
        e.exit();
    }
}
