//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use cadaview::archive::ArchiveError;
use cadaview::config::ConfigFileError;
use cadaview::loader::FetchError;
use cadaview::search::SearchError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Invalid configuration key or value
    Config(String),
    /// Config file could not be read or written
    ConfigFile(ConfigFileError),
    /// Failed to build the document client
    Client(FetchError),
    /// Tile archive could not be opened or queried
    Archive { path: PathBuf, error: ArchiveError },
    /// No tile stored at the requested coordinate
    TileNotFound { zoom: u8, column: u32, row: u32 },
    /// Invalid command argument
    InvalidArgument(String),
    /// Layer not configured or failed to load
    LayerUnavailable(String),
    /// Search was rejected or found nothing
    Search(SearchError),
    /// Failed to write output file
    FileWrite { path: PathBuf, error: std::io::Error },
    /// One or more processing jobs failed
    Process { failed: usize, total: usize },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::LayerUnavailable(_) => {
                eprintln!();
                eprintln!("Check the [layer.*] sections of your config file.");
                eprintln!("Use 'cadaview config path' to locate it.");
            }
            CliError::Archive { .. } => {
                eprintln!();
                eprintln!("The file must be an MBTiles (SQLite) archive.");
            }
            CliError::Process { .. } => {
                eprintln!();
                eprintln!("Successful layers were written; see the log for details.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Client(e) => write!(f, "Failed to create document client: {}", e),
            CliError::Archive { path, error } => {
                write!(f, "Archive '{}': {}", path.display(), error)
            }
            CliError::TileNotFound { zoom, column, row } => {
                write!(f, "No tile stored at {}/{}/{}", zoom, column, row)
            }
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::LayerUnavailable(id) => write!(f, "Layer '{}' is not available", id),
            CliError::Search(e) => write!(f, "{}", e),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path.display(), error)
            }
            CliError::Process { failed, total } => {
                write!(f, "{} of {} layers failed to process", failed, total)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Client(e) => Some(e),
            CliError::Archive { error, .. } => Some(error),
            CliError::Search(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<SearchError> for CliError {
    fn from(e: SearchError) -> Self {
        CliError::Search(e)
    }
}
