//! Shared setup for commands that load data.
//!
//! Loads the config file, initializes logging and owns the async runtime
//! used to fetch layers.

use std::path::{Path, PathBuf};

use cadaview::config::ConfigFile;
use cadaview::loader::AnyDocumentClient;
use cadaview::logging::{default_log_file, init_logging, LoggingGuard};
use cadaview::session::{MapSession, StartReport};
use tokio::runtime::Runtime;
use tracing::info;

use crate::console::ConsoleView;
use crate::error::CliError;

pub struct CliRunner {
    config: ConfigFile,
    config_path: PathBuf,
    runtime: Runtime,
    _logging_guard: LoggingGuard,
}

impl CliRunner {
    pub fn new(config_path: &Path, debug: bool) -> Result<Self, CliError> {
        let config = ConfigFile::load_from(config_path)?;

        let log_file = &config.logging.file;
        let log_dir = log_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let log_name = log_file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_else(|| default_log_file());
        let guard = init_logging(log_dir, log_name, debug)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| CliError::Config(format!("Failed to start async runtime: {}", e)))?;

        Ok(Self {
            config,
            config_path: config_path.to_path_buf(),
            runtime,
            _logging_guard: guard,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn log_startup(&self, command: &str) {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            command = command,
            config = %self.config_path.display(),
            "cadaview starting"
        );
    }

    /// Loads every configured layer into a new session.
    ///
    /// Relative layer URLs resolve against the working directory.
    pub fn start_session(
        &self,
        view: ConsoleView,
    ) -> Result<(MapSession<ConsoleView>, StartReport), CliError> {
        let client = AnyDocumentClient::new(self.config.loader.timeout, ".")
            .map_err(CliError::Client)?;
        let mut session = MapSession::new(self.config.clone(), view);
        let report = self.runtime.block_on(session.start(&client));
        Ok((session, report))
    }
}
