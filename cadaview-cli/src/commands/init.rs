//! Init command - initialize configuration file.

use std::path::Path;

use cadaview::config::ConfigFile;

use crate::error::CliError;

/// Run the init command.
pub fn run(config_path: &Path) -> Result<(), CliError> {
    if ConfigFile::ensure_exists_at(config_path)? {
        println!("Created configuration file: {}", config_path.display());
    } else {
        println!("Configuration file already exists: {}", config_path.display());
    }
    println!();
    println!("Edit this file to declare your layers, overlays and processing jobs.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_then_keeps_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.ini");

        run(&path).unwrap();
        assert!(path.exists());

        std::fs::write(&path, "[search]\nidentifier_attribute = lot_id\n").unwrap();
        run(&path).unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.search.identifier_attribute, "lot_id");
    }
}
