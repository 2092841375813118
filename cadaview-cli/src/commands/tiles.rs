//! MBTiles inspection commands.

use std::path::{Path, PathBuf};

use cadaview::archive::MbTilesArchive;
use cadaview::coord::{tile_bounds, to_tile_coords};
use clap::Subcommand;

use crate::error::CliError;

/// Tiles subcommands.
#[derive(Debug, Subcommand)]
pub enum TilesCommands {
    /// Show an archive's metadata and zoom range
    Info {
        /// Path to the .mbtiles file
        archive: PathBuf,
    },

    /// Extract one tile by XYZ coordinate
    Get {
        /// Path to the .mbtiles file
        archive: PathBuf,
        /// Zoom level
        z: u8,
        /// Column
        x: u32,
        /// Row, counted from the north (XYZ)
        y: u32,
        /// File the tile is written to
        #[arg(long, short)]
        output: PathBuf,
    },

    /// Show the tile containing a coordinate
    Locate {
        /// Latitude in decimal degrees
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        /// Longitude in decimal degrees
        #[arg(allow_negative_numbers = true)]
        lon: f64,
        /// Zoom level
        zoom: u8,
    },
}

/// Run a tiles subcommand.
pub fn run(command: TilesCommands, debug: bool) -> Result<(), CliError> {
    match command {
        TilesCommands::Info { archive } => run_info(&archive, debug),
        TilesCommands::Get {
            archive,
            z,
            x,
            y,
            output,
        } => run_get(&archive, z, x, y, &output),
        TilesCommands::Locate { lat, lon, zoom } => run_locate(lat, lon, zoom),
    }
}

fn open(path: &Path) -> Result<MbTilesArchive, CliError> {
    MbTilesArchive::open_path(path).map_err(|error| CliError::Archive {
        path: path.to_path_buf(),
        error,
    })
}

fn run_info(path: &Path, debug: bool) -> Result<(), CliError> {
    let archive = open(path)?;
    let archive_error = |error| CliError::Archive {
        path: path.to_path_buf(),
        error,
    };
    let metadata = archive.read_metadata().map_err(archive_error)?;
    let range = archive.zoom_range();

    println!("Archive: {}", path.display());
    println!("  Zoom range: {}-{}", range.min, range.max);
    if debug {
        println!("  Tiles:      {}", archive.tile_count().map_err(archive_error)?);
    }

    if metadata.is_empty() {
        println!("  (no metadata)");
    } else {
        println!();
        println!("Metadata:");
        let width = metadata.keys().map(String::len).max().unwrap_or(0);
        for (name, value) in &metadata {
            println!("  {:width$}  {}", name, value, width = width);
        }
    }

    Ok(())
}

fn run_get(path: &Path, zoom: u8, column: u32, row: u32, output: &Path) -> Result<(), CliError> {
    let archive = open(path)?;
    let tile = archive
        .resolve_tile(zoom, column, row)
        .map_err(|error| CliError::Archive {
            path: path.to_path_buf(),
            error,
        })?
        .ok_or(CliError::TileNotFound { zoom, column, row })?;

    std::fs::write(output, &tile).map_err(|error| CliError::FileWrite {
        path: output.to_path_buf(),
        error,
    })?;

    println!(
        "Wrote tile {}/{}/{} ({} bytes) to {}",
        zoom,
        column,
        row,
        tile.len(),
        output.display()
    );
    Ok(())
}

fn run_locate(lat: f64, lon: f64, zoom: u8) -> Result<(), CliError> {
    let tile = to_tile_coords(lat, lon, zoom)
        .map_err(|e| CliError::InvalidArgument(e.to_string()))?;
    let bounds = tile_bounds(&tile);

    println!("Tile (XYZ): {}", tile);
    if let Some(archive_row) = tile.archive_row() {
        println!("Archive row (TMS): {}", archive_row);
    }
    println!(
        "Bounds: [{:.6}, {:.6}] - [{:.6}, {:.6}]",
        bounds.min_lon, bounds.min_lat, bounds.max_lon, bounds.max_lat
    );
    Ok(())
}
