//! Export command - write a loaded layer to disk.

use std::path::Path;

use cadaview::export::ExportFormat;

use crate::console::ConsoleView;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the export command.
pub fn run(
    config_path: &Path,
    debug: bool,
    layer_id: &str,
    format: &str,
    output_dir: &Path,
) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path, debug)?;
    runner.log_startup("export");

    let format: ExportFormat = match format.parse() {
        Ok(format) => format,
        Err(never) => match never {},
    };
    if let ExportFormat::Other(name) = &format {
        println!("Format '{}' is not supported yet; writing GeoJSON", name);
    }

    let (mut session, _) = runner.start_session(ConsoleView::quiet())?;
    let document = session
        .export(layer_id, &format)
        .ok_or_else(|| CliError::LayerUnavailable(layer_id.to_string()))?;

    std::fs::create_dir_all(output_dir).map_err(|error| CliError::FileWrite {
        path: output_dir.to_path_buf(),
        error,
    })?;

    for download in session.view_mut().take_downloads() {
        let path = output_dir.join(&download.filename);
        std::fs::write(&path, &download.bytes).map_err(|error| CliError::FileWrite {
            path: path.clone(),
            error,
        })?;
        println!(
            "Exported {} features ({} bytes) to {}",
            document.feature_count,
            download.bytes.len(),
            path.display()
        );
    }

    Ok(())
}
