//! Search and filter commands.

use std::path::Path;

use cadaview::popup::popup_rows;

use crate::console::ConsoleView;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Locate a lot and print its attributes.
pub fn run_search(config_path: &Path, debug: bool, term: &str) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path, debug)?;
    runner.log_startup("search");

    let (mut session, _) = runner.start_session(ConsoleView::quiet())?;
    let found = session.search(term)?;

    let locale = session.config().popup.locale;
    let Some(layer) = session.registry().vector(&found.layer_id) else {
        return Err(CliError::LayerUnavailable(found.layer_id));
    };
    println!("Found in layer '{}' (feature {})", layer.name(), found.index);

    if let Some(feature) = layer.feature(found.index) {
        if let Some(bounds) = feature.bounds() {
            let (lat, lon) = bounds.center();
            println!("Location: {:.6}, {:.6}", lat, lon);
        }
        if let Some(properties) = feature.feature().properties.as_ref() {
            let rows = popup_rows(properties, locale);
            let width = rows.iter().map(|r| r.label.chars().count()).max().unwrap_or(0);
            println!();
            for row in rows {
                println!("  {:width$}  {}", row.label, row.value, width = width);
            }
        }
    }

    Ok(())
}

/// Apply an attribute filter to one layer and print the counts.
///
/// Without a value, prints the distinct values the filter could use.
pub fn run_filter(
    config_path: &Path,
    debug: bool,
    layer_id: &str,
    attribute: &str,
    value: Option<&str>,
) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path, debug)?;
    runner.log_startup("filter");

    let (mut session, _) = runner.start_session(ConsoleView::quiet())?;
    if session.registry().vector(layer_id).is_none() {
        return Err(CliError::LayerUnavailable(layer_id.to_string()));
    }

    match value {
        None => {
            let values = session.attribute_values(layer_id, attribute);
            if values.is_empty() {
                println!("No values for '{}' in layer '{}'", attribute, layer_id);
            }
            for value in values {
                println!("{}", value);
            }
        }
        Some(value) => {
            let outcome = session
                .filter(layer_id, attribute, value)
                .ok_or_else(|| CliError::LayerUnavailable(layer_id.to_string()))?;
            println!("Layer:   {}", layer_id);
            println!("Filter:  {} = {}", attribute, value);
            println!("Matched: {}", outcome.matched);
            println!("Dimmed:  {}", outcome.dimmed);
        }
    }

    Ok(())
}
