//! Process command - run the data preparation pipeline.

use std::path::Path;

use cadaview::process::Processor;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run every configured processing job and print a summary.
pub fn run(config_path: &Path, debug: bool) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path, debug)?;
    runner.log_startup("process");

    let settings = runner.config().process.clone();
    if settings.jobs.is_empty() {
        println!("No processing jobs configured.");
        return Ok(());
    }

    println!("Raw data:       {}", settings.raw_dir.display());
    println!("Processed data: {}", settings.processed_dir.display());
    println!();

    let report = Processor::new(settings).run_all();

    for outcome in &report.succeeded {
        let reduction = outcome
            .vertex_reduction()
            .map(|r| format!("{:.1}%", r))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  OK    {:<12} {:>6} features  vertices {} -> {} ({})  {:.2} KB",
            outcome.layer,
            outcome.features,
            outcome.vertices_before,
            outcome.vertices_after,
            reduction,
            outcome.bytes_written as f64 / 1024.0
        );
    }
    for outcome in report.succeeded.iter().filter(|o| o.invalid_geometries > 0) {
        println!(
            "  WARN  {:<12} {} invalid geometries (left as-is)",
            outcome.layer, outcome.invalid_geometries
        );
    }
    for failure in &report.failed {
        println!("  FAIL  {:<12} {}", failure.layer, failure.error);
    }

    println!();
    if report.is_success() {
        println!("All {} layers processed.", report.total());
        Ok(())
    } else {
        Err(CliError::Process {
            failed: report.failed.len(),
            total: report.total(),
        })
    }
}
