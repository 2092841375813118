//! Timestamped backups of processed outputs.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, info};

use super::ProcessError;

/// Timestamp format embedded in backup names.
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Name of the backup of `output` taken at `at`: `<stem>_<timestamp><ext>`.
pub fn backup_name(output: &Path, at: DateTime<Local>) -> String {
    let (stem, extension) = stem_and_extension(output);
    format!("{}_{}{}", stem, at.format(BACKUP_TIMESTAMP_FORMAT), extension)
}

/// Copies `output` into `backup_dir` and prunes old backups.
///
/// Does nothing when `output` does not exist. Only the newest `keep`
/// backups of that file survive. Returns the path of the new backup.
pub fn backup_existing(
    output: &Path,
    backup_dir: &Path,
    keep: usize,
    at: DateTime<Local>,
) -> Result<Option<PathBuf>, ProcessError> {
    if !output.exists() {
        debug!(path = %output.display(), "Nothing to back up");
        return Ok(None);
    }

    fs::create_dir_all(backup_dir).map_err(|source| ProcessError::Io {
        path: backup_dir.to_path_buf(),
        source,
    })?;

    let backup_path = backup_dir.join(backup_name(output, at));
    fs::copy(output, &backup_path).map_err(|source| ProcessError::Io {
        path: backup_path.clone(),
        source,
    })?;
    info!(backup = %backup_path.display(), "Backup created");

    prune_backups(output, backup_dir, keep)?;
    Ok(Some(backup_path))
}

/// Deletes all but the newest `keep` backups of `output`.
///
/// Backups sort chronologically by name thanks to the timestamp format.
/// Returns the deleted paths.
pub fn prune_backups(
    output: &Path,
    backup_dir: &Path,
    keep: usize,
) -> Result<Vec<PathBuf>, ProcessError> {
    let (stem, extension) = stem_and_extension(output);
    let pattern = backup_dir.join(format!(
        "{}_*{}",
        glob::Pattern::escape(&stem),
        glob::Pattern::escape(&extension)
    ));
    let pattern = pattern.to_string_lossy().into_owned();

    let entries = glob::glob(&pattern).map_err(|e| ProcessError::Backup(e.to_string()))?;
    let mut backups: Vec<PathBuf> = entries.filter_map(Result::ok).collect();
    backups.sort();

    let excess = backups.len().saturating_sub(keep);
    let mut removed = Vec::with_capacity(excess);
    for old in backups.into_iter().take(excess) {
        fs::remove_file(&old).map_err(|source| ProcessError::Io {
            path: old.clone(),
            source,
        })?;
        info!(backup = %old.display(), "Old backup removed");
        removed.push(old);
    }
    Ok(removed)
}

fn stem_and_extension(path: &Path) -> (String, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (stem, extension)
}
