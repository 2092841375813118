//! Data preparation pipeline.
//!
//! Turns raw GeoJSON or GeoPackage exports into the compact documents the
//! viewer loads. Each configured job runs these steps:
//!
//! 1. Check the source file exists
//! 2. Back up the previous output (keeping the newest few)
//! 3. Load the source features (`.gpkg` sources are read as GeoPackage)
//! 4. Count invalid geometries, then simplify, preserving topology
//! 5. Clean attributes
//! 6. Round coordinates
//! 7. Write compact JSON
//!
//! Jobs are independent: one failing job is logged and the others still run.
//! Sources must already be in WGS84 (EPSG:4326); no reprojection or
//! geometry repair is performed. Invalid geometries are only reported.

mod attributes;
mod backup;
mod geometry;
mod gpkg;

pub use attributes::{clean_attributes, TOOLING_ATTRIBUTE_PREFIX};
pub use backup::{backup_existing, backup_name, prune_backups, BACKUP_TIMESTAMP_FORMAT};
pub use geometry::{count_vertices, is_well_formed, round_coordinates, simplify};
pub use gpkg::{decode_geometry_blob, read_geopackage, GeoPackageError, GeometryBlobError};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use geojson::{FeatureCollection, GeoJson};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{ProcessJob, ProcessSettings};

/// Errors that can occur while processing one layer.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The raw source file does not exist.
    #[error("Source file not found: {0}")]
    SourceMissing(PathBuf),

    /// A filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source is not a GeoJSON FeatureCollection.
    #[error("Invalid GeoJSON in {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// The GeoPackage source could not be read.
    #[error("Invalid GeoPackage {path}: {source}")]
    GeoPackage {
        path: PathBuf,
        #[source]
        source: GeoPackageError,
    },

    /// The processed collection could not be serialized.
    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Backup rotation failed.
    #[error("Backup rotation failed: {0}")]
    Backup(String),
}

/// Statistics of one successful job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub layer: String,
    pub output: PathBuf,
    pub features: usize,
    /// Features whose geometry failed [`is_well_formed`]
    pub invalid_geometries: usize,
    pub vertices_before: usize,
    pub vertices_after: usize,
    /// Attributes on the first feature after cleanup
    pub attributes_kept: usize,
    pub bytes_written: u64,
    pub backup: Option<PathBuf>,
}

impl JobOutcome {
    /// Percentage of vertices removed by simplification.
    pub fn vertex_reduction(&self) -> Option<f64> {
        if self.vertices_before == 0 {
            return None;
        }
        Some(100.0 * (1.0 - self.vertices_after as f64 / self.vertices_before as f64))
    }
}

/// A job that did not complete.
#[derive(Debug)]
pub struct JobFailure {
    pub layer: String,
    pub error: ProcessError,
}

/// Result of running every configured job.
#[derive(Debug, Default)]
pub struct ProcessReport {
    pub succeeded: Vec<JobOutcome>,
    pub failed: Vec<JobFailure>,
}

impl ProcessReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs processing jobs with one set of settings.
#[derive(Debug, Clone)]
pub struct Processor {
    settings: ProcessSettings,
}

impl Processor {
    pub fn new(settings: ProcessSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ProcessSettings {
        &self.settings
    }

    pub fn source_path(&self, job: &ProcessJob) -> PathBuf {
        self.settings.raw_dir.join(&job.source)
    }

    pub fn output_path(&self, job: &ProcessJob) -> PathBuf {
        self.settings.processed_dir.join(&job.output)
    }

    /// Runs every configured job in order.
    pub fn run_all(&self) -> ProcessReport {
        info!(jobs = self.settings.jobs.len(), "Starting data processing");
        let mut report = ProcessReport::default();

        for job in &self.settings.jobs {
            match self.run_job(job) {
                Ok(outcome) => report.succeeded.push(outcome),
                Err(e) => {
                    error!(layer = %job.layer, error = %e, "Layer processing failed");
                    report.failed.push(JobFailure {
                        layer: job.layer.clone(),
                        error: e,
                    });
                }
            }
        }

        if report.is_success() {
            info!(succeeded = report.succeeded.len(), "All layers processed");
        } else {
            error!(
                succeeded = report.succeeded.len(),
                failed = report.failed.len(),
                "Some layers failed"
            );
        }
        report
    }

    /// Runs one job.
    pub fn run_job(&self, job: &ProcessJob) -> Result<JobOutcome, ProcessError> {
        let source = self.source_path(job);
        let output = self.output_path(job);
        info!(layer = %job.layer, source = %source.display(), "Processing layer");

        if !source.exists() {
            return Err(ProcessError::SourceMissing(source));
        }

        let backup = backup_existing(
            &output,
            &self.settings.backup_dir,
            self.settings.keep_backups,
            Local::now(),
        )?;

        let mut collection = read_collection(&source)?;
        let features = collection.features.len();
        info!(layer = %job.layer, features = features, "Features loaded");

        let invalid_geometries = count_invalid(&collection);
        if invalid_geometries > 0 {
            warn!(
                layer = %job.layer,
                invalid = invalid_geometries,
                "Invalid geometries found; simplifying them as-is"
            );
        }

        let (vertices_before, vertices_after) =
            self.simplify_collection(&mut collection, &job.layer);

        let mut attributes_kept = 0;
        for (i, feature) in collection.features.iter_mut().enumerate() {
            if let Some(properties) = feature.properties.as_mut() {
                clean_attributes(properties, &self.settings.attributes_to_keep);
                if i == 0 {
                    attributes_kept = properties.len();
                }
            }
            if let Some(geometry) = feature.geometry.as_mut() {
                round_coordinates(&mut geometry.value, self.settings.precision);
            }
        }

        let bytes_written = write_compact(&collection, &output)?;
        info!(
            layer = %job.layer,
            output = %output.display(),
            size_kb = format!("{:.2}", bytes_written as f64 / 1024.0),
            "Layer written"
        );

        Ok(JobOutcome {
            layer: job.layer.clone(),
            output,
            features,
            invalid_geometries,
            vertices_before,
            vertices_after,
            attributes_kept,
            bytes_written,
            backup,
        })
    }

    /// Simplifies every geometry in parallel; returns vertex counts before
    /// and after.
    fn simplify_collection(&self, collection: &mut FeatureCollection, layer: &str) -> (usize, usize) {
        let tolerance = self.settings.simplify_tolerance;

        let counts: Vec<(usize, usize)> = collection
            .features
            .par_iter_mut()
            .map(|feature| {
                let Some(geometry) = feature.geometry.as_mut() else {
                    return (0, 0);
                };
                let converted: Result<geo_types::Geometry<f64>, _> =
                    geometry.value.clone().try_into();
                match converted {
                    Ok(geo) => {
                        let simplified = simplify(&geo, tolerance);
                        let counts = (count_vertices(&geo), count_vertices(&simplified));
                        geometry.value = geojson::Value::from(&simplified);
                        counts
                    }
                    Err(e) => {
                        warn!(error = %e, "Geometry left unsimplified");
                        (0, 0)
                    }
                }
            })
            .collect();

        let before: usize = counts.iter().map(|c| c.0).sum();
        let after: usize = counts.iter().map(|c| c.1).sum();
        if before > 0 {
            info!(
                layer = layer,
                tolerance = tolerance,
                before = before,
                after = after,
                reduction = format!("{:.1}%", 100.0 * (1.0 - after as f64 / before as f64)),
                "Geometries simplified"
            );
        }
        (before, after)
    }
}

/// Features whose geometry is malformed or cannot be converted.
fn count_invalid(collection: &FeatureCollection) -> usize {
    collection
        .features
        .iter()
        .filter_map(|feature| feature.geometry.as_ref())
        .filter(|geometry| {
            let converted: Result<geo_types::Geometry<f64>, _> = geometry.value.clone().try_into();
            !converted.is_ok_and(|g| is_well_formed(&g))
        })
        .count()
}

fn is_geopackage(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gpkg"))
}

fn read_collection(path: &Path) -> Result<FeatureCollection, ProcessError> {
    if is_geopackage(path) {
        return read_geopackage(path).map_err(|source| ProcessError::GeoPackage {
            path: path.to_path_buf(),
            source,
        });
    }

    let text = fs::read_to_string(path).map_err(|source| ProcessError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_error = |reason: String| ProcessError::Parse {
        path: path.to_path_buf(),
        reason,
    };
    match text.parse::<GeoJson>().map_err(|e| parse_error(e.to_string()))? {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        _ => Err(parse_error("expected a FeatureCollection".to_string())),
    }
}

/// Writes `collection` without whitespace, replacing `path` atomically.
fn write_compact(collection: &FeatureCollection, path: &Path) -> Result<u64, ProcessError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let io_error = |source| ProcessError::Io {
        path: path.to_path_buf(),
        source,
    };

    fs::create_dir_all(&dir).map_err(io_error)?;
    let bytes = serde_json::to_vec(collection)?;

    let mut staged = tempfile::NamedTempFile::new_in(&dir).map_err(io_error)?;
    staged.write_all(&bytes).map_err(io_error)?;
    staged.persist(path).map_err(|e| io_error(e.error))?;

    Ok(bytes.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RAW: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature",
         "properties": {"__fid": 3, "num_lot": "12", "surface": 150.5},
         "geometry": {"type": "LineString", "coordinates": [
            [0.0, 0.0], [1.0, 0.0000001], [2.0, 0.0], [3.123456789, 0.0]
         ]}},
        {"type": "Feature", "properties": {"num_lot": "13"}, "geometry": null}
    ]}"#;

    fn settings(root: &Path) -> ProcessSettings {
        ProcessSettings {
            raw_dir: root.join("raw"),
            processed_dir: root.join("processed"),
            backup_dir: root.join("backup"),
            simplify_tolerance: 0.001,
            precision: 6,
            keep_backups: 3,
            attributes_to_keep: Vec::new(),
            jobs: vec![
                ProcessJob {
                    layer: "lots".to_string(),
                    source: "LOTS.geojson".to_string(),
                    output: "lots.geojson".to_string(),
                    description: String::new(),
                },
                ProcessJob {
                    layer: "ilots".to_string(),
                    source: "ILOTS.geojson".to_string(),
                    output: "ilots.geojson".to_string(),
                    description: String::new(),
                },
            ],
        }
    }

    #[test]
    fn test_missing_source_fails_only_that_job() {
        let temp = TempDir::new().unwrap();
        let settings = settings(temp.path());
        fs::create_dir_all(&settings.raw_dir).unwrap();
        fs::write(settings.raw_dir.join("LOTS.geojson"), RAW).unwrap();

        let report = Processor::new(settings).run_all();

        assert_eq!(report.total(), 2);
        assert_eq!(report.succeeded.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].layer, "ilots");
        assert!(matches!(report.failed[0].error, ProcessError::SourceMissing(_)));
        assert!(!report.is_success());
    }

    #[test]
    fn test_output_is_compact_cleaned_and_rounded() {
        let temp = TempDir::new().unwrap();
        let settings = settings(temp.path());
        fs::create_dir_all(&settings.raw_dir).unwrap();
        fs::write(settings.raw_dir.join("LOTS.geojson"), RAW).unwrap();
        let processor = Processor::new(settings);

        let outcome = processor.run_job(&processor.settings().jobs[0]).unwrap();
        assert_eq!(outcome.features, 2);
        assert_eq!(outcome.vertices_before, 4);
        assert!(outcome.vertices_after < 4);
        assert_eq!(outcome.attributes_kept, 2);

        let text = fs::read_to_string(&outcome.output).unwrap();
        assert!(!text.contains('\n'));
        assert!(!text.contains(": "));
        assert!(!text.contains("__fid"));
        assert!(text.contains("3.123457"));
        assert_eq!(outcome.bytes_written, text.len() as u64);
    }

    #[test]
    fn test_rerun_backs_up_previous_output() {
        let temp = TempDir::new().unwrap();
        let settings = settings(temp.path());
        fs::create_dir_all(&settings.raw_dir).unwrap();
        fs::write(settings.raw_dir.join("LOTS.geojson"), RAW).unwrap();
        let processor = Processor::new(settings);
        let job = processor.settings().jobs[0].clone();

        let first = processor.run_job(&job).unwrap();
        assert!(first.backup.is_none());

        let second = processor.run_job(&job).unwrap();
        let backup = second.backup.unwrap();
        assert!(backup.exists());
        assert!(backup.starts_with(&processor.settings().backup_dir));
    }

    #[test]
    fn test_non_collection_source_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let settings = settings(temp.path());
        fs::create_dir_all(&settings.raw_dir).unwrap();
        fs::write(
            settings.raw_dir.join("LOTS.geojson"),
            r#"{"type": "Point", "coordinates": [1, 2]}"#,
        )
        .unwrap();
        let processor = Processor::new(settings);

        let result = processor.run_job(&processor.settings().jobs[0]);
        assert!(matches!(result, Err(ProcessError::Parse { .. })));
    }

    #[test]
    fn test_invalid_geometries_are_counted() {
        let temp = TempDir::new().unwrap();
        let settings = settings(temp.path());
        fs::create_dir_all(&settings.raw_dir).unwrap();
        fs::write(
            settings.raw_dir.join("LOTS.geojson"),
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {"num_lot": "1"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 1]]]}},
                {"type": "Feature", "properties": {"num_lot": "2"},
                 "geometry": {"type": "Point", "coordinates": [2.3, 48.8]}}
            ]}"#,
        )
        .unwrap();
        let processor = Processor::new(settings);

        let outcome = processor.run_job(&processor.settings().jobs[0]).unwrap();
        assert_eq!(outcome.features, 2);
        assert_eq!(outcome.invalid_geometries, 1);
    }

    fn write_geopackage(path: &Path) {
        let conn = rusqlite::Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE gpkg_contents (table_name TEXT PRIMARY KEY, data_type TEXT NOT NULL);
             CREATE TABLE gpkg_geometry_columns (
                table_name TEXT, column_name TEXT, geometry_type_name TEXT, srs_id INTEGER);
             INSERT INTO gpkg_contents VALUES ('ilots', 'features');
             INSERT INTO gpkg_geometry_columns VALUES ('ilots', 'geom', 'POINT', 4326);
             CREATE TABLE ilots (fid INTEGER PRIMARY KEY, geom BLOB, __edit TEXT, nom TEXT);",
        )
        .unwrap();

        // Little-endian GeoPackage header without envelope, then a WKB point
        let mut blob = b"GP\0\x01".to_vec();
        blob.extend_from_slice(&4326i32.to_le_bytes());
        blob.push(1);
        blob.extend_from_slice(&1u32.to_le_bytes());
        blob.extend_from_slice(&2.123456789f64.to_le_bytes());
        blob.extend_from_slice(&48.5f64.to_le_bytes());
        conn.execute(
            "INSERT INTO ilots (geom, __edit, nom) VALUES (?1, 'x', 'Ilot A')",
            [blob],
        )
        .unwrap();
    }

    #[test]
    fn test_geopackage_source_is_processed() {
        let temp = TempDir::new().unwrap();
        let mut settings = settings(temp.path());
        fs::create_dir_all(&settings.raw_dir).unwrap();
        settings.jobs[1].source = "ILOTS.gpkg".to_string();
        write_geopackage(&settings.raw_dir.join("ILOTS.gpkg"));
        let processor = Processor::new(settings);

        let outcome = processor.run_job(&processor.settings().jobs[1]).unwrap();
        assert_eq!(outcome.features, 1);
        assert_eq!(outcome.invalid_geometries, 0);
        assert_eq!(outcome.vertices_before, 1);

        let text = fs::read_to_string(&outcome.output).unwrap();
        assert!(text.contains(r#""nom":"Ilot A""#));
        assert!(text.contains("[2.123457,48.5]"));
        assert!(!text.contains("__edit"));
        assert!(!text.contains("fid"));
    }

    #[test]
    fn test_corrupt_geopackage_is_error() {
        let temp = TempDir::new().unwrap();
        let mut settings = settings(temp.path());
        fs::create_dir_all(&settings.raw_dir).unwrap();
        settings.jobs[0].source = "LOTS.GPKG".to_string();
        fs::write(settings.raw_dir.join("LOTS.GPKG"), b"garbage").unwrap();
        let processor = Processor::new(settings);

        let result = processor.run_job(&processor.settings().jobs[0]);
        assert!(matches!(result, Err(ProcessError::GeoPackage { .. })));
    }

    #[test]
    fn test_vertex_reduction() {
        let outcome = JobOutcome {
            layer: "x".to_string(),
            output: PathBuf::new(),
            features: 1,
            invalid_geometries: 0,
            vertices_before: 200,
            vertices_after: 50,
            attributes_kept: 0,
            bytes_written: 0,
            backup: None,
        };
        assert_eq!(outcome.vertex_reduction(), Some(75.0));
    }
}
