//! GeoPackage source reader.
//!
//! Reads the first feature table of a `.gpkg` file into a GeoJSON
//! `FeatureCollection`. Geometry blobs carry a GeoPackage header followed by
//! ISO WKB; Z and M ordinates are dropped. The table's primary key is not
//! copied into the properties.

use std::path::Path;

use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use geojson::{Feature, FeatureCollection, JsonObject};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// SRS identifier of WGS84 in `gpkg_spatial_ref_sys`.
const WGS84_SRS_ID: i64 = 4326;

/// Collections nested deeper than this are rejected.
const MAX_NESTING: usize = 32;

const FEATURE_TABLE_QUERY: &str = "SELECT c.table_name, g.column_name, g.srs_id \
     FROM gpkg_contents c \
     JOIN gpkg_geometry_columns g ON g.table_name = c.table_name \
     WHERE c.data_type = 'features' \
     ORDER BY c.table_name";

const PRIMARY_KEY_QUERY: &str = "SELECT name FROM pragma_table_info(?1) WHERE pk > 0";

/// Errors reading a GeoPackage source.
#[derive(Debug, Error)]
pub enum GeoPackageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("no feature table declared in gpkg_contents")]
    NoFeatureTable,

    #[error("feature {row}: {source}")]
    Geometry {
        row: usize,
        #[source]
        source: GeometryBlobError,
    },
}

/// Errors decoding one geometry blob.
#[derive(Debug, Error, PartialEq)]
pub enum GeometryBlobError {
    #[error("missing GP magic bytes")]
    NotGeoPackage,

    #[error("extended geometry blobs are not supported")]
    Extended,

    #[error("invalid envelope indicator {0}")]
    Envelope(u8),

    #[error("blob truncated at byte {0}")]
    Truncated(usize),

    #[error("invalid byte order marker {0}")]
    ByteOrder(u8),

    #[error("unsupported WKB geometry type {0}")]
    UnsupportedType(u32),

    #[error("geometry collections nested too deeply")]
    TooDeep,
}

/// Feature table located through the GeoPackage metadata tables.
#[derive(Debug)]
struct FeatureTable {
    name: String,
    geometry_column: String,
    srs_id: i64,
}

/// Reads the first feature table of the GeoPackage at `path`.
pub fn read_geopackage(path: &Path) -> Result<FeatureCollection, GeoPackageError> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    let tables = feature_tables(&conn)?;
    let table = tables.into_iter().next().ok_or(GeoPackageError::NoFeatureTable)?;
    if table.srs_id != WGS84_SRS_ID {
        warn!(
            table = %table.name,
            srs_id = table.srs_id,
            "Source is not declared as WGS84; coordinates are used as-is"
        );
    }

    let primary_keys: Vec<String> = {
        let mut stmt = conn.prepare(PRIMARY_KEY_QUERY)?;
        let names = stmt.query_map(params![table.name], |row| row.get(0))?;
        names.collect::<Result<_, _>>()?
    };

    let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quote_identifier(&table.name)))?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();

    let mut features = Vec::new();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let index = features.len();
        let mut geometry = None;
        let mut properties = JsonObject::new();

        for (i, column) in columns.iter().enumerate() {
            let value = row.get_ref(i)?;
            if *column == table.geometry_column {
                if let ValueRef::Blob(blob) = value {
                    geometry = decode_geometry_blob(blob)
                        .map_err(|source| GeoPackageError::Geometry { row: index, source })?
                        .map(|g| geojson::Geometry::new(geojson::Value::from(&g)));
                }
            } else if !primary_keys.contains(column) {
                properties.insert(column.clone(), json_value(value));
            }
        }

        features.push(Feature {
            bbox: None,
            geometry,
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
    }

    debug!(table = %table.name, features = features.len(), "GeoPackage table read");
    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

fn feature_tables(conn: &Connection) -> Result<Vec<FeatureTable>, GeoPackageError> {
    let mut stmt = conn.prepare(FEATURE_TABLE_QUERY)?;
    let tables = stmt
        .query_map([], |row| {
            Ok(FeatureTable {
                name: row.get(0)?,
                geometry_column: row.get(1)?,
                srs_id: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    if tables.len() > 1 {
        warn!(
            tables = tables.len(),
            used = %tables[0].name,
            "Several feature tables found; reading the first"
        );
    }
    Ok(tables)
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
    }
}

/// Decodes a GeoPackage geometry blob; `None` for an empty geometry.
pub fn decode_geometry_blob(blob: &[u8]) -> Result<Option<Geometry<f64>>, GeometryBlobError> {
    if blob.len() < 8 {
        return Err(GeometryBlobError::Truncated(blob.len()));
    }
    if &blob[0..2] != b"GP" {
        return Err(GeometryBlobError::NotGeoPackage);
    }
    let flags = blob[3];
    if flags & 0b0010_0000 != 0 {
        return Err(GeometryBlobError::Extended);
    }
    let indicator = (flags >> 1) & 0b111;
    let envelope_len = match indicator {
        0 => 0,
        1 => 32,
        2 | 3 => 48,
        4 => 64,
        other => return Err(GeometryBlobError::Envelope(other)),
    };
    if flags & 0b0001_0000 != 0 {
        return Ok(None);
    }

    let start = 8 + envelope_len;
    if blob.len() <= start {
        return Err(GeometryBlobError::Truncated(blob.len()));
    }
    let mut reader = WkbReader {
        bytes: blob,
        pos: start,
    };
    reader.geometry(0).map(Some)
}

/// Cursor over ISO WKB.
struct WkbReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl WkbReader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], GeometryBlobError> {
        let end = self.pos + N;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(GeometryBlobError::Truncated(self.pos))?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn u32(&mut self, little_endian: bool) -> Result<u32, GeometryBlobError> {
        let bytes = self.take::<4>()?;
        Ok(if little_endian {
            u32::from_le_bytes(bytes)
        } else {
            u32::from_be_bytes(bytes)
        })
    }

    fn f64(&mut self, little_endian: bool) -> Result<f64, GeometryBlobError> {
        let bytes = self.take::<8>()?;
        Ok(if little_endian {
            f64::from_le_bytes(bytes)
        } else {
            f64::from_be_bytes(bytes)
        })
    }

    /// Reads an element count, rejecting counts the remaining bytes cannot hold.
    fn count(
        &mut self,
        little_endian: bool,
        min_item_len: usize,
    ) -> Result<usize, GeometryBlobError> {
        let count = self.u32(little_endian)? as usize;
        let remaining = self.bytes.len().saturating_sub(self.pos);
        if count.saturating_mul(min_item_len) > remaining {
            return Err(GeometryBlobError::Truncated(self.bytes.len()));
        }
        Ok(count)
    }

    fn coord(
        &mut self,
        little_endian: bool,
        dims: usize,
    ) -> Result<Coord<f64>, GeometryBlobError> {
        let x = self.f64(little_endian)?;
        let y = self.f64(little_endian)?;
        for _ in 2..dims {
            self.f64(little_endian)?;
        }
        Ok(Coord { x, y })
    }

    fn line(
        &mut self,
        little_endian: bool,
        dims: usize,
    ) -> Result<LineString<f64>, GeometryBlobError> {
        let n = self.count(little_endian, dims * 8)?;
        let coords = (0..n)
            .map(|_| self.coord(little_endian, dims))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LineString::new(coords))
    }

    fn polygon(
        &mut self,
        little_endian: bool,
        dims: usize,
    ) -> Result<Polygon<f64>, GeometryBlobError> {
        let n = self.count(little_endian, 4)?;
        let mut rings = (0..n)
            .map(|_| self.line(little_endian, dims))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter();
        let exterior = rings.next().unwrap_or_else(|| LineString::new(Vec::new()));
        Ok(Polygon::new(exterior, rings.collect()))
    }

    /// Reads one geometry including its byte order and type header.
    fn geometry(&mut self, depth: usize) -> Result<Geometry<f64>, GeometryBlobError> {
        if depth > MAX_NESTING {
            return Err(GeometryBlobError::TooDeep);
        }
        let [order] = self.take::<1>()?;
        let little_endian = match order {
            0 => false,
            1 => true,
            other => return Err(GeometryBlobError::ByteOrder(other)),
        };
        let code = self.u32(little_endian)?;
        let dims = match code / 1000 {
            0 => 2,
            1 | 2 => 3,
            3 => 4,
            _ => return Err(GeometryBlobError::UnsupportedType(code)),
        };

        let geometry = match code % 1000 {
            1 => Geometry::Point(Point(self.coord(little_endian, dims)?)),
            2 => Geometry::LineString(self.line(little_endian, dims)?),
            3 => Geometry::Polygon(self.polygon(little_endian, dims)?),
            4 => {
                let members = self.members(little_endian, depth)?;
                let points = members
                    .into_iter()
                    .map(|g| match g {
                        Geometry::Point(p) => Ok(p),
                        _ => Err(GeometryBlobError::UnsupportedType(code)),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Geometry::MultiPoint(MultiPoint::new(points))
            }
            5 => {
                let members = self.members(little_endian, depth)?;
                let lines = members
                    .into_iter()
                    .map(|g| match g {
                        Geometry::LineString(l) => Ok(l),
                        _ => Err(GeometryBlobError::UnsupportedType(code)),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Geometry::MultiLineString(MultiLineString::new(lines))
            }
            6 => {
                let members = self.members(little_endian, depth)?;
                let polygons = members
                    .into_iter()
                    .map(|g| match g {
                        Geometry::Polygon(p) => Ok(p),
                        _ => Err(GeometryBlobError::UnsupportedType(code)),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Geometry::MultiPolygon(MultiPolygon::new(polygons))
            }
            7 => Geometry::GeometryCollection(GeometryCollection::new_from(
                self.members(little_endian, depth)?,
            )),
            _ => return Err(GeometryBlobError::UnsupportedType(code)),
        };
        Ok(geometry)
    }

    /// Members of a multi-geometry; each carries its own WKB header.
    fn members(
        &mut self,
        little_endian: bool,
        depth: usize,
    ) -> Result<Vec<Geometry<f64>>, GeometryBlobError> {
        let n = self.count(little_endian, 5)?;
        (0..n).map(|_| self.geometry(depth + 1)).collect()
    }
}
