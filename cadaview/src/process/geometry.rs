//! Geometry validity, simplification, vertex counting and coordinate rounding.

use geo::SimplifyVwPreserve;
use geo_types::{Coord, Geometry, LineString, Polygon};

/// Vertices counted for the simplification report.
///
/// Polygons count their exterior ring only; lines count every vertex;
/// points count one each. Other geometry kinds count zero.
pub fn count_vertices(geometry: &Geometry<f64>) -> usize {
    match geometry {
        Geometry::Polygon(polygon) => polygon.exterior().0.len(),
        Geometry::MultiPolygon(polygons) => polygons.iter().map(|p| p.exterior().0.len()).sum(),
        Geometry::LineString(line) => line.0.len(),
        Geometry::MultiLineString(lines) => lines.iter().map(|l| l.0.len()).sum(),
        Geometry::Point(_) => 1,
        Geometry::MultiPoint(points) => points.0.len(),
        _ => 0,
    }
}

/// Topology-preserving simplification of polygons and lines.
///
/// Points and other kinds come back unchanged. A tolerance of zero or less
/// disables simplification.
pub fn simplify(geometry: &Geometry<f64>, tolerance: f64) -> Geometry<f64> {
    if tolerance <= 0.0 {
        return geometry.clone();
    }
    match geometry {
        Geometry::Polygon(g) => Geometry::Polygon(g.simplify_vw_preserve(&tolerance)),
        Geometry::MultiPolygon(g) => Geometry::MultiPolygon(g.simplify_vw_preserve(&tolerance)),
        Geometry::LineString(g) => Geometry::LineString(g.simplify_vw_preserve(&tolerance)),
        Geometry::MultiLineString(g) => {
            Geometry::MultiLineString(g.simplify_vw_preserve(&tolerance))
        }
        other => other.clone(),
    }
}

/// Whether a geometry is structurally sound.
///
/// Every coordinate must be finite, lines need two vertices and polygon
/// rings four (closing vertex included). Self-intersections are not checked.
pub fn is_well_formed(geometry: &Geometry<f64>) -> bool {
    match geometry {
        Geometry::Point(p) => finite(p.0),
        Geometry::Line(l) => finite(l.start) && finite(l.end),
        Geometry::LineString(line) => line_ok(line),
        Geometry::Polygon(polygon) => polygon_ok(polygon),
        Geometry::MultiPoint(points) => points.iter().all(|p| finite(p.0)),
        Geometry::MultiLineString(lines) => lines.iter().all(line_ok),
        Geometry::MultiPolygon(polygons) => polygons.iter().all(polygon_ok),
        Geometry::GeometryCollection(geometries) => geometries.iter().all(is_well_formed),
        Geometry::Rect(rect) => finite(rect.min()) && finite(rect.max()),
        Geometry::Triangle(triangle) => triangle.to_array().into_iter().all(finite),
    }
}

fn finite(c: Coord<f64>) -> bool {
    c.x.is_finite() && c.y.is_finite()
}

fn line_ok(line: &LineString<f64>) -> bool {
    line.0.len() >= 2 && line.0.iter().copied().all(finite)
}

fn ring_ok(ring: &LineString<f64>) -> bool {
    ring.0.len() >= 4 && ring.is_closed() && ring.0.iter().copied().all(finite)
}

fn polygon_ok(polygon: &Polygon<f64>) -> bool {
    ring_ok(polygon.exterior()) && polygon.interiors().iter().all(ring_ok)
}

/// Rounds every coordinate of a GeoJSON geometry to `precision` decimals.
///
/// Coordinates are left untouched when `10^precision` does not fit in an
/// `f64`.
pub fn round_coordinates(value: &mut geojson::Value, precision: u32) {
    let Ok(exponent) = i32::try_from(precision) else {
        return;
    };
    let factor = 10f64.powi(exponent);
    if !factor.is_finite() {
        return;
    }
    round_value(value, factor);
}

fn round_value(value: &mut geojson::Value, factor: f64) {
    use geojson::Value;

    match value {
        Value::Point(position) => round_position(position, factor),
        Value::MultiPoint(positions) | Value::LineString(positions) => {
            positions.iter_mut().for_each(|p| round_position(p, factor));
        }
        Value::MultiLineString(rings) | Value::Polygon(rings) => {
            for ring in rings {
                ring.iter_mut().for_each(|p| round_position(p, factor));
            }
        }
        Value::MultiPolygon(polygons) => {
            for ring in polygons.iter_mut().flatten() {
                ring.iter_mut().for_each(|p| round_position(p, factor));
            }
        }
        Value::GeometryCollection(geometries) => {
            for geometry in geometries {
                round_value(&mut geometry.value, factor);
            }
        }
    }
}

fn round_position(position: &mut [f64], factor: f64) {
    for c in position.iter_mut() {
        let scaled = (*c * factor).round();
        if scaled.is_finite() {
            *c = scaled / factor;
        }
    }
}
