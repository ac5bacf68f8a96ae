//! Geometry normalization for aquifer zone boundaries.
//!
//! The zone GeoJSON feed mixes Polygon and MultiPolygon features and ships
//! coordinates in projected UTM meters (zone 19S for the modeled aquifer).
//! This module resolves the duck-typed shape once at ingestion into a
//! tagged variant and converts every vertex to geographic lon/lat, so
//! downstream code only ever sees uniform rings.
//!
//! Holes are a deliberate limitation: only the outer ring of each polygon
//! is kept, matching what the map backdrop needs.

use std::collections::HashSet;

use serde::Deserialize;

use crate::model::{GeometryError, Ring};

// ---------------------------------------------------------------------------
// Raw shapes
// ---------------------------------------------------------------------------

/// A GeoJSON geometry object as it appears on the wire, before the shape
/// has been resolved. `coordinates` stays untyped here because its nesting
/// depth depends on `type`.
#[derive(Debug, Clone, Deserialize)]
pub struct GeoShape {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: serde_json::Value,
}

/// Shape resolved exactly once at ingestion; downstream code never
/// re-inspects raw JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum RawGeometry {
    /// Rings of one polygon: outer ring first, holes after.
    Polygon(Vec<Vec<[f64; 2]>>),
    /// One ring list per constituent polygon.
    MultiPolygon(Vec<Vec<Vec<[f64; 2]>>>),
}

impl RawGeometry {
    /// Resolves a wire geometry into the tagged variant.
    pub fn resolve(shape: &GeoShape) -> Result<RawGeometry, GeometryError> {
        match shape.kind.as_str() {
            "Polygon" => serde_json::from_value(shape.coordinates.clone())
                .map(RawGeometry::Polygon)
                .map_err(|_| GeometryError::Malformed("Polygon".to_string())),
            "MultiPolygon" => serde_json::from_value(shape.coordinates.clone())
                .map(RawGeometry::MultiPolygon)
                .map_err(|_| GeometryError::Malformed("MultiPolygon".to_string())),
            other => Err(GeometryError::UnsupportedShape(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Coordinate reference system
// ---------------------------------------------------------------------------

/// A UTM zone acting as the source reference system of a geometry feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtmCrs {
    pub zone: u8,
    pub south: bool,
}

/// UTM zone 19S (EPSG:32719) — the projection the metamodel geometry feed
/// uses for the Chilean aquifer.
pub const UTM_ZONE_19S: UtmCrs = UtmCrs {
    zone: 19,
    south: true,
};

// WGS84 ellipsoid and UTM projection constants.
const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Stateless point-wise inverse transverse Mercator: projected UTM meters
/// to geographic degrees (lon, lat) on the WGS84 ellipsoid.
///
/// Standard series expansion (USGS Professional Paper 1395). Exact on the
/// central meridian, sub-meter elsewhere within the zone — the same
/// behavior the upstream tooling gets from its projection library.
pub fn utm_to_wgs84(easting: f64, northing: f64, crs: UtmCrs) -> (f64, f64) {
    let e2 = WGS84_F * (2.0 - WGS84_F);
    let ep2 = e2 / (1.0 - e2);
    let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

    let false_northing = if crs.south {
        UTM_FALSE_NORTHING_SOUTH
    } else {
        0.0
    };

    let m = (northing - false_northing) / UTM_K0;
    let mu = m / (WGS84_A
        * (1.0 - e2 / 4.0 - 3.0 * e2 * e2 / 64.0 - 5.0 * e2 * e2 * e2 / 256.0));

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();

    let c1 = ep2 * cos_phi1 * cos_phi1;
    let t1 = tan_phi1 * tan_phi1;
    let n1 = WGS84_A / (1.0 - e2 * sin_phi1 * sin_phi1).sqrt();
    let r1 = WGS84_A * (1.0 - e2) / (1.0 - e2 * sin_phi1 * sin_phi1).powf(1.5);
    let d = (easting - UTM_FALSE_EASTING) / (n1 * UTM_K0);

    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d * d / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                    - 252.0 * ep2
                    - 3.0 * c1 * c1)
                    * d.powi(6)
                    / 720.0);

    let lon0 = (f64::from(crs.zone) * 6.0 - 183.0).to_radians();
    let lon = lon0
        + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                * d.powi(5)
                / 120.0)
            / cos_phi1;

    (lon.to_degrees(), lat.to_degrees())
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalizes one resolved geometry into geographic rings.
///
/// Polygon: the outer ring only. MultiPolygon: the outer ring of each
/// constituent polygon, all returned together. Any invalid ring fails the
/// whole geometry — a partial boundary is more dangerous than an explicit
/// failure.
pub fn normalize(raw: &RawGeometry, crs: UtmCrs) -> Result<Vec<Ring>, GeometryError> {
    match raw {
        RawGeometry::Polygon(rings) => {
            let outer = rings
                .first()
                .ok_or_else(|| GeometryError::Malformed("Polygon".to_string()))?;
            Ok(vec![normalize_ring(outer, crs)?])
        }
        RawGeometry::MultiPolygon(polygons) => {
            let mut out = Vec::with_capacity(polygons.len());
            for polygon in polygons {
                let outer = polygon
                    .first()
                    .ok_or_else(|| GeometryError::Malformed("MultiPolygon".to_string()))?;
                out.push(normalize_ring(outer, crs)?);
            }
            Ok(out)
        }
    }
}

/// Validates and transforms a single ring.
fn normalize_ring(ring: &[[f64; 2]], crs: UtmCrs) -> Result<Ring, GeometryError> {
    // The GeoJSON convention repeats the first vertex at the end; drop the
    // closing duplicate before validation so it does not count as distinct.
    let open = match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 1 && first == last => &ring[..ring.len() - 1],
        _ => ring,
    };

    for [x, y] in open {
        if !x.is_finite() || !y.is_finite() {
            return Err(GeometryError::NonFiniteCoordinate);
        }
    }

    let distinct: HashSet<(u64, u64)> = open
        .iter()
        .map(|[x, y]| (x.to_bits(), y.to_bits()))
        .collect();
    if distinct.len() < 3 {
        return Err(GeometryError::TooFewVertices(distinct.len()));
    }

    let mut vertices = Vec::with_capacity(open.len());
    for [easting, northing] in open {
        let (lon, lat) = utm_to_wgs84(*easting, *northing, crs);
        if !lon.is_finite() || !lat.is_finite() {
            return Err(GeometryError::TransformFailed);
        }
        vertices.push((lon, lat));
    }

    Ok(Ring { vertices })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shape(kind: &str, coordinates: serde_json::Value) -> GeoShape {
        GeoShape {
            kind: kind.to_string(),
            coordinates,
        }
    }

    // A plausible square in UTM 19S near the modeled aquifer.
    fn utm_square() -> serde_json::Value {
        json!([[
            [440_000.0, 6_940_000.0],
            [460_000.0, 6_940_000.0],
            [460_000.0, 6_960_000.0],
            [440_000.0, 6_960_000.0],
            [440_000.0, 6_940_000.0]
        ]])
    }

    #[test]
    fn test_central_meridian_equator_maps_exactly() {
        // 500000 E on the central meridian with the full south false
        // northing is the projection origin: lon −69°, lat 0°. The series
        // expansion is exact there, so the tolerance can be tight.
        let (lon, lat) = utm_to_wgs84(500_000.0, 10_000_000.0, UTM_ZONE_19S);
        assert!((lon - -69.0).abs() < 1e-9, "lon was {}", lon);
        assert!(lat.abs() < 1e-9, "lat was {}", lat);
    }

    #[test]
    fn test_central_meridian_southern_point_keeps_longitude() {
        let (lon, lat) = utm_to_wgs84(500_000.0, 6_000_000.0, UTM_ZONE_19S);
        assert!((lon - -69.0).abs() < 1e-9, "lon was {}", lon);
        assert!(lat < -35.0 && lat > -37.0, "lat was {}", lat);
    }

    #[test]
    fn test_transform_lands_in_zone_19s_bounds() {
        let (lon, lat) = utm_to_wgs84(450_000.0, 6_950_000.0, UTM_ZONE_19S);
        // Zone 19 spans 72°W to 66°W; the test point sits south of the
        // equator in northern Chile.
        assert!(lon > -72.0 && lon < -66.0, "lon was {}", lon);
        assert!(lat > -29.0 && lat < -26.0, "lat was {}", lat);
    }

    #[test]
    fn test_polygon_keeps_outer_ring_only() {
        let raw = RawGeometry::resolve(&shape(
            "Polygon",
            json!([
                [
                    [440_000.0, 6_940_000.0],
                    [460_000.0, 6_940_000.0],
                    [460_000.0, 6_960_000.0],
                    [440_000.0, 6_940_000.0]
                ],
                [
                    [445_000.0, 6_945_000.0],
                    [450_000.0, 6_945_000.0],
                    [450_000.0, 6_950_000.0],
                    [445_000.0, 6_945_000.0]
                ]
            ]),
        ))
        .unwrap();

        let rings = normalize(&raw, UTM_ZONE_19S).unwrap();
        assert_eq!(rings.len(), 1, "hole ring must be dropped");
        assert_eq!(rings[0].vertices.len(), 3);
    }

    #[test]
    fn test_multipolygon_returns_one_ring_per_part() {
        let raw = RawGeometry::resolve(&shape(
            "MultiPolygon",
            json!([utm_square(), utm_square()]),
        ))
        .unwrap();

        let rings = normalize(&raw, UTM_ZONE_19S).unwrap();
        assert_eq!(rings.len(), 2);
        for ring in &rings {
            assert_eq!(ring.vertices.len(), 4);
            for (lon, lat) in &ring.vertices {
                assert!(*lon > -72.0 && *lon < -66.0, "lon was {}", lon);
                assert!(*lat > -28.0 && *lat < -27.0, "lat was {}", lat);
            }
        }
    }

    #[test]
    fn test_two_vertex_ring_is_rejected() {
        let raw = RawGeometry::resolve(&shape(
            "Polygon",
            json!([[[440_000.0, 6_940_000.0], [460_000.0, 6_940_000.0]]]),
        ))
        .unwrap();

        assert_eq!(
            normalize(&raw, UTM_ZONE_19S).unwrap_err(),
            GeometryError::TooFewVertices(2)
        );
    }

    #[test]
    fn test_closing_duplicate_does_not_count_as_distinct() {
        // Three distinct vertices plus the closing repeat: valid.
        let raw = RawGeometry::resolve(&shape(
            "Polygon",
            json!([[
                [440_000.0, 6_940_000.0],
                [460_000.0, 6_940_000.0],
                [450_000.0, 6_960_000.0],
                [440_000.0, 6_940_000.0]
            ]]),
        ))
        .unwrap();
        assert!(normalize(&raw, UTM_ZONE_19S).is_ok());

        // Two distinct vertices dressed up as four entries: invalid.
        let raw = RawGeometry::resolve(&shape(
            "Polygon",
            json!([[
                [440_000.0, 6_940_000.0],
                [460_000.0, 6_940_000.0],
                [440_000.0, 6_940_000.0],
                [440_000.0, 6_940_000.0]
            ]]),
        ))
        .unwrap();
        assert_eq!(
            normalize(&raw, UTM_ZONE_19S).unwrap_err(),
            GeometryError::TooFewVertices(2)
        );
    }

    #[test]
    fn test_non_finite_coordinate_is_rejected() {
        let raw = RawGeometry::Polygon(vec![vec![
            [440_000.0, 6_940_000.0],
            [f64::NAN, 6_940_000.0],
            [450_000.0, 6_960_000.0],
        ]]);
        assert_eq!(
            normalize(&raw, UTM_ZONE_19S).unwrap_err(),
            GeometryError::NonFiniteCoordinate
        );
    }

    #[test]
    fn test_unsupported_shape_is_rejected_at_resolution() {
        let err = RawGeometry::resolve(&shape("Point", json!([-69.0, -27.0]))).unwrap_err();
        assert_eq!(err, GeometryError::UnsupportedShape("Point".to_string()));
    }

    #[test]
    fn test_malformed_coordinates_are_rejected_at_resolution() {
        let err = RawGeometry::resolve(&shape("Polygon", json!("not coordinates"))).unwrap_err();
        assert_eq!(err, GeometryError::Malformed("Polygon".to_string()));
    }

    #[test]
    fn test_empty_polygon_is_rejected() {
        let raw = RawGeometry::Polygon(vec![]);
        assert_eq!(
            normalize(&raw, UTM_ZONE_19S).unwrap_err(),
            GeometryError::Malformed("Polygon".to_string())
        );
    }
}
