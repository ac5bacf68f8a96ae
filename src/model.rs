//! Core data types for the aquifer monitoring service.
//!
//! This module defines the shared domain model imported by all other modules.
//! It contains no I/O and no business logic — only types, their invariant
//! accessors, and the error taxonomy.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Metric names
// ---------------------------------------------------------------------------

/// Absolute groundwater level for a zone, in meters above sea level.
pub const METRIC_HEAD_ABSOLUTE: &str = "head_absoluto";

/// Groundwater level change relative to the reference level, in meters.
pub const METRIC_HEAD_DELTA: &str = "head_delta";

/// Water entering a zone over a monthly step, in cubic meters.
pub const METRIC_STEP_IN: &str = "step_in";

/// Water leaving a zone over a monthly step, in cubic meters.
pub const METRIC_STEP_OUT: &str = "step_out";

/// Net rate component of the zone balance, in cubic meters.
pub const METRIC_STEP_RATE: &str = "step_rate";

// ---------------------------------------------------------------------------
// Series types
// ---------------------------------------------------------------------------

/// Whether a data point was observed (MODFLOW history) or modeled
/// (metamodel forecast).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    Historical,
    Forecast,
}

/// A raw measurement as it arrives from the upstream API: an ISO-8601 date
/// string and a value. Timestamp parsing and validation happen during
/// reconciliation, not at deserialization.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawSample {
    pub date: String,
    pub value: f64,
}

/// One point of a reconciled series. The regime is carried explicitly on
/// every point rather than inferred from position, so an unsorted upstream
/// response can never silently misclassify the transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimePoint {
    pub date: NaiveDate,
    pub value: f64,
    pub regime: Regime,
}

/// A reconciled time series for one (entity, metric) pair.
///
/// Invariants, guaranteed by construction and private fields:
///   - dates are strictly increasing (no duplicates),
///   - `boundary_index` points at the first `Forecast` point, or is `None`
///     when no forecast data exists,
///   - the series is never re-sorted or mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    points: Vec<TimePoint>,
    boundary_index: Option<usize>,
}

impl Series {
    /// Builds a series from points that are already sorted strictly
    /// ascending by date. The regime boundary is derived, not supplied.
    ///
    /// Crate-internal: the reconciler and the aggregation engine are the
    /// only producers of series.
    pub(crate) fn from_sorted(points: Vec<TimePoint>) -> Series {
        debug_assert!(
            points.windows(2).all(|w| w[0].date < w[1].date),
            "series points must be strictly increasing by date"
        );
        let boundary_index = points.iter().position(|p| p.regime == Regime::Forecast);
        Series {
            points,
            boundary_index,
        }
    }

    /// An empty series — the legitimate "no data for this unit" state.
    pub fn empty() -> Series {
        Series {
            points: Vec::new(),
            boundary_index: None,
        }
    }

    pub fn points(&self) -> &[TimePoint] {
        &self.points
    }

    /// Index of the first forecast point, or `None` if the series is
    /// entirely historical (or empty).
    pub fn boundary_index(&self) -> Option<usize> {
        self.boundary_index
    }

    /// Date of the first forecast point, used to place the regime
    /// transition marker on charts.
    pub fn boundary_date(&self) -> Option<NaiveDate> {
        self.boundary_index.map(|i| self.points[i].date)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points belonging to one regime, in series order.
    pub fn regime_points(&self, regime: Regime) -> impl Iterator<Item = &TimePoint> {
        self.points.iter().filter(move |p| p.regime == regime)
    }
}

// ---------------------------------------------------------------------------
// Well types
// ---------------------------------------------------------------------------

/// Percentile band of a well level within the full monitored population.
///
/// Band edges are the 33rd, 66th and 90th percentiles; a value exactly on
/// an edge belongs to the lower band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PercentileClass {
    Low,
    MedLow,
    MedHigh,
    High,
}

impl PercentileClass {
    /// Upstream label convention, used in chart legends.
    pub fn label(&self) -> &'static str {
        match self {
            PercentileClass::Low => "<P33",
            PercentileClass::MedLow => "P33-P66",
            PercentileClass::MedHigh => "P66-P90",
            PercentileClass::High => ">P90",
        }
    }
}

impl std::fmt::Display for PercentileClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A monitored well as a spatial point: geographic position, current level
/// and, once the population-wide classification pass has run, its band.
#[derive(Debug, Clone, PartialEq)]
pub struct WellPoint {
    pub id: String,
    pub lon: f64,
    pub lat: f64,
    pub level: f64,
    pub class: Option<PercentileClass>,
}

// ---------------------------------------------------------------------------
// Aggregate types
// ---------------------------------------------------------------------------

/// Summary statistics for one metric of one zone, over historical and
/// forecast points combined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Derived per-zone summary, recomputed on every run and never mutated.
///
/// `net_balance` is `None` — not zero — when either balance component is
/// missing, so callers can tell "no data" apart from "zero net flow".
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneAggregate {
    pub zone_id: String,
    pub stats: BTreeMap<String, MetricStats>,
    pub net_balance: Option<f64>,
}

// ---------------------------------------------------------------------------
// Geometry types
// ---------------------------------------------------------------------------

/// One polygon ring in geographic coordinates: ordered (lon, lat) vertices,
/// implicitly closed. Always has at least 3 distinct vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    pub vertices: Vec<(f64, f64)>,
}

/// The normalized boundary of one aquifer zone: the zone name from the
/// upstream feature properties plus one ring per polygon part.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneBoundary {
    pub name: String,
    pub rings: Vec<Ring>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching data from the hydromet API.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalError {
    /// Non-2xx HTTP response from the API.
    Http(u16),
    /// The request could not be sent or the response body not read.
    Transport(String),
    /// The response body could not be deserialized.
    Parse(String),
    /// The endpoint answered but contained no usable records.
    NoData(String),
}

impl std::fmt::Display for RetrievalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrievalError::Http(code) => write!(f, "HTTP error: {}", code),
            RetrievalError::Transport(msg) => write!(f, "Transport error: {}", msg),
            RetrievalError::Parse(msg) => write!(f, "Parse error: {}", msg),
            RetrievalError::NoData(what) => write!(f, "No data available: {}", what),
        }
    }
}

impl std::error::Error for RetrievalError {}

/// A time series that cannot be reconciled: bad timestamps or non-finite
/// values. Aborts reconciliation for the affected unit only.
#[derive(Debug, Clone, PartialEq)]
pub enum MalformedSeriesError {
    /// A date string that could not be parsed as ISO-8601.
    BadTimestamp(String),
    /// A NaN or infinite value at the given date string.
    NonFiniteValue(String),
}

impl std::fmt::Display for MalformedSeriesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MalformedSeriesError::BadTimestamp(raw) => {
                write!(f, "Unparsable timestamp: '{}'", raw)
            }
            MalformedSeriesError::NonFiniteValue(date) => {
                write!(f, "Non-finite value at {}", date)
            }
        }
    }
}

impl std::error::Error for MalformedSeriesError {}

/// A polygon record that cannot be normalized. The affected geometry is
/// skipped; sibling geometries are kept.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Neither Polygon nor MultiPolygon.
    UnsupportedShape(String),
    /// The coordinates array does not match the declared shape.
    Malformed(String),
    /// A ring with fewer than 3 distinct vertices before closing.
    TooFewVertices(usize),
    /// A NaN or infinite input coordinate.
    NonFiniteCoordinate,
    /// The UTM inverse projection produced a non-finite result.
    TransformFailed,
}

impl std::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometryError::UnsupportedShape(kind) => {
                write!(f, "Unsupported geometry type: {}", kind)
            }
            GeometryError::Malformed(kind) => {
                write!(f, "Malformed {} coordinates", kind)
            }
            GeometryError::TooFewVertices(n) => {
                write!(f, "Ring has {} distinct vertices, need at least 3", n)
            }
            GeometryError::NonFiniteCoordinate => write!(f, "Non-finite coordinate in ring"),
            GeometryError::TransformFailed => write!(f, "Coordinate transform failed"),
        }
    }
}

impl std::error::Error for GeometryError {}

/// The classifier population is too small for meaningful percentile cuts.
/// Fatal to the run: a partial classification is worse than none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsufficientDataError {
    pub distinct_values: usize,
}

impl std::fmt::Display for InsufficientDataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Classification needs at least 4 distinct values, got {}",
            self.distinct_values
        )
    }
}

impl std::error::Error for InsufficientDataError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn test_series_boundary_derived_from_first_forecast_point() {
        let s = Series::from_sorted(vec![
            TimePoint {
                date: d(2024, 1),
                value: 1.0,
                regime: Regime::Historical,
            },
            TimePoint {
                date: d(2024, 2),
                value: 2.0,
                regime: Regime::Forecast,
            },
        ]);
        assert_eq!(s.boundary_index(), Some(1));
        assert_eq!(s.boundary_date(), Some(d(2024, 2)));
    }

    #[test]
    fn test_series_without_forecast_has_no_boundary() {
        let s = Series::from_sorted(vec![TimePoint {
            date: d(2024, 1),
            value: 1.0,
            regime: Regime::Historical,
        }]);
        assert_eq!(s.boundary_index(), None);
        assert_eq!(s.boundary_date(), None);
    }

    #[test]
    fn test_empty_series_is_reportable_not_exceptional() {
        let s = Series::empty();
        assert!(s.is_empty());
        assert_eq!(s.boundary_index(), None);
    }

    #[test]
    fn test_percentile_class_labels_match_upstream_convention() {
        assert_eq!(PercentileClass::Low.label(), "<P33");
        assert_eq!(PercentileClass::MedLow.label(), "P33-P66");
        assert_eq!(PercentileClass::MedHigh.label(), "P66-P90");
        assert_eq!(PercentileClass::High.label(), ">P90");
    }

    #[test]
    fn test_error_display_formats() {
        assert_eq!(RetrievalError::Http(500).to_string(), "HTTP error: 500");
        assert_eq!(
            MalformedSeriesError::BadTimestamp("garbage".into()).to_string(),
            "Unparsable timestamp: 'garbage'"
        );
        assert_eq!(
            InsufficientDataError { distinct_values: 3 }.to_string(),
            "Classification needs at least 4 distinct values, got 3"
        );
    }
}
