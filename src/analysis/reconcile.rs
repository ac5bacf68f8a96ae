//! Series reconciliation: one continuous series out of two regimes.
//!
//! The metamodel API serves history (MODFLOW) and forecast (metamodel) as
//! separate record lists for the same zone and metric. This module merges
//! them into a single ordered series with an explicit regime boundary, the
//! shape every chart and aggregate downstream works from.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

use crate::model::{MalformedSeriesError, RawSample, Regime, Series, TimePoint};

// ---------------------------------------------------------------------------
// Timestamp parsing
// ---------------------------------------------------------------------------

/// Parses an upstream date string. The API has served plain dates,
/// `T`-separated datetimes, and full RFC 3339 stamps at different times,
/// so all three are accepted.
pub fn parse_sample_date(raw: &str) -> Result<NaiveDate, MalformedSeriesError> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt.date());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.date_naive());
    }
    Err(MalformedSeriesError::BadTimestamp(raw.to_string()))
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Merges historical and forecast samples into one reconciled series.
///
/// Input order is not trusted; both lists are validated and merged into
/// ascending date order. Where both regimes carry the same date, the
/// forecast sample wins and the historical one is dropped, so the plotted
/// transition stays continuous. Duplicate dates within one input resolve
/// to the later sample.
///
/// Two empty inputs yield an empty series — absence of data for a unit is
/// a reportable state, not an error.
pub fn reconcile(
    historical: &[RawSample],
    forecast: &[RawSample],
) -> Result<Series, MalformedSeriesError> {
    let mut merged: BTreeMap<NaiveDate, TimePoint> = BTreeMap::new();

    for (samples, regime) in [
        (historical, Regime::Historical),
        (forecast, Regime::Forecast),
    ] {
        for sample in samples {
            let date = parse_sample_date(&sample.date)?;
            if !sample.value.is_finite() {
                return Err(MalformedSeriesError::NonFiniteValue(sample.date.clone()));
            }
            merged.insert(
                date,
                TimePoint {
                    date,
                    value: sample.value,
                    regime,
                },
            );
        }
    }

    Ok(Series::from_sorted(merged.into_values().collect()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
