//! Per-zone aggregation over reconciled series.
//!
//! Summary statistics feed the comparative views: component means per zone,
//! net balance per zone, and the combined evolution of the whole system.
//! Statistics always cover historical and forecast points together — the
//! comparative charts intentionally show the full combined evolution.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::model::{
    MetricStats, Regime, Series, TimePoint, ZoneAggregate, METRIC_STEP_IN, METRIC_STEP_OUT,
};

// ---------------------------------------------------------------------------
// Summary statistics
// ---------------------------------------------------------------------------

/// mean/min/max over every point of a series, or `None` for an empty
/// series — never zero or NaN.
pub fn metric_stats(series: &Series) -> Option<MetricStats> {
    let points = series.points();
    if points.is_empty() {
        return None;
    }

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for p in points {
        min = min.min(p.value);
        max = max.max(p.value);
        sum += p.value;
    }

    Some(MetricStats {
        mean: sum / points.len() as f64,
        min,
        max,
    })
}

/// Builds the per-zone aggregate: one stats entry per non-empty metric
/// series, and the net balance when both balance components are present.
///
/// `net_balance` stays `None` when either component is missing; a zone
/// without outflow data has unknown net flow, not zero.
pub fn aggregate(zone_id: &str, series_by_metric: &BTreeMap<String, Series>) -> ZoneAggregate {
    let mut stats = BTreeMap::new();
    for (metric, series) in series_by_metric {
        if let Some(s) = metric_stats(series) {
            stats.insert(metric.clone(), s);
        }
    }

    let net_balance = match (stats.get(METRIC_STEP_IN), stats.get(METRIC_STEP_OUT)) {
        (Some(inflow), Some(outflow)) => Some(inflow.mean - outflow.mean),
        _ => None,
    };

    ZoneAggregate {
        zone_id: zone_id.to_string(),
        stats,
        net_balance,
    }
}

// ---------------------------------------------------------------------------
// Derived series
// ---------------------------------------------------------------------------

/// Pointwise inflow − outflow on the dates both series cover. Dates present
/// in only one series are skipped. A point is tagged Forecast when either
/// contributor is modeled.
pub fn net_series(inflow: &Series, outflow: &Series) -> Series {
    let outflow_by_date: BTreeMap<NaiveDate, &TimePoint> =
        outflow.points().iter().map(|p| (p.date, p)).collect();

    let points: Vec<TimePoint> = inflow
        .points()
        .iter()
        .filter_map(|inp| {
            outflow_by_date.get(&inp.date).map(|outp| TimePoint {
                date: inp.date,
                value: inp.value - outp.value,
                regime: if inp.regime == Regime::Forecast || outp.regime == Regime::Forecast {
                    Regime::Forecast
                } else {
                    Regime::Historical
                },
            })
        })
        .collect();

    Series::from_sorted(points)
}

/// Sums per-zone net series into one system-wide evolution series. Each
/// date accumulates every zone that reports it; a date is Forecast when
/// any contributing zone is already past its regime boundary.
pub fn combined_evolution(nets: &[Series]) -> Series {
    let mut sums: BTreeMap<NaiveDate, (f64, bool)> = BTreeMap::new();
    for series in nets {
        for p in series.points() {
            let entry = sums.entry(p.date).or_insert((0.0, false));
            entry.0 += p.value;
            entry.1 |= p.regime == Regime::Forecast;
        }
    }

    let points: Vec<TimePoint> = sums
        .into_iter()
        .map(|(date, (value, forecast))| TimePoint {
            date,
            value,
            regime: if forecast {
                Regime::Forecast
            } else {
                Regime::Historical
            },
        })
        .collect();

    Series::from_sorted(points)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
