//! Metamodel API client.
//!
//! Serves the per-zone products of the groundwater metamodel: monthly head
//! series (absolute and delta), monthly balance series (step in/out/rate),
//! the zone listing, and the zone boundary GeoJSON. History comes from the
//! calibrated MODFLOW runs; the `modelacion` variants carry the metamodel
//! forecast.

use serde::Deserialize;

use crate::geometry::GeoShape;
use crate::model::{
    RawSample, Regime, RetrievalError, METRIC_STEP_IN, METRIC_STEP_OUT, METRIC_STEP_RATE,
};

use super::get_json;

// ============================================================================
// Endpoint descriptors
// ============================================================================

/// Which head product to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadKind {
    /// Level in meters above sea level.
    Absolute,
    /// Level change against the reference period, in meters.
    Delta,
}

impl HeadKind {
    /// Path fragment used by the API.
    pub fn endpoint_fragment(&self) -> &'static str {
        match self {
            HeadKind::Absolute => "head-absoluto",
            HeadKind::Delta => "head-delta",
        }
    }

    /// Metric name used in filenames and aggregates.
    pub fn metric_name(&self) -> &'static str {
        match self {
            HeadKind::Absolute => crate::model::METRIC_HEAD_ABSOLUTE,
            HeadKind::Delta => crate::model::METRIC_HEAD_DELTA,
        }
    }
}

fn regime_fragment(regime: Regime) -> &'static str {
    match regime {
        Regime::Historical => "historico",
        Regime::Forecast => "modelacion",
    }
}

pub fn build_zones_url(base: &str) -> String {
    format!("{}/api/v1/metamodelos/zonas", base)
}

pub fn build_head_url(base: &str, zone: &str, kind: HeadKind, regime: Regime) -> String {
    format!(
        "{}/api/v1/metamodelos/metamodelo-mensual-{}-{}?zona={}",
        base,
        kind.endpoint_fragment(),
        regime_fragment(regime),
        zone
    )
}

pub fn build_balance_url(base: &str, zone: &str, regime: Regime) -> String {
    format!(
        "{}/api/v1/metamodelos/balance/metamodelo-mensual-balance-{}?zona={}",
        base,
        regime_fragment(regime),
        zone
    )
}

pub fn build_zone_geojson_url(base: &str) -> String {
    format!("{}/api/v1/metamodelos/metamodelos-zonas-geojson", base)
}

// ============================================================================
// Response structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct SeriesResponse {
    #[serde(default)]
    data: Vec<RawSample>,
}

/// One monthly balance row. The API omits a column when the zone does not
/// report that component, so every value is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BalanceSample {
    pub date: String,
    #[serde(default)]
    pub value_step_in: Option<f64>,
    #[serde(default)]
    pub value_step_out: Option<f64>,
    #[serde(default)]
    pub value_step_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    #[serde(default)]
    data: Vec<BalanceSample>,
}

/// One zone boundary feature. The geometry stays unresolved here; shape
/// resolution and normalization belong to the geometry module.
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneFeature {
    pub geometry: GeoShape,
    pub properties: ZoneFeatureProperties,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZoneFeatureProperties {
    pub zona: String,
}

#[derive(Debug, Deserialize)]
struct ZoneFeatureCollection {
    #[serde(default)]
    features: Vec<ZoneFeature>,
}

// ============================================================================
// API client functions
// ============================================================================

/// Fetches the ids of all zones the metamodel publishes.
pub fn fetch_zones(
    client: &reqwest::blocking::Client,
    base: &str,
) -> Result<Vec<String>, RetrievalError> {
    get_json(client, &build_zones_url(base))
}

/// Fetches one head series for a zone. An empty `data` array is a valid
/// answer — some zones have no forecast yet.
pub fn fetch_head_series(
    client: &reqwest::blocking::Client,
    base: &str,
    zone: &str,
    kind: HeadKind,
    regime: Regime,
) -> Result<Vec<RawSample>, RetrievalError> {
    let response: SeriesResponse = get_json(client, &build_head_url(base, zone, kind, regime))?;
    Ok(response.data)
}

/// Fetches the balance rows for a zone and regime.
pub fn fetch_balance_series(
    client: &reqwest::blocking::Client,
    base: &str,
    zone: &str,
    regime: Regime,
) -> Result<Vec<BalanceSample>, RetrievalError> {
    let response: BalanceResponse = get_json(client, &build_balance_url(base, zone, regime))?;
    Ok(response.data)
}

/// Fetches the raw zone boundary features.
pub fn fetch_zone_features(
    client: &reqwest::blocking::Client,
    base: &str,
) -> Result<Vec<ZoneFeature>, RetrievalError> {
    let collection: ZoneFeatureCollection = get_json(client, &build_zone_geojson_url(base))?;
    if collection.features.is_empty() {
        return Err(RetrievalError::NoData("zone geometry features".to_string()));
    }
    Ok(collection.features)
}

// ============================================================================
// Balance projection helpers
// ============================================================================

/// Projects one balance component out of the rows, skipping rows where the
/// component is absent. The result feeds the reconciler like any other
/// sample list.
pub fn balance_metric_samples(rows: &[BalanceSample], metric: &str) -> Vec<RawSample> {
    rows.iter()
        .filter_map(|row| {
            let value = match metric {
                METRIC_STEP_IN => row.value_step_in,
                METRIC_STEP_OUT => row.value_step_out,
                METRIC_STEP_RATE => row.value_step_rate,
                _ => None,
            };
            value.map(|v| RawSample {
                date: row.date.clone(),
                value: v,
            })
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
