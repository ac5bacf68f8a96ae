//! Well platform API client.
//!
//! Covers the monitoring-well endpoints: the well listing, per-well
//! historic level records with station metadata, per-well level forecasts,
//! and the wells-level GeoJSON that carries every well's current level —
//! the population the percentile classifier runs on.

use serde::Deserialize;

use crate::model::{RawSample, RetrievalError, WellPoint};

use super::get_json;

// ============================================================================
// Endpoint URLs
// ============================================================================

pub fn build_well_list_url(base: &str) -> String {
    format!("{}/api/v1/plataforma-pozos/listado-pozos", base)
}

pub fn build_well_data_url(base: &str, well_id: &str) -> String {
    format!("{}/api/v1/plataforma-pozos/pozos-data/{}", base, well_id)
}

pub fn build_well_levels_url(base: &str) -> String {
    format!("{}/api/v1/plataforma-pozos/pozos-nivel-geojson", base)
}

pub fn build_forecast_list_url(base: &str) -> String {
    format!("{}/api/v1/salida/pronostico-pozos/listado", base)
}

pub fn build_forecast_data_url(base: &str, well_id: &str) -> String {
    format!("{}/api/v1/salida/pronostico-pozos-data/{}", base, well_id)
}

// ============================================================================
// Response structures
// ============================================================================

/// Station metadata attached to a well's data response. Every field is
/// optional upstream; charts fall back to the well id when a label is
/// missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WellInfo {
    #[serde(default)]
    pub punto_monitoreo: Option<String>,
    #[serde(default)]
    pub tipo_nivel: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Historic records plus metadata for one well.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WellRecord {
    #[serde(default)]
    pub info: WellInfo,
    #[serde(default)]
    pub data: Vec<RawSample>,
}

#[derive(Debug, Deserialize)]
struct WellListResponse {
    #[serde(default)]
    pozos: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WellLevelCollection {
    #[serde(default)]
    features: Vec<WellLevelFeature>,
}

#[derive(Debug, Deserialize)]
struct WellLevelFeature {
    geometry: PointGeometry,
    properties: WellLevelProperties,
}

#[derive(Debug, Deserialize)]
struct PointGeometry {
    coordinates: [f64; 2], // lon, lat — wells arrive already geographic
}

#[derive(Debug, Deserialize)]
struct WellLevelProperties {
    pozo: String,
    nivel: f64,
}

// ============================================================================
// API client functions
// ============================================================================

/// Fetches the ids of all wells on the platform.
pub fn fetch_well_list(
    client: &reqwest::blocking::Client,
    base: &str,
) -> Result<Vec<String>, RetrievalError> {
    let response: WellListResponse = get_json(client, &build_well_list_url(base))?;
    Ok(response.pozos)
}

/// Fetches historic level records and metadata for one well.
pub fn fetch_well_record(
    client: &reqwest::blocking::Client,
    base: &str,
    well_id: &str,
) -> Result<WellRecord, RetrievalError> {
    get_json(client, &build_well_data_url(base, well_id))
}

/// Fetches the ids of wells that currently have a forecast.
pub fn fetch_forecast_list(
    client: &reqwest::blocking::Client,
    base: &str,
) -> Result<Vec<String>, RetrievalError> {
    get_json(client, &build_forecast_list_url(base))
}

/// Fetches the forecast records for one well.
pub fn fetch_well_forecast(
    client: &reqwest::blocking::Client,
    base: &str,
    well_id: &str,
) -> Result<Vec<RawSample>, RetrievalError> {
    let record: WellRecord = get_json(client, &build_forecast_data_url(base, well_id))?;
    Ok(record.data)
}

/// Fetches the current level of every monitored well as unclassified
/// spatial points. Wells with a non-finite level are dropped here so the
/// classifier only ever sees a clean population.
pub fn fetch_well_levels(
    client: &reqwest::blocking::Client,
    base: &str,
) -> Result<Vec<WellPoint>, RetrievalError> {
    let collection: WellLevelCollection = get_json(client, &build_well_levels_url(base))?;
    if collection.features.is_empty() {
        return Err(RetrievalError::NoData("well level features".to_string()));
    }

    Ok(collection
        .features
        .into_iter()
        .filter(|f| f.properties.nivel.is_finite())
        .map(|f| WellPoint {
            id: f.properties.pozo,
            lon: f.geometry.coordinates[0],
            lat: f.geometry.coordinates[1],
            level: f.properties.nivel,
            class: None,
        })
        .collect())
}

// ============================================================================
// Tests
// ============================================================================
