//! Pipeline orchestrator.
//!
//! Drives one full rendering pass: zone geometries, the classified wells
//! map, per-zone head and balance charts, per-well charts, and the
//! comparative views. Each logical unit is processed to completion before
//! the next; a unit's failure is recorded in the run manifest and the
//! batch continues. The one exception is the classification pass — it
//! spans the whole well population, so its failure (or the failure of the
//! population fetch it depends on) is fatal to the run.
//!
//! Nothing here retries. Upstream flakiness surfaces as per-unit failures
//! and is the operator's signal, not ours to hide.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::analysis::aggregate::{aggregate, combined_evolution, net_series};
use crate::analysis::classify::classify;
use crate::analysis::reconcile::reconcile;
use crate::geometry::{self, RawGeometry, UTM_ZONE_19S};
use crate::ingest::metamodel::balance_metric_samples;
use crate::ingest::{DataService, HeadKind};
use crate::logging::{self, DataSource};
use crate::model::{
    InsufficientDataError, Regime, RetrievalError, Series, WellPoint, ZoneAggregate, ZoneBoundary,
    METRIC_STEP_IN, METRIC_STEP_OUT, METRIC_STEP_RATE,
};
use crate::render::{RenderError, RenderSink};
use crate::zones::{Zone, ZONE_REGISTRY};

// ---------------------------------------------------------------------------
// Run manifest
// ---------------------------------------------------------------------------

/// What kind of logical unit an outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Zone,
    Geometry,
    WellsMap,
    Well,
    Comparative,
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitKind::Zone => write!(f, "zone"),
            UnitKind::Geometry => write!(f, "geometry"),
            UnitKind::WellsMap => write!(f, "wells-map"),
            UnitKind::Well => write!(f, "well"),
            UnitKind::Comparative => write!(f, "comparative"),
        }
    }
}

/// Which stage of a unit failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Retrieval,
    Series,
    Geometry,
    Render,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Retrieval => write!(f, "retrieval"),
            FailureKind::Series => write!(f, "series"),
            FailureKind::Geometry => write!(f, "geometry"),
            FailureKind::Render => write!(f, "render"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnitStatus {
    Success { artifacts: Vec<PathBuf> },
    Failed { failure: FailureKind, detail: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitOutcome {
    pub kind: UnitKind,
    pub unit_id: String,
    pub status: UnitStatus,
}

/// Per-unit results of one run. Printed at the end of every run — a
/// partial output must never be silent.
#[derive(Debug, Default)]
pub struct RunManifest {
    pub outcomes: Vec<UnitOutcome>,
}

impl RunManifest {
    pub fn new() -> RunManifest {
        RunManifest::default()
    }

    fn record_success(&mut self, kind: UnitKind, unit_id: &str, artifacts: Vec<PathBuf>) {
        self.outcomes.push(UnitOutcome {
            kind,
            unit_id: unit_id.to_string(),
            status: UnitStatus::Success { artifacts },
        });
    }

    fn record_failure(&mut self, kind: UnitKind, unit_id: &str, failure: FailureKind, detail: String) {
        self.outcomes.push(UnitOutcome {
            kind,
            unit_id: unit_id.to_string(),
            status: UnitStatus::Failed { failure, detail },
        });
    }

    pub fn successes(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, UnitStatus::Success { .. }))
            .count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.len() - self.successes()
    }

    /// Total artifacts written across all successful units.
    pub fn artifact_count(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match &o.status {
                UnitStatus::Success { artifacts } => artifacts.len(),
                UnitStatus::Failed { .. } => 0,
            })
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Fatal errors
// ---------------------------------------------------------------------------

/// Run-level failures. Everything else degrades to a manifest entry.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The well population could not be fetched, so the classification
    /// barrier can never be satisfied.
    WellPopulation(RetrievalError),
    /// The population was fetched but cannot be classified.
    Classification(InsufficientDataError),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::WellPopulation(e) => {
                write!(f, "Well population retrieval failed: {}", e)
            }
            PipelineError::Classification(e) => write!(f, "Classification pass failed: {}", e),
        }
    }
}

impl std::error::Error for PipelineError {}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline<'a> {
    data: &'a dyn DataService,
    sink: &'a dyn RenderSink,
    featured_wells: Vec<String>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        data: &'a dyn DataService,
        sink: &'a dyn RenderSink,
        featured_wells: Vec<String>,
    ) -> Pipeline<'a> {
        Pipeline {
            data,
            sink,
            featured_wells,
        }
    }

    /// One full rendering pass. Returns the manifest on completion, or a
    /// fatal error when a run-level step fails.
    pub fn run(&self) -> Result<RunManifest, PipelineError> {
        let mut manifest = RunManifest::new();

        let boundaries = self.geometry_phase(&mut manifest);
        self.wells_phase(&mut manifest, &boundaries)?;
        let (aggregates, nets) = self.zones_phase(&mut manifest);
        self.comparative_phase(&mut manifest, &aggregates, &nets);

        Ok(manifest)
    }

    /// Records a chart result. An `EmptyInput` refusal means the unit had
    /// nothing to draw — a legitimate skip, not a failure.
    fn record_chart(
        &self,
        manifest: &mut RunManifest,
        kind: UnitKind,
        unit_id: &str,
        result: Result<PathBuf, RenderError>,
    ) {
        match result {
            Ok(path) => manifest.record_success(kind, unit_id, vec![path]),
            Err(RenderError::EmptyInput) => {
                logging::info(
                    DataSource::Render,
                    Some(unit_id),
                    "skipped: no data to draw",
                );
            }
            Err(e) => {
                logging::error(DataSource::Render, Some(unit_id), &e.to_string());
                manifest.record_failure(kind, unit_id, FailureKind::Render, e.to_string());
            }
        }
    }

    // -----------------------------------------------------------------
    // Phase 1: zone geometries
    // -----------------------------------------------------------------

    fn geometry_phase(&self, manifest: &mut RunManifest) -> Vec<ZoneBoundary> {
        let features = match self.data.zone_features() {
            Ok(features) => features,
            Err(e) => {
                logging::log_fetch_failure(
                    DataSource::Metamodel,
                    "metamodelos-zonas-geojson",
                    "fetch zone geometries",
                    &e,
                );
                manifest.record_failure(
                    UnitKind::Geometry,
                    "metamodelos-zonas-geojson",
                    FailureKind::Retrieval,
                    e.to_string(),
                );
                return Vec::new();
            }
        };

        let mut boundaries = Vec::new();
        for feature in features {
            let name = feature.properties.zona.clone();
            let normalized = RawGeometry::resolve(&feature.geometry)
                .and_then(|raw| geometry::normalize(&raw, UTM_ZONE_19S));
            match normalized {
                Ok(rings) => {
                    manifest.record_success(UnitKind::Geometry, &name, Vec::new());
                    boundaries.push(ZoneBoundary { name, rings });
                }
                Err(e) => {
                    // Skip this geometry, keep the rest of the backdrop.
                    logging::warn(DataSource::Metamodel, Some(&name), &e.to_string());
                    manifest.record_failure(
                        UnitKind::Geometry,
                        &name,
                        FailureKind::Geometry,
                        e.to_string(),
                    );
                }
            }
        }
        boundaries
    }

    // -----------------------------------------------------------------
    // Phase 2: wells (classification barrier, map, per-well charts)
    // -----------------------------------------------------------------

    fn wells_phase(
        &self,
        manifest: &mut RunManifest,
        boundaries: &[ZoneBoundary],
    ) -> Result<(), PipelineError> {
        let levels = self.data.well_levels().map_err(|e| {
            logging::log_fetch_failure(DataSource::Wells, "pozos-nivel", "fetch well levels", &e);
            PipelineError::WellPopulation(e)
        })?;

        // The classification barrier: every well's value must be in hand
        // before any single well's class is known.
        let population: Vec<(String, f64)> =
            levels.iter().map(|w| (w.id.clone(), w.level)).collect();
        let classes = classify(&population).map_err(|e| {
            logging::error(DataSource::Wells, None, &e.to_string());
            PipelineError::Classification(e)
        })?;

        let classified: Vec<WellPoint> = levels
            .into_iter()
            .map(|mut well| {
                well.class = classes.get(&well.id).copied();
                well
            })
            .collect();

        let map_result = self.sink.wells_map(&classified, boundaries);
        self.record_chart(manifest, UnitKind::WellsMap, "pozos-nivel", map_result);

        let mut history_entries: Vec<(String, Series)> = Vec::new();
        let mut forecast_entries: Vec<(String, Series)> = Vec::new();

        for well_id in &self.featured_wells {
            match self.process_well(well_id) {
                Ok((artifacts, label, history, forecast)) => {
                    manifest.record_success(UnitKind::Well, well_id, artifacts);
                    if !history.is_empty() {
                        history_entries.push((label.clone(), history));
                    }
                    if !forecast.is_empty() {
                        forecast_entries.push((label, forecast));
                    }
                }
                Err((failure, detail)) => {
                    logging::warn(DataSource::Wells, Some(well_id), &detail);
                    manifest.record_failure(UnitKind::Well, well_id, failure, detail);
                }
            }
        }

        if !history_entries.is_empty() {
            let result = self.sink.comparative_chart(
                "pozos_comparativo",
                "Comparación de Niveles de Agua - Pozos Seleccionados",
                &history_entries,
            );
            self.record_chart(manifest, UnitKind::Comparative, "pozos_comparativo", result);
        }
        if !forecast_entries.is_empty() {
            let result = self.sink.comparative_chart(
                "pronosticos_comparativo",
                "Comparación de Pronósticos de Nivel de Agua - Pozos Seleccionados",
                &forecast_entries,
            );
            self.record_chart(
                manifest,
                UnitKind::Comparative,
                "pronosticos_comparativo",
                result,
            );
        }

        Ok(())
    }

    #[allow(clippy::type_complexity)]
    fn process_well(
        &self,
        well_id: &str,
    ) -> Result<(Vec<PathBuf>, String, Series, Series), (FailureKind, String)> {
        let record = self
            .data
            .well_record(well_id)
            .map_err(|e| (FailureKind::Retrieval, e.to_string()))?;
        let label = record
            .info
            .punto_monitoreo
            .unwrap_or_else(|| well_id.to_string());

        let history =
            reconcile(&record.data, &[]).map_err(|e| (FailureKind::Series, e.to_string()))?;

        let forecast_samples = self
            .data
            .well_forecast(well_id)
            .map_err(|e| (FailureKind::Retrieval, e.to_string()))?;
        let forecast = reconcile(&[], &forecast_samples)
            .map_err(|e| (FailureKind::Series, e.to_string()))?;

        let mut artifacts = Vec::new();
        if !history.is_empty() {
            let path = self
                .sink
                .well_history_chart(well_id, &label, &history)
                .map_err(|e| (FailureKind::Render, e.to_string()))?;
            artifacts.push(path);
        } else {
            logging::info(DataSource::Wells, Some(well_id), "no historic records");
        }
        if !forecast.is_empty() {
            let path = self
                .sink
                .well_forecast_chart(well_id, &label, &forecast)
                .map_err(|e| (FailureKind::Render, e.to_string()))?;
            artifacts.push(path);
        } else {
            logging::info(DataSource::Wells, Some(well_id), "no forecast records");
        }

        Ok((artifacts, label, history, forecast))
    }

    // -----------------------------------------------------------------
    // Phase 3: per-zone series
    // -----------------------------------------------------------------

    fn zones_phase(&self, manifest: &mut RunManifest) -> (Vec<ZoneAggregate>, Vec<Series>) {
        // The registry drives the run; the live listing only flags drift
        // between the two.
        match self.data.zones() {
            Ok(listing) => {
                for id in &listing {
                    if crate::zones::find_zone(id).is_none() {
                        logging::warn(
                            DataSource::Metamodel,
                            Some(id),
                            "zone published upstream but not in registry",
                        );
                    }
                }
                for zone in ZONE_REGISTRY {
                    if !listing.iter().any(|z| z == zone.id) {
                        logging::warn(
                            DataSource::Metamodel,
                            Some(zone.id),
                            "registry zone missing from upstream listing",
                        );
                    }
                }
            }
            Err(e) => {
                logging::warn(
                    DataSource::Metamodel,
                    None,
                    &format!("zone listing unavailable: {}", e),
                );
            }
        }

        let mut aggregates = Vec::new();
        let mut nets = Vec::new();

        for zone in ZONE_REGISTRY {
            match self.process_zone(zone) {
                Ok((artifacts, zone_aggregate, net)) => {
                    manifest.record_success(UnitKind::Zone, zone.id, artifacts);
                    if let Some(agg) = zone_aggregate {
                        if !agg.stats.is_empty() {
                            aggregates.push(agg);
                        }
                    }
                    if let Some(net) = net {
                        nets.push(net);
                    }
                }
                Err((failure, detail)) => {
                    logging::warn(DataSource::Metamodel, Some(zone.id), &detail);
                    manifest.record_failure(UnitKind::Zone, zone.id, failure, detail);
                }
            }
        }

        (aggregates, nets)
    }

    #[allow(clippy::type_complexity)]
    fn process_zone(
        &self,
        zone: &Zone,
    ) -> Result<(Vec<PathBuf>, Option<ZoneAggregate>, Option<Series>), (FailureKind, String)> {
        let mut artifacts = Vec::new();

        for kind in [HeadKind::Absolute, HeadKind::Delta] {
            let hist = self
                .data
                .head_series(zone.id, kind, Regime::Historical)
                .map_err(|e| (FailureKind::Retrieval, e.to_string()))?;
            let fore = self
                .data
                .head_series(zone.id, kind, Regime::Forecast)
                .map_err(|e| (FailureKind::Retrieval, e.to_string()))?;
            let series =
                reconcile(&hist, &fore).map_err(|e| (FailureKind::Series, e.to_string()))?;

            if series.is_empty() {
                logging::info(
                    DataSource::Metamodel,
                    Some(zone.id),
                    &format!("no {} data", kind.metric_name()),
                );
                continue;
            }
            let path = self
                .sink
                .zone_head_chart(zone.id, kind.metric_name(), &series)
                .map_err(|e| (FailureKind::Render, e.to_string()))?;
            artifacts.push(path);
        }

        if !zone.has_balance {
            return Ok((artifacts, None, None));
        }

        let hist_rows = self
            .data
            .balance_series(zone.id, Regime::Historical)
            .map_err(|e| (FailureKind::Retrieval, e.to_string()))?;
        let fore_rows = self
            .data
            .balance_series(zone.id, Regime::Forecast)
            .map_err(|e| (FailureKind::Retrieval, e.to_string()))?;

        let mut by_metric: BTreeMap<String, Series> = BTreeMap::new();
        for metric in [METRIC_STEP_IN, METRIC_STEP_OUT, METRIC_STEP_RATE] {
            let hist = balance_metric_samples(&hist_rows, metric);
            let fore = balance_metric_samples(&fore_rows, metric);
            let series =
                reconcile(&hist, &fore).map_err(|e| (FailureKind::Series, e.to_string()))?;

            if !series.is_empty() {
                let path = self
                    .sink
                    .zone_balance_chart(zone.id, metric, &series)
                    .map_err(|e| (FailureKind::Render, e.to_string()))?;
                artifacts.push(path);
            }
            by_metric.insert(metric.to_string(), series);
        }

        if by_metric.values().any(|s| !s.is_empty()) {
            let path = self
                .sink
                .zone_balance_combined_chart(zone.id, &by_metric)
                .map_err(|e| (FailureKind::Render, e.to_string()))?;
            artifacts.push(path);
        }

        let zone_aggregate = aggregate(zone.id, &by_metric);
        let net = match (by_metric.get(METRIC_STEP_IN), by_metric.get(METRIC_STEP_OUT)) {
            (Some(inflow), Some(outflow)) if !inflow.is_empty() && !outflow.is_empty() => {
                Some(net_series(inflow, outflow))
            }
            _ => None,
        };

        Ok((artifacts, Some(zone_aggregate), net))
    }

    // -----------------------------------------------------------------
    // Phase 4: comparative views
    // -----------------------------------------------------------------

    fn comparative_phase(
        &self,
        manifest: &mut RunManifest,
        aggregates: &[ZoneAggregate],
        nets: &[Series],
    ) {
        if !aggregates.is_empty() {
            let result = self.sink.zone_component_chart(aggregates);
            self.record_chart(
                manifest,
                UnitKind::Comparative,
                "comparacion_componentes_zonas",
                result,
            );

            let result = self.sink.net_balance_chart(aggregates);
            self.record_chart(manifest, UnitKind::Comparative, "balance_neto_zonas", result);
        }

        let evolution = combined_evolution(nets);
        if !evolution.is_empty() {
            let result = self.sink.evolution_chart(&evolution);
            self.record_chart(
                manifest,
                UnitKind::Comparative,
                "evolucion_balance_total",
                result,
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_counts() {
        let mut manifest = RunManifest::new();
        manifest.record_success(UnitKind::Zone, "nucleo", vec![PathBuf::from("a.png")]);
        manifest.record_success(UnitKind::Well, "w1", vec![]);
        manifest.record_failure(
            UnitKind::Well,
            "w2",
            FailureKind::Retrieval,
            "HTTP error: 500".to_string(),
        );

        assert_eq!(manifest.successes(), 2);
        assert_eq!(manifest.failures(), 1);
        assert_eq!(manifest.artifact_count(), 1);
    }

    #[test]
    fn test_kind_and_failure_display() {
        assert_eq!(UnitKind::WellsMap.to_string(), "wells-map");
        assert_eq!(FailureKind::Retrieval.to_string(), "retrieval");
    }
}
