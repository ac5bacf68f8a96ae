//! Orchestrator integration tests.
//!
//! Drive the pipeline with stub data and render implementations to pin the
//! partial-success semantics: one unit's failure must never abort the
//! batch, while failures of the shared classification step must abort the
//! whole run.

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::PathBuf;

use acuimon_service::geometry::GeoShape;
use acuimon_service::ingest::metamodel::{BalanceSample, ZoneFeature, ZoneFeatureProperties};
use acuimon_service::ingest::{DataService, HeadKind};
use acuimon_service::model::{
    RawSample, Regime, RetrievalError, Series, WellPoint, ZoneAggregate, ZoneBoundary,
};
use acuimon_service::pipeline::{
    FailureKind, Pipeline, PipelineError, UnitKind, UnitStatus,
};
use acuimon_service::render::{RenderError, RenderSink};
use serde_json::json;
use std::collections::BTreeMap;

// ============================================================================
// Stub data service
// ============================================================================

fn sample(date: &str, value: f64) -> RawSample {
    RawSample {
        date: date.to_string(),
        value,
    }
}

fn balance_row(date: &str, step_in: f64, step_out: f64) -> BalanceSample {
    BalanceSample {
        date: date.to_string(),
        value_step_in: Some(step_in),
        value_step_out: Some(step_out),
        value_step_rate: Some(step_in - step_out),
    }
}

fn polygon_feature(zona: &str, coordinates: serde_json::Value) -> ZoneFeature {
    ZoneFeature {
        geometry: GeoShape {
            kind: "Polygon".to_string(),
            coordinates,
        },
        properties: ZoneFeatureProperties {
            zona: zona.to_string(),
        },
    }
}

fn valid_utm_ring() -> serde_json::Value {
    json!([[
        [440_000.0, 6_940_000.0],
        [460_000.0, 6_940_000.0],
        [450_000.0, 6_960_000.0],
        [440_000.0, 6_940_000.0]
    ]])
}

/// Ten wells with distinct levels: comfortably classifiable.
fn healthy_population() -> Vec<WellPoint> {
    (0..10)
        .map(|i| WellPoint {
            id: format!("Pozo_{}_E800_N700", i),
            lon: -70.3 - 0.01 * i as f64,
            lat: -27.4 + 0.01 * i as f64,
            level: 400.0 + i as f64,
            class: None,
        })
        .collect()
}

struct StubDataService {
    fail_zones: HashSet<String>,
    fail_wells: HashSet<String>,
    fail_population: bool,
    population: Vec<WellPoint>,
    features: Vec<ZoneFeature>,
}

impl Default for StubDataService {
    fn default() -> StubDataService {
        StubDataService {
            fail_zones: HashSet::new(),
            fail_wells: HashSet::new(),
            fail_population: false,
            population: healthy_population(),
            features: vec![polygon_feature("nucleo", valid_utm_ring())],
        }
    }
}

impl DataService for StubDataService {
    fn zones(&self) -> Result<Vec<String>, RetrievalError> {
        Ok(vec!["nucleo".to_string()])
    }

    fn head_series(
        &self,
        zone: &str,
        _kind: HeadKind,
        regime: Regime,
    ) -> Result<Vec<RawSample>, RetrievalError> {
        if self.fail_zones.contains(zone) {
            return Err(RetrievalError::Http(503));
        }
        Ok(match regime {
            Regime::Historical => vec![sample("2023-01-01", 410.0), sample("2023-02-01", 409.5)],
            Regime::Forecast => vec![sample("2023-03-01", 409.0)],
        })
    }

    fn balance_series(
        &self,
        zone: &str,
        regime: Regime,
    ) -> Result<Vec<BalanceSample>, RetrievalError> {
        if self.fail_zones.contains(zone) {
            return Err(RetrievalError::Http(503));
        }
        Ok(match regime {
            Regime::Historical => vec![
                balance_row("2023-01-01", 120.0, 80.0),
                balance_row("2023-02-01", 110.0, 85.0),
            ],
            Regime::Forecast => vec![balance_row("2023-03-01", 100.0, 90.0)],
        })
    }

    fn zone_features(&self) -> Result<Vec<ZoneFeature>, RetrievalError> {
        Ok(self.features.clone())
    }

    fn well_list(&self) -> Result<Vec<String>, RetrievalError> {
        Ok(self.population.iter().map(|w| w.id.clone()).collect())
    }

    fn well_record(
        &self,
        well_id: &str,
    ) -> Result<acuimon_service::ingest::WellRecord, RetrievalError> {
        if self.fail_wells.contains(well_id) {
            return Err(RetrievalError::Http(500));
        }
        Ok(acuimon_service::ingest::WellRecord {
            info: Default::default(),
            data: vec![sample("2022-01-01", 400.0), sample("2022-02-01", 401.0)],
        })
    }

    fn well_forecast(&self, well_id: &str) -> Result<Vec<RawSample>, RetrievalError> {
        if self.fail_wells.contains(well_id) {
            return Err(RetrievalError::Http(500));
        }
        Ok(vec![sample("2024-01-01", -0.2), sample("2024-02-01", 0.1)])
    }

    fn well_levels(&self) -> Result<Vec<WellPoint>, RetrievalError> {
        if self.fail_population {
            return Err(RetrievalError::Http(502));
        }
        Ok(self.population.clone())
    }
}

// ============================================================================
// Stub render sink
// ============================================================================

/// Records every chart request instead of drawing; the pipeline only sees
/// artifact paths.
#[derive(Default)]
struct RecordingSink {
    calls: RefCell<Vec<String>>,
    map_wells: RefCell<Vec<WellPoint>>,
    map_zones: RefCell<Vec<ZoneBoundary>>,
}

impl RecordingSink {
    fn record(&self, name: impl Into<String>) -> Result<PathBuf, RenderError> {
        let name = name.into();
        self.calls.borrow_mut().push(name.clone());
        Ok(PathBuf::from(format!("stub/{}.png", name)))
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl RenderSink for RecordingSink {
    fn zone_head_chart(
        &self,
        zone_name: &str,
        metric: &str,
        _series: &Series,
    ) -> Result<PathBuf, RenderError> {
        self.record(format!("head:{}:{}", zone_name, metric))
    }

    fn zone_balance_chart(
        &self,
        zone_name: &str,
        metric: &str,
        _series: &Series,
    ) -> Result<PathBuf, RenderError> {
        self.record(format!("balance:{}:{}", zone_name, metric))
    }

    fn zone_balance_combined_chart(
        &self,
        zone_name: &str,
        _by_metric: &BTreeMap<String, Series>,
    ) -> Result<PathBuf, RenderError> {
        self.record(format!("balance-combined:{}", zone_name))
    }

    fn wells_map(
        &self,
        wells: &[WellPoint],
        zones: &[ZoneBoundary],
    ) -> Result<PathBuf, RenderError> {
        *self.map_wells.borrow_mut() = wells.to_vec();
        *self.map_zones.borrow_mut() = zones.to_vec();
        self.record("wells-map")
    }

    fn well_history_chart(
        &self,
        well_id: &str,
        _label: &str,
        _series: &Series,
    ) -> Result<PathBuf, RenderError> {
        self.record(format!("well-history:{}", well_id))
    }

    fn well_forecast_chart(
        &self,
        well_id: &str,
        _label: &str,
        _series: &Series,
    ) -> Result<PathBuf, RenderError> {
        self.record(format!("well-forecast:{}", well_id))
    }

    fn comparative_chart(
        &self,
        file_stem: &str,
        _title: &str,
        _entries: &[(String, Series)],
    ) -> Result<PathBuf, RenderError> {
        self.record(format!("comparative:{}", file_stem))
    }

    fn zone_component_chart(&self, _aggregates: &[ZoneAggregate]) -> Result<PathBuf, RenderError> {
        self.record("zone-components")
    }

    fn net_balance_chart(&self, _aggregates: &[ZoneAggregate]) -> Result<PathBuf, RenderError> {
        self.record("net-balance")
    }

    fn evolution_chart(&self, _series: &Series) -> Result<PathBuf, RenderError> {
        self.record("evolution")
    }
}

fn featured(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("Pozo_f{}_E800_N700", i)).collect()
}

// ============================================================================
// Partial-failure semantics
// ============================================================================

#[test]
fn test_one_failing_well_does_not_abort_the_batch() {
    let wells = featured(5);
    let mut data = StubDataService::default();
    // Unit 3 of 5 fails at retrieval.
    data.fail_wells.insert(wells[2].clone());
    let sink = RecordingSink::default();

    let pipeline = Pipeline::new(&data, &sink, wells.clone());
    let manifest = pipeline.run().expect("per-unit failure must not be fatal");

    let well_outcomes: Vec<_> = manifest
        .outcomes
        .iter()
        .filter(|o| o.kind == UnitKind::Well)
        .collect();
    assert_eq!(well_outcomes.len(), 5);

    let successes = well_outcomes
        .iter()
        .filter(|o| matches!(o.status, UnitStatus::Success { .. }))
        .count();
    assert_eq!(successes, 4);

    let failed: Vec<_> = well_outcomes
        .iter()
        .filter_map(|o| match &o.status {
            UnitStatus::Failed { failure, .. } => Some((o.unit_id.clone(), *failure)),
            UnitStatus::Success { .. } => None,
        })
        .collect();
    assert_eq!(failed, vec![(wells[2].clone(), FailureKind::Retrieval)]);

    // Units 4 and 5 still executed after the failure.
    let calls = sink.calls();
    assert!(calls.contains(&format!("well-history:{}", wells[3])));
    assert!(calls.contains(&format!("well-history:{}", wells[4])));
}

#[test]
fn test_one_failing_zone_does_not_abort_the_rest() {
    let mut data = StubDataService::default();
    data.fail_zones.insert("marginal_norte".to_string());
    let sink = RecordingSink::default();

    let pipeline = Pipeline::new(&data, &sink, featured(1));
    let manifest = pipeline.run().unwrap();

    let zone_outcomes: Vec<_> = manifest
        .outcomes
        .iter()
        .filter(|o| o.kind == UnitKind::Zone)
        .collect();
    assert_eq!(zone_outcomes.len(), acuimon_service::zones::ZONE_REGISTRY.len());

    for outcome in &zone_outcomes {
        if outcome.unit_id == "marginal_norte" {
            assert!(matches!(
                outcome.status,
                UnitStatus::Failed {
                    failure: FailureKind::Retrieval,
                    ..
                }
            ));
        } else {
            assert!(
                matches!(outcome.status, UnitStatus::Success { .. }),
                "zone {} should have succeeded",
                outcome.unit_id
            );
        }
    }

    // The healthy zones still produced their charts.
    assert!(sink.calls().contains(&"head:nucleo:head_absoluto".to_string()));
    assert!(sink.calls().contains(&"balance:norte:step_in".to_string()));
}

// ============================================================================
// Classification barrier
// ============================================================================

#[test]
fn test_classification_runs_before_any_well_level_rendering() {
    let data = StubDataService::default();
    let sink = RecordingSink::default();

    Pipeline::new(&data, &sink, featured(2)).run().unwrap();

    // Every well handed to the map already carries its class.
    let map_wells = sink.map_wells.borrow();
    assert_eq!(map_wells.len(), 10);
    assert!(map_wells.iter().all(|w| w.class.is_some()));

    // The map (first well-level artifact) comes after classification by
    // construction; make sure it was actually rendered with the backdrop.
    assert_eq!(sink.map_zones.borrow().len(), 1);
}

#[test]
fn test_insufficient_population_aborts_the_run() {
    let mut data = StubDataService::default();
    data.population = healthy_population().into_iter().take(3).collect();
    let sink = RecordingSink::default();

    let err = Pipeline::new(&data, &sink, featured(1)).run().unwrap_err();
    assert!(matches!(err, PipelineError::Classification(_)));

    // No well-level chart may exist after an aborted classification.
    assert!(sink.calls().iter().all(|c| !c.starts_with("well-")));
}

#[test]
fn test_population_fetch_failure_is_fatal() {
    let mut data = StubDataService::default();
    data.fail_population = true;
    let sink = RecordingSink::default();

    let err = Pipeline::new(&data, &sink, featured(1)).run().unwrap_err();
    assert!(matches!(
        err,
        PipelineError::WellPopulation(RetrievalError::Http(502))
    ));
}

// ============================================================================
// Geometry isolation
// ============================================================================

#[test]
fn test_bad_geometry_is_skipped_and_siblings_survive() {
    let mut data = StubDataService::default();
    data.features = vec![
        polygon_feature("nucleo", valid_utm_ring()),
        // Two distinct vertices only.
        polygon_feature(
            "marginal_norte",
            json!([[[440_000.0, 6_940_000.0], [460_000.0, 6_940_000.0]]]),
        ),
        ZoneFeature {
            geometry: GeoShape {
                kind: "Point".to_string(),
                coordinates: json!([-70.0, -27.0]),
            },
            properties: ZoneFeatureProperties {
                zona: "norte".to_string(),
            },
        },
    ];
    let sink = RecordingSink::default();

    let manifest = Pipeline::new(&data, &sink, featured(1)).run().unwrap();

    let geometry_outcomes: Vec<_> = manifest
        .outcomes
        .iter()
        .filter(|o| o.kind == UnitKind::Geometry)
        .collect();
    assert_eq!(geometry_outcomes.len(), 3);

    let failed: Vec<_> = geometry_outcomes
        .iter()
        .filter(|o| matches!(o.status, UnitStatus::Failed { .. }))
        .map(|o| o.unit_id.clone())
        .collect();
    assert_eq!(failed, vec!["marginal_norte", "norte"]);

    // The surviving boundary still reaches the map.
    assert_eq!(sink.map_zones.borrow().len(), 1);
    assert_eq!(sink.map_zones.borrow()[0].name, "nucleo");
}

// ============================================================================
// Full pass
// ============================================================================

#[test]
fn test_clean_run_covers_every_view() {
    let data = StubDataService::default();
    let sink = RecordingSink::default();

    let manifest = Pipeline::new(&data, &sink, featured(2)).run().unwrap();
    assert_eq!(manifest.failures(), 0);

    let calls = sink.calls();
    for expected in [
        "wells-map",
        "head:nucleo:head_absoluto",
        "head:nucleo:head_delta",
        "balance:nucleo:step_in",
        "balance:nucleo:step_out",
        "balance:nucleo:step_rate",
        "balance-combined:nucleo",
        "comparative:pozos_comparativo",
        "comparative:pronosticos_comparativo",
        "zone-components",
        "net-balance",
        "evolution",
    ] {
        assert!(
            calls.iter().any(|c| c == expected),
            "expected chart '{}' missing from {:?}",
            expected,
            calls
        );
    }
}
