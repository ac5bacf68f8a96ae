//! Live API verification tests.
//!
//! These tests hit the production hydromet API to confirm that the zone
//! registry and endpoint builders still match reality. They are marked
//! #[ignore] so CI never depends on external availability.
//!
//! To run them manually:
//!   cargo test -- --ignored live_api

use std::time::Duration;

use acuimon_service::analysis::classify::classify;
use acuimon_service::analysis::reconcile::reconcile;
use acuimon_service::geometry::{self, RawGeometry, UTM_ZONE_19S};
use acuimon_service::ingest::metamodel;
use acuimon_service::ingest::wells;
use acuimon_service::ingest::HeadKind;
use acuimon_service::model::Regime;
use acuimon_service::zones::ZONE_REGISTRY;

const BASE_URL: &str = "https://hydromet4api.hidrofuturo.cl";

fn client() -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap()
}

#[test]
#[ignore] // Don't run in CI - depends on external API
fn live_api_zone_listing_covers_registry() {
    let client = client();
    let zones = metamodel::fetch_zones(&client, BASE_URL).expect("zone listing should respond");

    println!("\n🔍 Live zones: {:?}", zones);
    println!("═══════════════════════════════════════════════════════════");

    for zone in ZONE_REGISTRY {
        assert!(
            zones.iter().any(|z| z == zone.id),
            "registry zone '{}' missing from live listing {:?}",
            zone.id,
            zones
        );
    }
}

#[test]
#[ignore] // Don't run in CI - depends on external API
fn live_api_head_series_reconciles_for_every_zone() {
    let client = client();
    let mut failures = Vec::new();

    for zone in ZONE_REGISTRY {
        println!("\n🔍 Checking head series for {}...", zone.id);

        let hist = metamodel::fetch_head_series(
            &client,
            BASE_URL,
            zone.id,
            HeadKind::Absolute,
            Regime::Historical,
        );
        let fore = metamodel::fetch_head_series(
            &client,
            BASE_URL,
            zone.id,
            HeadKind::Absolute,
            Regime::Forecast,
        );

        match (hist, fore) {
            (Ok(hist), Ok(fore)) => match reconcile(&hist, &fore) {
                Ok(series) => {
                    println!(
                        "   ✓ {} points, boundary at {:?}",
                        series.len(),
                        series.boundary_index()
                    );
                }
                Err(e) => failures.push(format!("{}: reconcile failed: {}", zone.id, e)),
            },
            (h, f) => failures.push(format!("{}: fetch failed: {:?} / {:?}", zone.id, h, f)),
        }
    }

    assert!(failures.is_empty(), "head series failures: {:?}", failures);
}

#[test]
#[ignore] // Don't run in CI - depends on external API
fn live_api_balance_series_has_components() {
    let client = client();
    let rows =
        metamodel::fetch_balance_series(&client, BASE_URL, "nucleo", Regime::Historical)
            .expect("balance series should respond");
    assert!(!rows.is_empty(), "core zone should have balance history");
    assert!(
        rows.iter().any(|r| r.value_step_in.is_some()),
        "balance rows should carry step_in"
    );
}

#[test]
#[ignore] // Don't run in CI - depends on external API
fn live_api_zone_geometries_normalize() {
    let client = client();
    let features =
        metamodel::fetch_zone_features(&client, BASE_URL).expect("geojson should respond");

    let mut normalized = 0;
    for feature in &features {
        let raw = RawGeometry::resolve(&feature.geometry)
            .unwrap_or_else(|e| panic!("{}: unresolvable geometry: {}", feature.properties.zona, e));
        let rings = geometry::normalize(&raw, UTM_ZONE_19S)
            .unwrap_or_else(|e| panic!("{}: {}", feature.properties.zona, e));
        for ring in &rings {
            for (lon, lat) in &ring.vertices {
                assert!(
                    (-75.0..-66.0).contains(lon) && (-35.0..-17.0).contains(lat),
                    "{}: vertex ({}, {}) outside plausible Chile bounds",
                    feature.properties.zona,
                    lon,
                    lat
                );
            }
        }
        normalized += rings.len();
    }

    println!("✓ normalized {} rings from {} features", normalized, features.len());
    assert!(normalized > 0);
}

#[test]
#[ignore] // Don't run in CI - depends on external API
fn live_api_well_population_is_classifiable() {
    let client = client();
    let points = wells::fetch_well_levels(&client, BASE_URL).expect("levels should respond");
    println!("🔍 {} wells in population", points.len());

    let population: Vec<(String, f64)> =
        points.iter().map(|w| (w.id.clone(), w.level)).collect();
    let classes = classify(&population).expect("live population should be classifiable");
    assert_eq!(classes.len(), population.len());
}

#[test]
#[ignore] // Don't run in CI - depends on external API
fn live_api_featured_wells_have_records() {
    let client = client();
    let listing = wells::fetch_well_list(&client, BASE_URL).expect("listing should respond");
    println!("🔍 {} wells listed", listing.len());
    assert!(!listing.is_empty());

    let record = wells::fetch_well_record(&client, BASE_URL, "Pozo_104_E809_N774")
        .expect("featured well should respond");
    assert!(!record.data.is_empty(), "featured well should have history");

    let with_forecast =
        wells::fetch_forecast_list(&client, BASE_URL).expect("forecast listing should respond");
    println!("🔍 {} wells with forecasts", with_forecast.len());
    assert!(!with_forecast.is_empty());
}
