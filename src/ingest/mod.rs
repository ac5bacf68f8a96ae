//! Retrieval clients for the hydromet data platform.
//!
//! Two upstream families serve this pipeline:
//! - `metamodel` — per-zone head and balance series plus zone geometries.
//! - `wells` — the well platform: listings, per-well history and
//!   forecast, and the wells-level GeoJSON used for classification.
//!
//! Records arrive as already-parsed serde structures; everything beyond
//! transport and deserialization (ordering, validation, merging) belongs
//! to the analysis modules.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::model::{RawSample, Regime, RetrievalError, WellPoint};

pub mod metamodel;
pub mod wells;

pub use metamodel::{BalanceSample, HeadKind, ZoneFeature};
pub use wells::WellRecord;

// ---------------------------------------------------------------------------
// Shared transport helper
// ---------------------------------------------------------------------------

/// GETs a URL and deserializes the JSON body, mapping transport, status
/// and decode failures onto the retrieval error taxonomy.
pub(crate) fn get_json<T: DeserializeOwned>(
    client: &reqwest::blocking::Client,
    url: &str,
) -> Result<T, RetrievalError> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .map_err(|e| RetrievalError::Transport(e.to_string()))?;

    if !response.status().is_success() {
        return Err(RetrievalError::Http(response.status().as_u16()));
    }

    response
        .json()
        .map_err(|e| RetrievalError::Parse(e.to_string()))
}

// ---------------------------------------------------------------------------
// Data service seam
// ---------------------------------------------------------------------------

/// Everything the pipeline needs from the remote platform, behind one
/// trait so the orchestrator can be driven by stub implementations in
/// tests. The HTTP implementation does no retrying — surfacing a unit's
/// failure and moving on is the orchestrator's policy.
pub trait DataService {
    /// Zone ids the metamodel currently publishes.
    fn zones(&self) -> Result<Vec<String>, RetrievalError>;

    /// Head series for one zone, kind and regime.
    fn head_series(
        &self,
        zone: &str,
        kind: HeadKind,
        regime: Regime,
    ) -> Result<Vec<RawSample>, RetrievalError>;

    /// Balance rows for one zone and regime.
    fn balance_series(&self, zone: &str, regime: Regime)
        -> Result<Vec<BalanceSample>, RetrievalError>;

    /// Raw zone boundary features (geometry still unresolved).
    fn zone_features(&self) -> Result<Vec<ZoneFeature>, RetrievalError>;

    /// Ids of all wells known to the platform.
    fn well_list(&self) -> Result<Vec<String>, RetrievalError>;

    /// Historic level records and metadata for one well.
    fn well_record(&self, well_id: &str) -> Result<WellRecord, RetrievalError>;

    /// Forecast records for one well.
    fn well_forecast(&self, well_id: &str) -> Result<Vec<RawSample>, RetrievalError>;

    /// Current level of every monitored well, as unclassified points.
    /// This is the population the classifier consumes in one pass.
    fn well_levels(&self) -> Result<Vec<WellPoint>, RetrievalError>;
}

/// `DataService` over the live hydromet API.
pub struct HttpDataService {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpDataService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RetrievalError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RetrievalError::Transport(e.to_string()))?;
        Ok(HttpDataService {
            client,
            base_url: base_url.into(),
        })
    }
}

impl DataService for HttpDataService {
    fn zones(&self) -> Result<Vec<String>, RetrievalError> {
        metamodel::fetch_zones(&self.client, &self.base_url)
    }

    fn head_series(
        &self,
        zone: &str,
        kind: HeadKind,
        regime: Regime,
    ) -> Result<Vec<RawSample>, RetrievalError> {
        metamodel::fetch_head_series(&self.client, &self.base_url, zone, kind, regime)
    }

    fn balance_series(
        &self,
        zone: &str,
        regime: Regime,
    ) -> Result<Vec<BalanceSample>, RetrievalError> {
        metamodel::fetch_balance_series(&self.client, &self.base_url, zone, regime)
    }

    fn zone_features(&self) -> Result<Vec<ZoneFeature>, RetrievalError> {
        metamodel::fetch_zone_features(&self.client, &self.base_url)
    }

    fn well_list(&self) -> Result<Vec<String>, RetrievalError> {
        wells::fetch_well_list(&self.client, &self.base_url)
    }

    fn well_record(&self, well_id: &str) -> Result<WellRecord, RetrievalError> {
        wells::fetch_well_record(&self.client, &self.base_url, well_id)
    }

    fn well_forecast(&self, well_id: &str) -> Result<Vec<RawSample>, RetrievalError> {
        wells::fetch_well_forecast(&self.client, &self.base_url, well_id)
    }

    fn well_levels(&self) -> Result<Vec<WellPoint>, RetrievalError> {
        wells::fetch_well_levels(&self.client, &self.base_url)
    }
}
