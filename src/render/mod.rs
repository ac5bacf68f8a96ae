//! Chart rendering for the aquifer monitoring service.
//!
//! The pipeline decides *what* to draw — which series, which chart kind —
//! and hands the data to a `RenderSink`. Pixel-level styling is the
//! sink's own business. The production sink (`charts::ChartRenderer`)
//! writes PNG artifacts with plotters; tests substitute a recording stub.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::model::{Series, WellPoint, ZoneAggregate, ZoneBoundary};

pub mod charts;

pub use charts::ChartRenderer;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Rendering failures. Per-unit: a chart that cannot be drawn fails its
/// unit in the run manifest and the batch continues.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Asked to draw a chart from no points at all.
    EmptyInput,
    /// The drawing backend or the filesystem refused.
    Backend(String),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::EmptyInput => write!(f, "Nothing to draw: empty input"),
            RenderError::Backend(msg) => write!(f, "Render backend error: {}", msg),
        }
    }
}

impl std::error::Error for RenderError {}

// ---------------------------------------------------------------------------
// Rendering seam
// ---------------------------------------------------------------------------

/// One method per chart kind the pipeline produces. Every method returns
/// the path of the written artifact; re-running overwrites prior output.
pub trait RenderSink {
    /// Head evolution for one zone: history and forecast with the regime
    /// transition marked.
    fn zone_head_chart(
        &self,
        zone_name: &str,
        metric: &str,
        series: &Series,
    ) -> Result<PathBuf, RenderError>;

    /// One balance component for one zone, as monthly bars.
    fn zone_balance_chart(
        &self,
        zone_name: &str,
        metric: &str,
        series: &Series,
    ) -> Result<PathBuf, RenderError>;

    /// All balance components of one zone stacked as subplots.
    fn zone_balance_combined_chart(
        &self,
        zone_name: &str,
        by_metric: &BTreeMap<String, Series>,
    ) -> Result<PathBuf, RenderError>;

    /// Classified wells over the zone boundary backdrop.
    fn wells_map(
        &self,
        wells: &[WellPoint],
        zones: &[ZoneBoundary],
    ) -> Result<PathBuf, RenderError>;

    /// Historic levels of one well with mean/min/max reference lines.
    fn well_history_chart(
        &self,
        well_id: &str,
        label: &str,
        series: &Series,
    ) -> Result<PathBuf, RenderError>;

    /// Forecast level variation of one well against the zero reference.
    fn well_forecast_chart(
        &self,
        well_id: &str,
        label: &str,
        series: &Series,
    ) -> Result<PathBuf, RenderError>;

    /// Several wells on one chart, one line each.
    fn comparative_chart(
        &self,
        file_stem: &str,
        title: &str,
        entries: &[(String, Series)],
    ) -> Result<PathBuf, RenderError>;

    /// Mean balance components per zone, grouped bars.
    fn zone_component_chart(&self, aggregates: &[ZoneAggregate]) -> Result<PathBuf, RenderError>;

    /// Mean net balance per zone; zones with unknown net are left out
    /// rather than drawn as zero.
    fn net_balance_chart(&self, aggregates: &[ZoneAggregate]) -> Result<PathBuf, RenderError>;

    /// System-wide net balance evolution across all zones.
    fn evolution_chart(&self, series: &Series) -> Result<PathBuf, RenderError>;
}
