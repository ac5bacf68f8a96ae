//! Analysis core for the aquifer monitoring service.
//!
//! The three components here carry the non-trivial invariants of the
//! pipeline: series ordering and regime continuity, population-wide
//! percentile classification, and per-zone balance aggregation. All of
//! them are pure — retrieval and rendering live elsewhere.
//!
//! Submodules:
//! - `reconcile` — merges historical and forecast samples into one series.
//! - `classify` — percentile banding over the full well population.
//! - `aggregate` — per-zone summary statistics and derived net series.

pub mod aggregate;
pub mod classify;
pub mod reconcile;
