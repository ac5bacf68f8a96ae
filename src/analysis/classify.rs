//! Percentile classification of the well population.
//!
//! Band edges are computed over the full population supplied in each call —
//! there is no global threshold state, and reclassifying the same
//! population always yields the same assignments. The pipeline runs this
//! once, as a barrier, after every well level has been collected.

use std::collections::BTreeMap;

use crate::model::{InsufficientDataError, PercentileClass};

// ---------------------------------------------------------------------------
// Percentile cuts
// ---------------------------------------------------------------------------

/// The three band edges for a population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentileCuts {
    pub p33: f64,
    pub p66: f64,
    pub p90: f64,
}

/// Linear-interpolation percentile over an ascending-sorted slice:
/// rank q·(n−1), interpolated between the two straddling order statistics.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = q * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = rank - lower as f64;
    sorted[lower] + weight * (sorted[upper] - sorted[lower])
}

/// Computes the P33/P66/P90 cut points for a population.
///
/// Fewer than 4 distinct values would make the bands degenerate, so that
/// case is rejected rather than classified.
pub fn percentile_cuts(values: &[f64]) -> Result<PercentileCuts, InsufficientDataError> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut distinct = sorted.clone();
    distinct.dedup();
    if distinct.len() < 4 {
        return Err(InsufficientDataError {
            distinct_values: distinct.len(),
        });
    }

    Ok(PercentileCuts {
        p33: percentile(&sorted, 0.33),
        p66: percentile(&sorted, 0.66),
        p90: percentile(&sorted, 0.90),
    })
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Band assignment for one value. Values exactly on a cut belong to the
/// lower band: exactly P33 is Low, not MedLow.
pub fn classify_value(value: f64, cuts: &PercentileCuts) -> PercentileClass {
    if value <= cuts.p33 {
        PercentileClass::Low
    } else if value <= cuts.p66 {
        PercentileClass::MedLow
    } else if value <= cuts.p90 {
        PercentileClass::MedHigh
    } else {
        PercentileClass::High
    }
}

/// Classifies every entity of a population against cuts computed from that
/// same population.
pub fn classify(
    population: &[(String, f64)],
) -> Result<BTreeMap<String, PercentileClass>, InsufficientDataError> {
    let values: Vec<f64> = population.iter().map(|(_, v)| *v).collect();
    let cuts = percentile_cuts(&values)?;

    Ok(population
        .iter()
        .map(|(id, value)| (id.clone(), classify_value(*value, &cuts)))
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
