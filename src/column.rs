//! Distances between two single-position probability vectors.
//!
//! Every function here is symmetric in its arguments and returns 0 for
//! identical inputs (up to floating point rounding).

use crate::error::{MotifError, Result};
use crate::types::ProbabilityVector;
use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Center used by the Pearson distance: the uniform value, nudged so that an
/// exactly uniform vector never produces a zero denominator
pub const PEARSON_CENTER: f64 = 0.25 + PEARSON_CENTER_EPSILON;

pub const PEARSON_CENTER_EPSILON: f64 = 1e-9;

/// Column comparison used when scoring aligned motif positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnMetric {
    #[default]
    Euclidean,
    Pearson,
    KullbackLeibler,
    JensenShannon,
}

static METRIC_NAMES: phf::Map<&'static str, ColumnMetric> = phf_map! {
    "euclidean" => ColumnMetric::Euclidean,
    "pearson" => ColumnMetric::Pearson,
    "kl" => ColumnMetric::KullbackLeibler,
    "kullback_leibler" => ColumnMetric::KullbackLeibler,
    "js" => ColumnMetric::JensenShannon,
    "jensen_shannon" => ColumnMetric::JensenShannon,
};

impl ColumnMetric {
    /// Distance between two positions under this metric
    pub fn distance(&self, a: &ProbabilityVector, b: &ProbabilityVector) -> Result<f64> {
        match self {
            ColumnMetric::Euclidean => Ok(euclidean(a, b)),
            ColumnMetric::Pearson => Ok(pearson(a, b)),
            ColumnMetric::KullbackLeibler => kullback_leibler(a, b),
            ColumnMetric::JensenShannon => jensen_shannon(a, b),
        }
    }

    /// Whether the metric rejects zero coordinates
    pub fn requires_pseudocount(&self) -> bool {
        matches!(
            self,
            ColumnMetric::KullbackLeibler | ColumnMetric::JensenShannon
        )
    }
}

impl FromStr for ColumnMetric {
    type Err = MotifError;

    fn from_str(s: &str) -> Result<Self> {
        METRIC_NAMES
            .get(s.to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| {
                MotifError::invalid_parameter(
                    "metric",
                    s,
                    "expected one of euclidean, pearson, kl, js",
                )
            })
    }
}

impl fmt::Display for ColumnMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnMetric::Euclidean => "euclidean",
            ColumnMetric::Pearson => "pearson",
            ColumnMetric::KullbackLeibler => "kl",
            ColumnMetric::JensenShannon => "js",
        };
        f.write_str(name)
    }
}

/// Square root of the summed squared coordinate differences
pub fn euclidean(a: &ProbabilityVector, b: &ProbabilityVector) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// One minus the Pearson correlation, centered on [`PEARSON_CENTER`]
pub fn pearson(a: &ProbabilityVector, b: &ProbabilityVector) -> f64 {
    pearson_centered(a, b, PEARSON_CENTER)
}

/// One minus the Pearson correlation computed about `center`
pub fn pearson_centered(a: &ProbabilityVector, b: &ProbabilityVector, center: f64) -> f64 {
    let mut cross = 0.0;
    let mut sq_a = 0.0;
    let mut sq_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let dx = x - center;
        let dy = y - center;
        cross += dx * dy;
        sq_a += dx * dx;
        sq_b += dy * dy;
    }
    1.0 - cross / (sq_a * sq_b).sqrt()
}

fn reject_zeros(metric: &str, a: &ProbabilityVector, b: &ProbabilityVector) -> Result<()> {
    if a.has_zero() || b.has_zero() {
        return Err(MotifError::domain(format!(
            "{} distance is undefined for zero probabilities ({:?} vs {:?}); apply a pseudocount first",
            metric,
            a.as_array(),
            b.as_array()
        )));
    }
    Ok(())
}

fn divergence(p: &ProbabilityVector, q: &[f64; 4]) -> f64 {
    p.iter().zip(q.iter()).map(|(x, y)| x * (x / y).ln()).sum()
}

/// Symmetrised Kullback-Leibler divergence: mean of both directions
pub fn kullback_leibler(a: &ProbabilityVector, b: &ProbabilityVector) -> Result<f64> {
    reject_zeros("Kullback-Leibler", a, b)?;
    Ok(0.5 * (divergence(a, b.as_array()) + divergence(b, a.as_array())))
}

/// Jensen-Shannon distance: square root of the mean divergence of each
/// input from their average distribution
pub fn jensen_shannon(a: &ProbabilityVector, b: &ProbabilityVector) -> Result<f64> {
    reject_zeros("Jensen-Shannon", a, b)?;
    let mut mid = [0.0; 4];
    for (m, (x, y)) in mid.iter_mut().zip(a.iter().zip(b.iter())) {
        *m = 0.5 * (x + y);
    }
    let js = 0.5 * (divergence(a, &mid) + divergence(b, &mid));
    // rounding can leave a tiny negative value for identical inputs
    Ok(js.max(0.0).sqrt())
}
