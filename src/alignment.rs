//! Motif-to-motif distance by ungapped alignment search.
//!
//! The shorter motif slides along the longer one over every offset that
//! leaves at least one overlapping position. Each placement is scored by
//! aggregating a [`ColumnMetric`] over the compared positions and the best
//! placement wins. Offsets are always reported relative to the caller's
//! argument order: a positive offset means the second motif starts that many
//! positions after the first.

use crate::column::ColumnMetric;
use crate::error::{MotifError, Result};
use crate::types::{Ppm, ProbabilityVector};
use phf::phf_map;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};

/// How positions outside the overlap are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentMode {
    /// Pad both motifs with background to their union length and score the
    /// whole span; the result is checked against the disjoint placement
    #[default]
    Expand,
    /// Score only the overlapping positions
    Overlap,
}

static MODE_NAMES: phf::Map<&'static str, AlignmentMode> = phf_map! {
    "expand" => AlignmentMode::Expand,
    "overlap" => AlignmentMode::Overlap,
    "cut" => AlignmentMode::Overlap,
};

impl FromStr for AlignmentMode {
    type Err = MotifError;

    fn from_str(s: &str) -> Result<Self> {
        MODE_NAMES
            .get(s.to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| {
                MotifError::invalid_parameter("mode", s, "expected one of expand, overlap")
            })
    }
}

impl fmt::Display for AlignmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignmentMode::Expand => f.write_str("expand"),
            AlignmentMode::Overlap => f.write_str("overlap"),
        }
    }
}

/// Reduces the per-position distances of one placement to a single score
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregator {
    #[default]
    Mean,
    Median,
    Max,
    /// Caller-supplied reduction; not available from configuration files
    #[serde(skip)]
    Custom(fn(&[f64]) -> f64),
}

static AGGREGATOR_NAMES: phf::Map<&'static str, Aggregator> = phf_map! {
    "mean" => Aggregator::Mean,
    "median" => Aggregator::Median,
    "max" => Aggregator::Max,
};

impl Aggregator {
    pub fn aggregate(&self, values: &[f64]) -> f64 {
        match self {
            Aggregator::Mean => Statistics::mean(values),
            Aggregator::Median => Data::new(values.to_vec()).median(),
            Aggregator::Max => Statistics::max(values),
            Aggregator::Custom(f) => f(values),
        }
    }
}

impl FromStr for Aggregator {
    type Err = MotifError;

    fn from_str(s: &str) -> Result<Self> {
        AGGREGATOR_NAMES
            .get(s.to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| {
                MotifError::invalid_parameter(
                    "aggregator",
                    s,
                    "expected one of mean, median, max",
                )
            })
    }
}

/// Parameters of a motif comparison
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceOptions {
    pub metric: ColumnMetric,
    pub mode: AlignmentMode,
    /// Padding vector for `Expand`; ignored by `Overlap`
    pub background: ProbabilityVector,
    pub aggregator: Aggregator,
}

impl Default for DistanceOptions {
    fn default() -> Self {
        Self {
            metric: ColumnMetric::Euclidean,
            mode: AlignmentMode::Expand,
            background: ProbabilityVector::uniform(),
            aggregator: Aggregator::Mean,
        }
    }
}

impl DistanceOptions {
    pub fn new(metric: ColumnMetric, mode: AlignmentMode) -> Self {
        Self {
            metric,
            mode,
            ..Self::default()
        }
    }

    pub fn with_background(mut self, background: ProbabilityVector) -> Self {
        self.background = background;
        self
    }

    pub fn with_aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = aggregator;
        self
    }
}

/// Outcome of [`motif_distance`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentResult {
    pub distance: f64,
    /// Start of the second motif relative to the first, or `None` when no
    /// offset scored better than leaving the motifs unaligned
    pub offset: Option<isize>,
}

/// The two inputs arranged longer-first for the search. Equal-length inputs
/// are put in [`column_order`], so both argument orders score the same
/// placements in the same sequence.
struct Oriented<'a> {
    long: &'a Ppm,
    short: &'a Ppm,
    swapped: bool,
}

impl<'a> Oriented<'a> {
    fn new(ppm1: &'a Ppm, ppm2: &'a Ppm) -> Self {
        let swap = match ppm2.len().cmp(&ppm1.len()) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => column_order(ppm2, ppm1) == Ordering::Less,
        };
        if swap {
            Self {
                long: ppm2,
                short: ppm1,
                swapped: true,
            }
        } else {
            Self {
                long: ppm1,
                short: ppm2,
                swapped: false,
            }
        }
    }

    /// Every offset of the short motif's start relative to the long one's
    /// that leaves at least one overlapping position, in search order
    fn offsets(&self) -> std::ops::Range<isize> {
        -(self.short.len() as isize - 1)..self.long.len() as isize
    }

    /// Maps an internal offset back to the caller's argument order
    fn external(&self, offset: isize) -> isize {
        if self.swapped {
            -offset
        } else {
            offset
        }
    }

    fn overlap_score(&self, offset: isize, options: &DistanceOptions) -> Result<f64> {
        let first = offset.max(0) as usize;
        let last = (offset + self.short.len() as isize).min(self.long.len() as isize) as usize;
        let distances = (first..last)
            .map(|i| {
                let j = (i as isize - offset) as usize;
                options.metric.distance(&self.long[i], &self.short[j])
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(options.aggregator.aggregate(&distances))
    }

    fn expand_score(&self, offset: isize, options: &DistanceOptions) -> Result<f64> {
        let (long_len, short_len) = (self.long.len() as isize, self.short.len() as isize);
        let start = offset.min(0);
        let end = long_len.max(offset + short_len);
        let bg = &options.background;
        let long = self
            .long
            .padded((-start) as usize, (end - long_len) as usize, bg);
        let short = self.short.padded(
            (offset - start) as usize,
            (end - offset - short_len) as usize,
            bg,
        );
        aligned_distance(&long, &short, options.metric, options.aggregator)
    }

    fn score(&self, offset: isize, options: &DistanceOptions) -> Result<f64> {
        match options.mode {
            AlignmentMode::Overlap => self.overlap_score(offset, options),
            AlignmentMode::Expand => self.expand_score(offset, options),
        }
    }

    /// Scores in search order, keyed by internal offset
    fn scan(&self, options: &DistanceOptions) -> Result<Vec<(isize, f64)>> {
        self.offsets()
            .map(|offset| {
                let score = self.score(offset, options)?;
                trace!(offset, score, "scored placement");
                Ok((offset, score))
            })
            .collect()
    }
}

/// Lexicographic order over the probabilities, position by position
fn column_order(a: &Ppm, b: &Ppm) -> Ordering {
    let flat = |ppm: &Ppm| {
        ppm.positions()
            .iter()
            .flat_map(|column| column.as_array().to_vec())
            .collect::<Vec<f64>>()
    };
    let (a, b) = (flat(a), flat(b));
    a.iter()
        .zip(&b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|ord| ord.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

/// Picks the lowest score; ties go to the smaller |offset|, then to the
/// offset met first in the scan
fn best_placement(scores: &[(isize, f64)]) -> Option<(isize, f64)> {
    scores.iter().copied().fold(None, |best, (offset, score)| match best {
        None => Some((offset, score)),
        Some((best_offset, best_score)) => {
            if score < best_score
                || (score == best_score && offset.abs() < best_offset.abs())
            {
                Some((offset, score))
            } else {
                best
            }
        }
    })
}

/// Computes the alignment distance between two motifs of any length.
///
/// In `Overlap` mode the minimum aggregate over all offsets is returned
/// together with its offset. In `Expand` mode the minimum must also beat the
/// fully disjoint placement (the motifs abutting with no overlap); when it does
/// not, the mean aggregate over all offsets is returned with no offset.
///
/// # Arguments
/// * `ppm1` - First motif
/// * `ppm2` - Second motif, may differ in length from the first
/// * `options` - Column metric, alignment mode, background and aggregator
///
/// # Returns
/// * `Result<AlignmentResult>` - The distance, identical for either argument
///   order, and the start of `ppm2` relative to `ppm1` when an offset won
///
/// # Errors
/// * `MotifError::Domain` - KL or Jensen-Shannon applied to a zero probability
pub fn motif_distance(ppm1: &Ppm, ppm2: &Ppm, options: &DistanceOptions) -> Result<AlignmentResult> {
    let oriented = Oriented::new(ppm1, ppm2);
    let scores = oriented.scan(options)?;
    let (offset, distance) = best_placement(&scores)
        .ok_or_else(|| MotifError::empty_input("no offsets to compare"))?;

    if options.mode == AlignmentMode::Expand {
        let disjoint = oriented.expand_score(oriented.long.len() as isize, options)?;
        if distance >= disjoint {
            let mut values: Vec<f64> = scores.iter().map(|(_, s)| *s).collect();
            values.sort_by(f64::total_cmp);
            let mean = Statistics::mean(&values);
            debug!(
                best = distance,
                disjoint,
                mean,
                "no offset beats the disjoint placement, using mean over offsets"
            );
            return Ok(AlignmentResult {
                distance: mean,
                offset: None,
            });
        }
    }

    Ok(AlignmentResult {
        distance,
        offset: Some(oriented.external(offset)),
    })
}

/// Aggregate distance at every searched offset, ascending by offset in the
/// caller's argument order
pub fn offset_profile(
    ppm1: &Ppm,
    ppm2: &Ppm,
    options: &DistanceOptions,
) -> Result<Vec<(isize, f64)>> {
    let oriented = Oriented::new(ppm1, ppm2);
    let mut profile: Vec<(isize, f64)> = oriented
        .scan(options)?
        .into_iter()
        .map(|(offset, score)| (oriented.external(offset), score))
        .collect();
    profile.sort_by_key(|(offset, _)| *offset);
    Ok(profile)
}

/// Compares two equal-length motifs position by position, without any
/// offset search
pub fn aligned_distance(
    ppm1: &Ppm,
    ppm2: &Ppm,
    metric: ColumnMetric,
    aggregator: Aggregator,
) -> Result<f64> {
    if ppm1.len() != ppm2.len() {
        return Err(MotifError::validation(format!(
            "aligned comparison needs equal lengths, got {} and {}",
            ppm1.len(),
            ppm2.len()
        )));
    }
    let distances = ppm1
        .positions()
        .iter()
        .zip(ppm2.positions())
        .map(|(a, b)| metric.distance(a, b))
        .collect::<Result<Vec<_>>>()?;
    Ok(aggregator.aggregate(&distances))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_cover_every_overlap() {
        let long = Ppm::from_rows(&[[0.25; 4]; 4]).unwrap();
        let short = Ppm::from_rows(&[[0.25; 4]; 2]).unwrap();
        let oriented = Oriented::new(&short, &long);

        assert!(oriented.swapped);
        assert_eq!(oriented.offsets().collect::<Vec<_>>(), vec![-1, 0, 1, 2, 3]);
        assert_eq!(oriented.external(2), -2);
    }

    #[test]
    fn ties_prefer_smaller_magnitude() {
        let scores = vec![(-2, 0.5), (-1, 0.1), (0, 0.1), (1, 0.1), (2, 0.3)];
        assert_eq!(best_placement(&scores), Some((0, 0.1)));

        let mirrored = vec![(-1, 0.2), (0, 0.4), (1, 0.2)];
        assert_eq!(best_placement(&mirrored), Some((-1, 0.2)));
    }

    #[test]
    fn aggregators() {
        let values = [1.0, 4.0, 2.0];
        assert!((Aggregator::Mean.aggregate(&values) - 7.0 / 3.0).abs() < 1e-12);
        assert_eq!(Aggregator::Median.aggregate(&values), 2.0);
        assert_eq!(Aggregator::Max.aggregate(&values), 4.0);
        assert_eq!(Aggregator::Custom(|v| v[0]).aggregate(&values), 1.0);
    }
}
