use crate::error::{MotifError, Result};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::ops::Index;

/// Nucleotide symbols in canonical column order
pub const NUCLEOTIDES: [&str; 4] = ["A", "C", "G", "T"];

/// Maximum deviation from 1.0 tolerated for the sum of a probability vector
pub const SUM_TOLERANCE: f64 = 1e-6;

/// Represents a Position Weight Matrix (PWM) as read from disk
/// Stored as a DataFrame with columns A, C, G, T
pub type PWM = DataFrame;

/// Collection of PWMs indexed by motif ID
pub type PWMCollection = HashMap<String, PWM>;

/// Collection of validated PPMs indexed by motif ID, iterated in ID order
pub type MotifCollection = BTreeMap<String, Ppm>;

/// Nucleotide probabilities at a single motif position, in A, C, G, T order.
///
/// Construction checks that every coordinate is finite and non-negative and
/// that the coordinates sum to 1 within [`SUM_TOLERANCE`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct ProbabilityVector([f64; 4]);

impl ProbabilityVector {
    pub fn new(values: [f64; 4]) -> Result<Self> {
        if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(MotifError::validation(format!(
                "probability {} is negative or not finite in {:?}",
                bad, values
            )));
        }
        let sum: f64 = values.iter().sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(MotifError::validation(format!(
                "probabilities {:?} sum to {}, expected 1",
                values, sum
            )));
        }
        Ok(Self(values))
    }

    /// Uniform background, 0.25 per nucleotide
    pub fn uniform() -> Self {
        Self([0.25; 4])
    }

    pub fn as_array(&self) -> &[f64; 4] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.0.iter()
    }

    /// Returns true if any coordinate is exactly zero
    pub fn has_zero(&self) -> bool {
        self.0.iter().any(|&v| v == 0.0)
    }
}

impl Default for ProbabilityVector {
    fn default() -> Self {
        Self::uniform()
    }
}

impl Index<usize> for ProbabilityVector {
    type Output = f64;

    fn index(&self, idx: usize) -> &f64 {
        &self.0[idx]
    }
}

impl TryFrom<[f64; 4]> for ProbabilityVector {
    type Error = MotifError;

    fn try_from(values: [f64; 4]) -> Result<Self> {
        Self::new(values)
    }
}

impl From<ProbabilityVector> for [f64; 4] {
    fn from(pv: ProbabilityVector) -> Self {
        pv.0
    }
}

/// Position Probability Matrix: one [`ProbabilityVector`] per motif position.
///
/// A `Ppm` is never empty and never modified after construction; padding and
/// pseudocounting return new matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct Ppm {
    positions: Vec<ProbabilityVector>,
}

impl Ppm {
    pub fn new(positions: Vec<ProbabilityVector>) -> Result<Self> {
        if positions.is_empty() {
            return Err(MotifError::validation("PPM has no positions"));
        }
        Ok(Self { positions })
    }

    /// Builds a PPM from raw rows, validating each one
    pub fn from_rows(rows: &[[f64; 4]]) -> Result<Self> {
        let positions = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                ProbabilityVector::new(*row).map_err(|e| {
                    MotifError::validation(format!("position {}: {}", i, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(positions)
    }

    /// Builds a PPM from an `n x 4` array
    pub fn from_array(array: &Array2<f64>) -> Result<Self> {
        if array.ncols() != NUCLEOTIDES.len() {
            return Err(MotifError::validation(format!(
                "expected {} columns, found {}",
                NUCLEOTIDES.len(),
                array.ncols()
            )));
        }
        let rows: Vec<[f64; 4]> = array
            .rows()
            .into_iter()
            .map(|row| [row[0], row[1], row[2], row[3]])
            .collect();
        Self::from_rows(&rows)
    }

    pub fn to_array(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.len(), NUCLEOTIDES.len()), |(i, j)| {
            self.positions[i][j]
        })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[ProbabilityVector] {
        &self.positions
    }

    /// Returns a new matrix with `start` background positions prepended and
    /// `end` background positions appended
    pub fn padded(&self, start: usize, end: usize, background: &ProbabilityVector) -> Ppm {
        let mut positions = Vec::with_capacity(start + self.len() + end);
        positions.extend(std::iter::repeat(*background).take(start));
        positions.extend_from_slice(&self.positions);
        positions.extend(std::iter::repeat(*background).take(end));
        Ppm { positions }
    }

    /// Adds `pseudocount` to every coordinate and renormalises each position.
    ///
    /// This is the upstream preparation step required before KL or
    /// Jensen-Shannon comparisons; the distance engine never applies it.
    pub fn with_pseudocount(&self, pseudocount: f64) -> Result<Ppm> {
        if !pseudocount.is_finite() || pseudocount < 0.0 {
            return Err(MotifError::invalid_parameter(
                "pseudocount",
                pseudocount,
                "must be a finite non-negative number",
            ));
        }
        let positions = self
            .positions
            .iter()
            .map(|pv| {
                let total: f64 = pv.iter().map(|p| p + pseudocount).sum();
                ProbabilityVector::new(pv.as_array().map(|p| (p + pseudocount) / total))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Ppm { positions })
    }
}

impl Index<usize> for Ppm {
    type Output = ProbabilityVector;

    fn index(&self, idx: usize) -> &ProbabilityVector {
        &self.positions[idx]
    }
}

impl TryFrom<&PWM> for Ppm {
    type Error = MotifError;

    /// Reads the A, C, G, T columns of a PWM DataFrame into a validated PPM
    fn try_from(df: &PWM) -> Result<Self> {
        let columns = NUCLEOTIDES
            .iter()
            .map(|name| {
                df.column(name)
                    .and_then(|c| c.f64().cloned())
                    .map_err(|e| MotifError::DataError(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let rows = (0..df.height())
            .map(|i| {
                let mut row = [0.0; 4];
                for (j, column) in columns.iter().enumerate() {
                    row[j] = column.get(i).ok_or_else(|| {
                        MotifError::DataError(format!(
                            "missing {} value at position {}",
                            NUCLEOTIDES[j], i
                        ))
                    })?;
                }
                Ok(row)
            })
            .collect::<Result<Vec<_>>>()?;

        Ppm::from_rows(&rows)
    }
}
