use crate::alignment::{motif_distance, DistanceOptions};
use crate::error::{MotifError, Result};
use crate::types::{MotifCollection, Ppm};
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;
use std::collections::HashSet;
use tracing::debug;

/// Largest |d(i, j) - d(j, i)| accepted as symmetric
pub const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Symmetric pairwise distances between named motifs.
///
/// Row and column `i` both belong to `ids()[i]`. The diagonal is zero by
/// convention and is never consulted by the clustering code.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    ids: Vec<String>,
    values: Array2<f64>,
}

impl DistanceMatrix {
    /// Wraps a caller-supplied matrix after validating it
    ///
    /// # Errors
    /// * `MotifError::EmptyInput` - `ids` is empty
    /// * `MotifError::Validation` - shape mismatch, duplicate ids, negative or
    ///   non-finite entries, or an asymmetric matrix
    pub fn new(ids: Vec<String>, mut values: Array2<f64>) -> Result<Self> {
        if ids.is_empty() {
            return Err(MotifError::empty_input("no motif identifiers supplied"));
        }
        let n = ids.len();
        if values.dim() != (n, n) {
            return Err(MotifError::validation(format!(
                "distance matrix is {:?} but {} identifiers were supplied",
                values.dim(),
                n
            )));
        }

        let mut seen = HashSet::with_capacity(n);
        if let Some(dup) = ids.iter().find(|id| !seen.insert(id.as_str())) {
            return Err(MotifError::validation(format!(
                "duplicate motif identifier {}",
                dup
            )));
        }

        for ((i, j), &d) in values.indexed_iter() {
            if i == j {
                continue;
            }
            if !d.is_finite() || d < 0.0 {
                return Err(MotifError::validation(format!(
                    "distance {} between {} and {} is negative or not finite",
                    d, ids[i], ids[j]
                )));
            }
            if (d - values[[j, i]]).abs() > SYMMETRY_TOLERANCE {
                return Err(MotifError::validation(format!(
                    "distance matrix is not symmetric at ({}, {})",
                    ids[i], ids[j]
                )));
            }
        }

        // -0.0 passes the sign check but sorts below 0.0 under total ordering
        values.mapv_inplace(|d| d + 0.0);
        Ok(Self { ids, values })
    }

    /// Builds from nested rows, as produced by most callers
    pub fn from_rows(ids: Vec<String>, rows: &[Vec<f64>]) -> Result<Self> {
        let n = rows.len();
        if let Some(row) = rows.iter().find(|row| row.len() != n) {
            return Err(MotifError::validation(format!(
                "distance matrix row has {} entries, expected {}",
                row.len(),
                n
            )));
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let values = Array2::from_shape_vec((n, n), flat)
            .map_err(|e| MotifError::DataError(e.to_string()))?;
        Self::new(ids, values)
    }

    /// Computes every pairwise motif distance.
    ///
    /// Pairs are independent, so the upper triangle is evaluated in parallel
    /// and mirrored.
    pub fn from_motifs(motifs: &MotifCollection, options: &DistanceOptions) -> Result<Self> {
        if motifs.is_empty() {
            return Err(MotifError::empty_input("no motifs supplied"));
        }
        let (ids, ppms): (Vec<String>, Vec<&Ppm>) =
            motifs.iter().map(|(id, ppm)| (id.clone(), ppm)).unzip();
        let n = ids.len();

        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .collect();
        debug!(motifs = n, pairs = pairs.len(), "computing distance matrix");

        let distances = pairs
            .par_iter()
            .map(|&(i, j)| motif_distance(ppms[i], ppms[j], options).map(|r| r.distance))
            .collect::<Result<Vec<_>>>()?;

        let mut values = Array2::zeros((n, n));
        for (&(i, j), d) in pairs.iter().zip(distances) {
            values[[i, j]] = d;
            values[[j, i]] = d;
        }
        Self::new(ids, values)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[[i, j]]
    }
}
