use crate::alignment::DistanceOptions;
use crate::dendrogram::{Dendrogram, Linkage, Partition};
use crate::error::{MotifError, Result};
use crate::matrix::DistanceMatrix;
use crate::types::MotifCollection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

pub const DEFAULT_CLUSTERS: usize = 5;
pub const DEFAULT_PSEUDOCOUNT: f64 = 0.1;

/// Settings for a full motifs-to-clusters run
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Number of clusters to cut the tree into
    pub k: usize,
    pub linkage: Linkage,
    pub distance: DistanceOptions,
    /// Added to every probability before comparison
    pub pseudocount: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_CLUSTERS,
            linkage: Linkage::Upgma,
            distance: DistanceOptions::default(),
            pseudocount: DEFAULT_PSEUDOCOUNT,
        }
    }
}

impl ClusterConfig {
    /// Pseudocounts every motif, computes the distance matrix, then builds and
    /// cuts the tree
    pub fn run(&self, motifs: &MotifCollection) -> Result<Partition> {
        let prepared = motifs
            .iter()
            .map(|(id, ppm)| Ok((id.clone(), ppm.with_pseudocount(self.pseudocount)?)))
            .collect::<Result<MotifCollection>>()?;
        self.run_smoothed(&prepared)
    }

    /// Same as [`run`](Self::run) for motifs that already carry the pseudocount,
    /// such as those from [`read_ppm_file_with_pseudocount`](crate::meme::read_ppm_file_with_pseudocount)
    pub fn run_smoothed(&self, motifs: &MotifCollection) -> Result<Partition> {
        if self.pseudocount == 0.0 && self.distance.metric.requires_pseudocount() {
            warn!(
                metric = %self.distance.metric,
                "pseudocount is 0, motifs with zero probabilities will be rejected"
            );
        }
        let matrix = DistanceMatrix::from_motifs(motifs, &self.distance)?;
        info!(
            motifs = matrix.len(),
            k = self.k,
            linkage = %self.linkage,
            "distance matrix ready"
        );
        cluster_matrix(&matrix, self.k, self.linkage)
    }
}

/// Clusters `ids` into `k` groups from a square distance matrix given as rows
///
/// # Arguments
/// * `distance_matrix` - Row `i` holds the distances from `ids[i]` to every identifier
/// * `ids` - Unique motif identifiers, one per row
/// * `k` - Number of clusters wanted, between 1 and `ids.len()`
/// * `linkage` - Rule used when merging clusters
///
/// # Returns
/// * `Result<Partition>` - `k` disjoint groups covering every identifier
///
/// # Errors
/// * `MotifError::EmptyInput` - no identifiers
/// * `MotifError::Validation` - malformed matrix (see [`DistanceMatrix::new`])
/// * `MotifError::InvalidParameter` - `k` outside `[1, n]`
pub fn cluster(
    distance_matrix: &[Vec<f64>],
    ids: &[String],
    k: usize,
    linkage: Linkage,
) -> Result<Partition> {
    let matrix = DistanceMatrix::from_rows(ids.to_vec(), distance_matrix)?;
    cluster_matrix(&matrix, k, linkage)
}

/// Clusters an already validated matrix
pub fn cluster_matrix(matrix: &DistanceMatrix, k: usize, linkage: Linkage) -> Result<Partition> {
    if k == 0 || k > matrix.len() {
        return Err(MotifError::invalid_parameter(
            "k",
            k,
            format!("must be between 1 and the number of motifs ({})", matrix.len()),
        ));
    }
    Dendrogram::build(matrix, linkage)?.cut(k)
}

/// Maps every identifier to the index of the cluster holding it
pub fn cluster_labels(partition: &Partition) -> HashMap<String, usize> {
    partition
        .iter()
        .enumerate()
        .flat_map(|(label, members)| members.iter().map(move |id| (id.clone(), label)))
        .collect()
}
