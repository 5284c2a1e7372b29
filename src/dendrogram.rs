//! Agglomerative merge tree built from a distance matrix, and cutting it into
//! a fixed number of clusters.

use crate::error::{MotifError, Result};
use crate::matrix::DistanceMatrix;
use ndarray::Array2;
use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// A cut of the tree: disjoint clusters of motif identifiers
pub type Partition = Vec<Vec<String>>;

/// Rule for the distance between a freshly merged node and every other node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Linkage {
    #[serde(rename = "single")]
    Single,
    #[serde(rename = "complete")]
    Complete,
    /// Size-weighted average
    #[default]
    #[serde(rename = "UPGMA", alias = "upgma")]
    Upgma,
    /// Unweighted average of the two children
    #[serde(rename = "WPGMA", alias = "wpgma")]
    Wpgma,
}

static LINKAGE_NAMES: phf::Map<&'static str, Linkage> = phf_map! {
    "single" => Linkage::Single,
    "complete" => Linkage::Complete,
    "upgma" => Linkage::Upgma,
    "wpgma" => Linkage::Wpgma,
};

impl Linkage {
    /// Distance from the merge of `left` and `right` to a third node, given
    /// that node's distances to each child and the children's sizes
    pub fn update(&self, d_left: f64, d_right: f64, n_left: usize, n_right: usize) -> f64 {
        match self {
            Linkage::Single => d_left.min(d_right),
            Linkage::Complete => d_left.max(d_right),
            Linkage::Upgma => {
                let (n_left, n_right) = (n_left as f64, n_right as f64);
                (d_left * n_left + d_right * n_right) / (n_left + n_right)
            }
            Linkage::Wpgma => (d_left + d_right) / 2.0,
        }
    }
}

impl FromStr for Linkage {
    type Err = MotifError;

    fn from_str(s: &str) -> Result<Self> {
        LINKAGE_NAMES
            .get(s.to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| {
                MotifError::invalid_parameter(
                    "linkage",
                    s,
                    "expected one of single, complete, UPGMA, WPGMA",
                )
            })
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Linkage::Single => "single",
            Linkage::Complete => "complete",
            Linkage::Upgma => "UPGMA",
            Linkage::Wpgma => "WPGMA",
        };
        f.write_str(name)
    }
}

/// Node of the merge tree. Each internal node owns its two children.
#[derive(Debug, Clone, PartialEq)]
pub enum DendrogramNode {
    Leaf {
        id: String,
    },
    Internal {
        /// Merge round that created this node, starting at 0
        round: usize,
        height: f64,
        size: usize,
        left: Box<DendrogramNode>,
        right: Box<DendrogramNode>,
    },
}

impl DendrogramNode {
    pub fn height(&self) -> f64 {
        match self {
            DendrogramNode::Leaf { .. } => 0.0,
            DendrogramNode::Internal { height, .. } => *height,
        }
    }

    /// Number of leaves under this node
    pub fn size(&self) -> usize {
        match self {
            DendrogramNode::Leaf { .. } => 1,
            DendrogramNode::Internal { size, .. } => *size,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, DendrogramNode::Leaf { .. })
    }

    pub fn children(&self) -> Option<(&DendrogramNode, &DendrogramNode)> {
        match self {
            DendrogramNode::Leaf { .. } => None,
            DendrogramNode::Internal { left, right, .. } => Some((left.as_ref(), right.as_ref())),
        }
    }

    pub fn label(&self) -> String {
        match self {
            DendrogramNode::Leaf { id } => id.clone(),
            DendrogramNode::Internal { round, .. } => format!("inner{}", round),
        }
    }

    /// Leaf identifiers under this node, left to right
    pub fn leaves(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.size());
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves(&self, out: &mut Vec<String>) {
        match self {
            DendrogramNode::Leaf { id } => out.push(id.clone()),
            DendrogramNode::Internal { left, right, .. } => {
                left.collect_leaves(out);
                right.collect_leaves(out);
            }
        }
    }

    /// Every internal node of the subtree, parents before children
    pub fn internal_nodes(&self) -> Vec<&DendrogramNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if let Some((left, right)) = node.children() {
                out.push(node);
                stack.push(right);
                stack.push(left);
            }
        }
        out
    }
}

/// Heights ordered with `total_cmp` so they can key the cut frontier
#[derive(Debug, Clone, Copy)]
struct HeightKey(f64);

impl PartialEq for HeightKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeightKey {}

impl PartialOrd for HeightKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeightKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Complete merge tree over every identifier of a distance matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Dendrogram {
    root: DendrogramNode,
    linkage: Linkage,
}

impl Dendrogram {
    /// Runs the n - 1 merge rounds.
    ///
    /// Each round merges the closest pair of live nodes. Live nodes are kept
    /// in order (surviving input ids first, then merged nodes by creation) and
    /// the first pair found with a strictly smaller distance wins, the earlier
    /// node becoming the left child. The merged node sits at half the pair's
    /// distance. The input matrix is copied and never modified.
    ///
    /// # Arguments
    /// * `matrix` - Validated pairwise distances between the motifs
    /// * `linkage` - Rule giving the distance from a merged node to the others
    ///
    /// # Returns
    /// * `Result<Dendrogram>` - The tree whose root covers every identifier
    ///
    /// # Errors
    /// * `MotifError::EmptyInput` - The matrix has no identifiers
    /// * `MotifError::DataError` - The merge bookkeeping lost a node
    pub fn build(matrix: &DistanceMatrix, linkage: Linkage) -> Result<Self> {
        let n = matrix.len();
        if n == 0 {
            return Err(MotifError::empty_input("no motifs to cluster"));
        }
        let capacity = 2 * n - 1;

        let mut distances = Array2::from_elem((capacity, capacity), f64::INFINITY);
        distances
            .slice_mut(ndarray::s![..n, ..n])
            .assign(&matrix.values());

        let mut slots: Vec<Option<DendrogramNode>> = matrix
            .ids()
            .iter()
            .map(|id| Some(DendrogramNode::Leaf { id: id.clone() }))
            .collect();
        let mut live: Vec<usize> = (0..n).collect();

        for round in 0..n - 1 {
            let mut closest: Option<(usize, usize, f64)> = None;
            for (pos, &a) in live.iter().enumerate() {
                for &b in &live[pos + 1..] {
                    let d = distances[[a, b]];
                    if closest.map_or(true, |(_, _, best)| d < best) {
                        closest = Some((a, b, d));
                    }
                }
            }
            let (a, b, d) = closest
                .ok_or_else(|| MotifError::DataError("no pair left to merge".into()))?;

            let left = take_slot(&mut slots, a)?;
            let right = take_slot(&mut slots, b)?;
            let (n_left, n_right) = (left.size(), right.size());
            let merged = n + round;
            debug!(
                round,
                left = %left.label(),
                right = %right.label(),
                distance = d,
                "merging closest pair"
            );

            live.retain(|&c| c != a && c != b);
            for &c in &live {
                let updated = linkage.update(distances[[c, a]], distances[[c, b]], n_left, n_right);
                distances[[c, merged]] = updated;
                distances[[merged, c]] = updated;
            }
            live.push(merged);

            slots.push(Some(DendrogramNode::Internal {
                round,
                height: d / 2.0,
                size: n_left + n_right,
                left: Box::new(left),
                right: Box::new(right),
            }));
        }

        let root = take_slot(&mut slots, capacity - 1)?;
        Ok(Self { root, linkage })
    }

    pub fn root(&self) -> &DendrogramNode {
        &self.root
    }

    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// Number of original identifiers
    pub fn len(&self) -> usize {
        self.root.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cuts the tree into exactly `k` clusters.
    ///
    /// Starting from the root, the highest node of the frontier is replaced by
    /// its two children `k - 1` times. Nodes sharing a height are split in the
    /// order they joined the frontier; leaves are never split. Clusters come
    /// back in frontier order (highest first) with their leaves left to right.
    ///
    /// # Errors
    /// * `MotifError::InvalidParameter` - `k` is 0 or exceeds the leaf count
    pub fn cut(&self, k: usize) -> Result<Partition> {
        let n = self.len();
        if k == 0 || k > n {
            return Err(MotifError::invalid_parameter(
                "k",
                k,
                format!("must be between 1 and the number of motifs ({})", n),
            ));
        }

        let mut frontier: BTreeMap<HeightKey, VecDeque<&DendrogramNode>> = BTreeMap::new();
        frontier
            .entry(HeightKey(self.root.height()))
            .or_default()
            .push_back(&self.root);

        for _ in 1..k {
            let mut bucket = frontier
                .last_entry()
                .ok_or_else(|| MotifError::DataError("cut frontier is empty".into()))?;
            let pos = bucket
                .get()
                .iter()
                .position(|node| !node.is_leaf())
                .ok_or_else(|| MotifError::DataError("no internal node left to split".into()))?;
            let node = bucket
                .get_mut()
                .remove(pos)
                .ok_or_else(|| MotifError::DataError("cut frontier is inconsistent".into()))?;
            if bucket.get().is_empty() {
                bucket.remove();
            }

            if let Some((left, right)) = node.children() {
                debug!(node = %node.label(), height = node.height(), "splitting");
                for child in [left, right] {
                    frontier
                        .entry(HeightKey(child.height()))
                        .or_default()
                        .push_back(child);
                }
            }
        }

        Ok(frontier
            .values()
            .rev()
            .flat_map(|bucket| bucket.iter())
            .map(|node| node.leaves())
            .collect())
    }
}

fn take_slot(slots: &mut [Option<DendrogramNode>], idx: usize) -> Result<DendrogramNode> {
    slots
        .get_mut(idx)
        .and_then(Option::take)
        .ok_or_else(|| MotifError::DataError(format!("node slot {} already merged", idx)))
}
