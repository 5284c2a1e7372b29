//! Alignment-based distances between DNA motifs and agglomerative clustering of motif sets

pub mod alignment;
pub mod cluster;
pub mod column;
pub mod dendrogram;
pub mod error;
pub mod matrix;
pub mod meme;
pub mod types;

pub use alignment::{motif_distance, AlignmentMode, AlignmentResult, Aggregator, DistanceOptions};
pub use cluster::{cluster, cluster_labels, cluster_matrix, ClusterConfig};
pub use column::ColumnMetric;
pub use dendrogram::{Dendrogram, DendrogramNode, Linkage, Partition};
pub use error::{MotifError, Result};
pub use matrix::DistanceMatrix;
pub use types::{MotifCollection, Ppm, ProbabilityVector};
