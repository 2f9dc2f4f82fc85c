//! From an information-access matrix to node clusters.
//!
//! [`cluster`] runs the two steps in order: [`normalize_offdiag`] standardizes
//! each row's off-diagonal profile, then a [`Partitioner`] groups the rows.

use iac_core::{IacError, Result, F};
use nalgebra::DMatrix;
use tracing::{info, warn};

mod assignment;
mod kmeans;
mod metrics;
mod normalize;
mod partition;
mod select;

pub use assignment::ClusterAssignment;
pub use kmeans::{KMeans, KMeansConfig, KMeansFit};
pub use metrics::{adjusted_rand_index, normalized_mutual_info, silhouette_score};
pub use normalize::normalize_offdiag;
pub use partition::{check_finite, check_partition_input, Partitioner};
pub use select::{best_by_silhouette, elbow_curve, silhouette_curve, KScore};

/// Normalize `ia` and split its nodes into `k` clusters.
///
/// An empty matrix yields an empty assignment for any `k`.
pub fn cluster<P: Partitioner + ?Sized>(
    ia: &DMatrix<F>,
    k: usize,
    partitioner: &P,
    seed: u64,
) -> Result<ClusterAssignment> {
    let n = ia.nrows();
    if n == 0 {
        warn!("no nodes to cluster");
        return Ok(ClusterAssignment::default());
    }
    check_partition_input(ia, k)?;

    let normalized = normalize_offdiag(ia)?;
    let labels = partitioner.partition(&normalized, k, seed)?;
    if labels.len() != n {
        return Err(IacError::DegenerateInput(format!(
            "partitioner returned {} labels for {n} nodes",
            labels.len()
        )));
    }

    let assignment = ClusterAssignment::from_labels(&labels);
    info!(
        nodes = n,
        requested = k,
        clusters = assignment.num_clusters(),
        "nodes clustered"
    );
    Ok(assignment)
}
