//! Scans over `k` for picking the cluster count.

use crate::kmeans::KMeans;
use crate::metrics::silhouette_score;
use iac_core::{IacError, Result, F};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KScore {
    pub k: usize,
    pub score: F,
}

/// k-means inertia divided by the row count for each `k` in `1..=k_max`.
pub fn elbow_curve(data: &DMatrix<F>, k_max: usize, kmeans: &KMeans) -> Result<Vec<KScore>> {
    let n = data.nrows();
    if k_max == 0 || k_max > n {
        return Err(IacError::Configuration(format!(
            "elbow scan needs 1 <= k_max <= {n}, got {k_max}"
        )));
    }
    (1..=k_max)
        .map(|k| {
            let fit = kmeans.fit(data, k)?;
            debug!(k, inertia = fit.inertia, "elbow point");
            Ok(KScore {
                k,
                score: fit.inertia / n as F,
            })
        })
        .collect()
}

/// Mean silhouette of the k-means labels for each `k` in `2..=k_max`.
pub fn silhouette_curve(data: &DMatrix<F>, k_max: usize, kmeans: &KMeans) -> Result<Vec<KScore>> {
    let n = data.nrows();
    if k_max < 2 || k_max >= n {
        return Err(IacError::Configuration(format!(
            "silhouette scan needs 2 <= k_max < {n}, got {k_max}"
        )));
    }
    (2..=k_max)
        .map(|k| {
            let fit = kmeans.fit(data, k)?;
            let score = silhouette_score(data, &fit.labels)?;
            debug!(k, score, "silhouette point");
            Ok(KScore { k, score })
        })
        .collect()
}

/// The `k` with the highest silhouette, lowest `k` on ties.
pub fn best_by_silhouette(curve: &[KScore]) -> Option<usize> {
    curve
        .iter()
        .max_by(|a, b| a.score.total_cmp(&b.score).then(b.k.cmp(&a.k)))
        .map(|s| s.k)
}
