//! Seeded Lloyd k-means with k-means++ initialization.
//!
//! Restarts run in parallel, each on its own ChaCha stream derived from the
//! run seed and the restart index, and the lowest-inertia fit wins (lowest
//! restart index on ties), so results are reproducible for a fixed seed.

use crate::partition::{check_partition_input, Partitioner};
use iac_core::{IacError, Result, F};
use nalgebra::DMatrix;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansConfig {
    pub max_iter: usize,
    /// Convergence tolerance relative to the mean per-column variance.
    pub tol: F,
    pub n_init: usize,
    pub seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            max_iter: 300,
            tol: 1e-4,
            n_init: 4,
            seed: 1,
        }
    }
}

/// Outcome of one k-means fit.
#[derive(Clone, Debug)]
pub struct KMeansFit {
    pub labels: Vec<usize>,
    /// `k x d`, one centroid per row.
    pub centroids: DMatrix<F>,
    /// Sum of squared distances from each row to its centroid.
    pub inertia: F,
    pub iterations: usize,
}

#[derive(Clone, Debug, Default)]
pub struct KMeans {
    config: KMeansConfig,
}

impl KMeans {
    pub fn new(config: KMeansConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }

    /// Fit with the configured seed.
    pub fn fit(&self, data: &DMatrix<F>, k: usize) -> Result<KMeansFit> {
        self.fit_seeded(data, k, self.config.seed)
    }

    pub fn fit_seeded(&self, data: &DMatrix<F>, k: usize, seed: u64) -> Result<KMeansFit> {
        check_partition_input(data, k)?;
        if self.config.n_init == 0 || self.config.max_iter == 0 {
            return Err(IacError::Configuration(
                "k-means needs at least one restart and one iteration".into(),
            ));
        }

        let points = rows(data);
        let tol = self.config.tol * mean_column_variance(&points);

        let best = (0..self.config.n_init)
            .into_par_iter()
            .map(|restart| {
                let stream = seed.wrapping_add((restart as u64).wrapping_mul(0x9e3779b97f4a7c15));
                let mut rng = ChaCha20Rng::seed_from_u64(stream);
                lloyd(&points, k, self.config.max_iter, tol, &mut rng)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .enumerate()
            .min_by(|(ia, a), (ib, b)| a.inertia.total_cmp(&b.inertia).then(ia.cmp(ib)))
            .map(|(_, fit)| fit)
            .ok_or_else(|| IacError::Configuration("k-means produced no fit".into()))?;

        debug!(
            k,
            inertia = best.inertia,
            iterations = best.iterations,
            "k-means fit selected"
        );

        let dim = data.ncols();
        let centroids = DMatrix::from_fn(k, dim, |c, d| best.centroids[c][d]);
        Ok(KMeansFit {
            labels: best.labels,
            centroids,
            inertia: best.inertia,
            iterations: best.iterations,
        })
    }
}

impl Partitioner for KMeans {
    fn partition(&self, matrix: &DMatrix<F>, k: usize, seed: u64) -> Result<Vec<usize>> {
        Ok(self.fit_seeded(matrix, k, seed)?.labels)
    }
}

struct Fit {
    labels: Vec<usize>,
    centroids: Vec<Vec<F>>,
    inertia: F,
    iterations: usize,
}

fn rows(data: &DMatrix<F>) -> Vec<Vec<F>> {
    data.row_iter().map(|r| r.iter().copied().collect()).collect()
}

pub(crate) fn squared_distance(a: &[F], b: &[F]) -> F {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn mean_column_variance(points: &[Vec<F>]) -> F {
    let n = points.len() as F;
    let dim = points.first().map_or(0, Vec::len);
    if dim == 0 {
        return 0.0;
    }
    let total: F = (0..dim)
        .map(|d| {
            let mean = points.iter().map(|p| p[d]).sum::<F>() / n;
            points.iter().map(|p| (p[d] - mean).powi(2)).sum::<F>() / n
        })
        .sum();
    total / dim as F
}

fn nearest(point: &[F], centroids: &[Vec<F>]) -> (usize, F) {
    let mut best = (0, F::INFINITY);
    for (c, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(point, centroid);
        if d < best.1 {
            best = (c, d);
        }
    }
    best
}

/// k-means++ seeding: first centre uniform, then proportional to squared
/// distance from the nearest chosen centre.
fn plus_plus<R: Rng + ?Sized>(points: &[Vec<F>], k: usize, rng: &mut R) -> Vec<Vec<F>> {
    let n = points.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..n)].clone());

    let mut min_dist: Vec<F> = points
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: F = min_dist.iter().sum();
        let next = if total > 0.0 {
            let target = rng.gen::<F>() * total;
            let mut acc = 0.0;
            min_dist
                .iter()
                .position(|&d| {
                    acc += d;
                    acc > target
                })
                .unwrap_or(n - 1)
        } else {
            // every point sits on a chosen centre
            rng.gen_range(0..n)
        };

        let centre = points[next].clone();
        for (d, p) in min_dist.iter_mut().zip(points) {
            *d = d.min(squared_distance(p, &centre));
        }
        centroids.push(centre);
    }
    centroids
}

fn lloyd<R: Rng + ?Sized>(points: &[Vec<F>], k: usize, max_iter: usize, tol: F, rng: &mut R) -> Fit {
    let n = points.len();
    let dim = points[0].len();
    let mut centroids = plus_plus(points, k, rng);
    let mut labels = vec![0; n];
    let mut iterations = 0;

    for iter in 1..=max_iter {
        iterations = iter;
        let mut dists = vec![0.0; n];
        for (i, p) in points.iter().enumerate() {
            let (c, d) = nearest(p, &centroids);
            labels[i] = c;
            dists[i] = d;
        }

        let mut sums = vec![vec![0.0; dim]; k];
        let mut counts = vec![0usize; k];
        for (p, &c) in points.iter().zip(&labels) {
            counts[c] += 1;
            for (s, x) in sums[c].iter_mut().zip(p) {
                *s += x;
            }
        }

        // An empty cluster takes the point farthest from its current centre.
        for c in 0..k {
            if counts[c] > 0 {
                continue;
            }
            let far = (0..n)
                .filter(|&i| counts[labels[i]] > 1)
                .max_by(|&a, &b| dists[a].total_cmp(&dists[b]).then(b.cmp(&a)));
            if let Some(i) = far {
                let old = labels[i];
                counts[old] -= 1;
                for (s, x) in sums[old].iter_mut().zip(&points[i]) {
                    *s -= x;
                }
                labels[i] = c;
                counts[c] = 1;
                sums[c] = points[i].clone();
                dists[i] = 0.0;
            }
        }

        let mut shift = 0.0;
        for c in 0..k {
            if counts[c] == 0 {
                continue;
            }
            let updated: Vec<F> = sums[c].iter().map(|s| s / counts[c] as F).collect();
            shift += squared_distance(&updated, &centroids[c]);
            centroids[c] = updated;
        }

        if shift <= tol {
            break;
        }
    }

    // Final assignment against the settled centres.
    let mut inertia = 0.0;
    for (i, p) in points.iter().enumerate() {
        let (c, d) = nearest(p, &centroids);
        labels[i] = c;
        inertia += d;
    }

    Fit {
        labels,
        centroids,
        inertia,
        iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> DMatrix<F> {
        DMatrix::from_row_slice(
            6,
            2,
            &[
                0.0, 0.0, 0.1, 0.0, 0.0, 0.1, //
                5.0, 5.0, 5.1, 5.0, 5.0, 5.1,
            ],
        )
    }

    #[test]
    fn test_separates_blobs() {
        let fit = KMeans::default().fit(&blobs(), 2).unwrap();
        assert_eq!(fit.labels[0], fit.labels[1]);
        assert_eq!(fit.labels[1], fit.labels[2]);
        assert_eq!(fit.labels[3], fit.labels[4]);
        assert_eq!(fit.labels[4], fit.labels[5]);
        assert_ne!(fit.labels[0], fit.labels[3]);
        assert!(fit.inertia < 0.1);
        assert_eq!(fit.centroids.shape(), (2, 2));
    }

    #[test]
    fn test_deterministic_for_seed() {
        let km = KMeans::default();
        let data = DMatrix::from_fn(20, 3, |i, j| ((i * 13 + j * 7) % 11) as F);
        let a = km.fit_seeded(&data, 4, 99).unwrap();
        let b = km.fit_seeded(&data, 4, 99).unwrap();
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.inertia, b.inertia);
    }

    #[test]
    fn test_k_equals_n_gives_zero_inertia() {
        let fit = KMeans::default().fit(&blobs(), 6).unwrap();
        assert!(fit.inertia.abs() < 1e-12);
        let mut labels = fit.labels.clone();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), 6);
    }

    #[test]
    fn test_identical_points() {
        let data = DMatrix::from_element(4, 2, 1.0);
        let fit = KMeans::default().fit(&data, 2).unwrap();
        assert_eq!(fit.labels.len(), 4);
        assert_eq!(fit.inertia, 0.0);
    }

    #[test]
    fn test_rejects_bad_config() {
        let km = KMeans::new(KMeansConfig {
            n_init: 0,
            ..KMeansConfig::default()
        });
        assert!(km.fit(&blobs(), 2).is_err());
    }
}
