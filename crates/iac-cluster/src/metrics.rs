//! Agreement between two labelings and cluster cohesion.

use crate::kmeans::squared_distance;
use crate::partition::check_finite;
use iac_core::{IacError, Result, F};
use nalgebra::DMatrix;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Joint counts of two labelings of the same nodes.
struct Contingency {
    n: F,
    cells: Vec<F>,
    rows: Vec<F>,
    cols: Vec<F>,
}

impl Contingency {
    fn new(a: &[usize], b: &[usize]) -> Result<Self> {
        if a.len() != b.len() {
            return Err(IacError::DegenerateInput(format!(
                "labelings cover {} and {} nodes",
                a.len(),
                b.len()
            )));
        }
        let ra = dense(a);
        let rb = dense(b);
        let ka = ra.iter().max().map_or(0, |m| m + 1);
        let kb = rb.iter().max().map_or(0, |m| m + 1);

        let mut cells = vec![0.0; ka * kb];
        let mut rows = vec![0.0; ka];
        let mut cols = vec![0.0; kb];
        for (&i, &j) in ra.iter().zip(&rb) {
            cells[i * kb + j] += 1.0;
            rows[i] += 1.0;
            cols[j] += 1.0;
        }
        Ok(Self {
            n: a.len() as F,
            cells,
            rows,
            cols,
        })
    }
}

fn dense(labels: &[usize]) -> Vec<usize> {
    let mut index = BTreeMap::new();
    for &l in labels {
        let next = index.len();
        index.entry(l).or_insert(next);
    }
    labels.iter().map(|l| index[l]).collect()
}

fn pairs(x: F) -> F {
    x * (x - 1.0) / 2.0
}

/// Adjusted Rand index. 1 for identical partitions, about 0 for independent
/// ones. Two trivial labelings (one cluster each, or all singletons each)
/// score 1.
pub fn adjusted_rand_index(a: &[usize], b: &[usize]) -> Result<F> {
    let t = Contingency::new(a, b)?;
    if t.n < 2.0 {
        return Ok(1.0);
    }
    let index: F = t.cells.iter().map(|&c| pairs(c)).sum();
    let sum_a: F = t.rows.iter().map(|&c| pairs(c)).sum();
    let sum_b: F = t.cols.iter().map(|&c| pairs(c)).sum();
    let expected = sum_a * sum_b / pairs(t.n);
    let max = (sum_a + sum_b) / 2.0;
    if (max - expected).abs() < F::EPSILON {
        return Ok(1.0);
    }
    Ok((index - expected) / (max - expected))
}

/// Mutual information normalized by the arithmetic mean of the two
/// entropies.
pub fn normalized_mutual_info(a: &[usize], b: &[usize]) -> Result<F> {
    let t = Contingency::new(a, b)?;
    if t.rows.len() <= 1 && t.cols.len() <= 1 {
        return Ok(1.0);
    }

    let kb = t.cols.len();
    let mut mi = 0.0;
    for (i, &ri) in t.rows.iter().enumerate() {
        for (j, &cj) in t.cols.iter().enumerate() {
            let nij = t.cells[i * kb + j];
            if nij > 0.0 {
                mi += nij / t.n * (t.n * nij / (ri * cj)).ln();
            }
        }
    }

    let h = |counts: &[F]| -> F {
        counts
            .iter()
            .filter(|&&c| c > 0.0)
            .map(|&c| {
                let p = c / t.n;
                -p * p.ln()
            })
            .sum()
    };
    let denom = (h(&t.rows) + h(&t.cols)) / 2.0;
    if denom <= 0.0 {
        return Ok(0.0);
    }
    Ok((mi.max(0.0) / denom).min(1.0))
}

/// Mean silhouette coefficient over the rows of `data` (Euclidean).
///
/// Requires between 2 and `n - 1` distinct labels. Rows alone in their
/// cluster contribute zero.
pub fn silhouette_score(data: &DMatrix<F>, labels: &[usize]) -> Result<F> {
    let n = data.nrows();
    if labels.len() != n {
        return Err(IacError::DegenerateInput(format!(
            "{} labels for {n} rows",
            labels.len()
        )));
    }
    check_finite(data)?;

    let dense = dense(labels);
    let k = dense.iter().max().map_or(0, |m| m + 1);
    if k < 2 || k >= n {
        return Err(IacError::DegenerateInput(format!(
            "silhouette needs 2..={} clusters, got {k}",
            n.saturating_sub(1)
        )));
    }

    let points: Vec<Vec<F>> = data.row_iter().map(|r| r.iter().copied().collect()).collect();
    let mut sizes = vec![0usize; k];
    for &c in &dense {
        sizes[c] += 1;
    }

    let total: F = (0..n)
        .into_par_iter()
        .map(|i| {
            let own = dense[i];
            if sizes[own] == 1 {
                return 0.0;
            }
            let mut sums = vec![0.0; k];
            for (j, p) in points.iter().enumerate() {
                if j != i {
                    sums[dense[j]] += squared_distance(&points[i], p).sqrt();
                }
            }
            let a = sums[own] / (sizes[own] - 1) as F;
            let b = (0..k)
                .filter(|&c| c != own)
                .map(|c| sums[c] / sizes[c] as F)
                .fold(F::INFINITY, F::min);
            let scale = a.max(b);
            if scale > 0.0 {
                (b - a) / scale
            } else {
                0.0
            }
        })
        .sum();

    Ok(total / n as F)
}
