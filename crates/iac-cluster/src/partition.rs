use iac_core::{IacError, Result, F};
use nalgebra::DMatrix;

/// Splits the rows of a matrix into `k` groups.
///
/// Implementations must be deterministic for a fixed `seed` and return one
/// label per row. Label values need not be contiguous; callers re-index them
/// through [`crate::ClusterAssignment::from_labels`].
pub trait Partitioner: Send + Sync {
    fn partition(&self, matrix: &DMatrix<F>, k: usize, seed: u64) -> Result<Vec<usize>>;
}

/// Shared argument checks for partitioners: `1 <= k <= n` and every entry
/// finite.
pub fn check_partition_input(matrix: &DMatrix<F>, k: usize) -> Result<()> {
    let n = matrix.nrows();
    if k == 0 {
        return Err(IacError::Configuration("cluster count must be positive".into()));
    }
    if k > n {
        return Err(IacError::Configuration(format!(
            "cannot form {k} clusters from {n} nodes"
        )));
    }
    check_finite(matrix)
}

pub fn check_finite(matrix: &DMatrix<F>) -> Result<()> {
    for col in 0..matrix.ncols() {
        for row in 0..matrix.nrows() {
            if !matrix[(row, col)].is_finite() {
                return Err(IacError::NonFinite { row, col });
            }
        }
    }
    Ok(())
}
