use iac_core::{IacError, Result, F};
use nalgebra::DMatrix;
use tracing::{debug, warn};

/// Row-wise z-score of the off-diagonal entries.
///
/// Each row is standardized with the mean and population standard deviation
/// of its `n - 1` off-diagonal entries. The diagonal is zero on output. A row
/// is flat when its off-diagonal entries are all exactly equal, or when their
/// squared deviations underflow to a zero variance; it uses a deviation of
/// one and comes out as zeros. Any other row is scaled by its own deviation,
/// however small. Matrices with `n <= 1` map to a zero matrix.
pub fn normalize_offdiag(ia: &DMatrix<F>) -> Result<DMatrix<F>> {
    let (n, cols) = ia.shape();
    if n != cols {
        return Err(IacError::DegenerateInput(format!(
            "cannot normalize a {n}x{cols} matrix"
        )));
    }
    if n <= 1 {
        warn!(n, "matrix too small for off-diagonal statistics, returning zeros");
        return Ok(DMatrix::zeros(n, n));
    }

    let m = (n - 1) as F;
    let mut out = DMatrix::zeros(n, n);
    let mut flat_rows = 0usize;

    for i in 0..n {
        let off = || (0..n).filter(move |&j| j != i).map(move |j| ia[(i, j)]);
        let first = ia[(i, if i == 0 { 1 } else { 0 })];
        let mean = off().sum::<F>() / m;
        let var = off().map(|x| (x - mean).powi(2)).sum::<F>() / m;
        let sigma = var.sqrt();
        if off().all(|x| x == first) || sigma <= 0.0 {
            flat_rows += 1;
            continue;
        }
        for j in (0..n).filter(|&j| j != i) {
            out[(i, j)] = (ia[(i, j)] - mean) / sigma;
        }
    }

    if flat_rows > 0 {
        warn!(rows = flat_rows, "zero-variance rows left unscaled");
    }
    debug!(n, "off-diagonal normalization done");
    Ok(out)
}
