use crate::IaMatrix;
use iac_core::{IacError, Result};
use rayon::prelude::*;
use std::any::Any;
use std::ops::Range;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

/// Run `batch` once per trial range on a pool of `workers` threads and sum
/// the per-worker count matrices.
///
/// A worker that returns an error or panics fails the whole run with
/// [`IacError::WorkerFailure`]; partial sums are discarded.
pub fn fan_out<B>(n: usize, batches: &[Range<usize>], workers: usize, batch: B) -> Result<IaMatrix>
where
    B: Fn(usize, Range<usize>) -> Result<IaMatrix> + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("iac-worker-{i}"))
        .build()
        .map_err(|e| IacError::Configuration(format!("cannot start worker pool: {e}")))?;

    let partials: Vec<Result<IaMatrix>> = pool.install(|| {
        batches
            .par_iter()
            .enumerate()
            .map(|(worker, range)| run_worker(worker, range.clone(), &batch))
            .collect()
    });

    let mut total = IaMatrix::zeros(n, n);
    for partial in partials {
        let counts = partial?;
        if counts.shape() != (n, n) {
            return Err(IacError::DegenerateInput(format!(
                "worker matrix is {:?}, expected ({n}, {n})",
                counts.shape()
            )));
        }
        total += counts;
    }
    debug!(workers = batches.len(), "worker matrices merged");
    Ok(total)
}

fn run_worker<B>(worker: usize, range: Range<usize>, batch: &B) -> Result<IaMatrix>
where
    B: Fn(usize, Range<usize>) -> Result<IaMatrix> + Sync,
{
    match catch_unwind(AssertUnwindSafe(|| batch(worker, range))) {
        Ok(Ok(counts)) => Ok(counts),
        Ok(Err(err)) => {
            warn!(worker, error = %err, "worker failed");
            Err(IacError::worker(worker, err))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(worker, %message, "worker panicked");
            Err(IacError::worker_panic(worker, message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sums_partials() {
        let batches = vec![0..2, 2..5];
        let total = fan_out(2, &batches, 2, |_, range| {
            Ok(IaMatrix::from_element(2, 2, range.len() as f64))
        })
        .unwrap();
        assert_eq!(total, IaMatrix::from_element(2, 2, 5.0));
    }

    #[test]
    fn test_error_names_worker() {
        let batches = vec![0..1, 1..2, 2..3];
        let err = fan_out(1, &batches, 3, |worker, _| {
            if worker == 1 {
                Err(IacError::PolicyViolation("bad".into()))
            } else {
                Ok(IaMatrix::zeros(1, 1))
            }
        })
        .unwrap_err();
        assert!(matches!(err, IacError::WorkerFailure { worker: 1, .. }));
        assert!(err.is_policy_violation());
    }

    #[test]
    fn test_panic_becomes_worker_failure() {
        let batches = vec![0..4];
        let err = fan_out(1, &batches, 1, |_, _| -> Result<IaMatrix> { panic!("lost") }).unwrap_err();
        match err {
            IacError::WorkerFailure { worker, reason, cause } => {
                assert_eq!(worker, 0);
                assert!(reason.contains("lost"));
                assert!(cause.is_none());
            }
            other => panic!("unexpected error {other}"),
        }
    }
}
