use iac_core::{Cascade, ConsensusCounter, IacError, NodeId, Result, TrialRng, F};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

mod parallel;

pub use parallel::fan_out;

/// `IA[(i, j)]`: probability that seeding `j` activates `i`.
pub type IaMatrix = DMatrix<F>;

/// Trial-level configuration for one accumulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrialSpec {
    pub trials: usize,
    pub workers: usize,
    pub seed: u64,
}

/// Result of an accumulation run.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub ia: IaMatrix,
    pub trials: usize,
    pub elapsed: Duration,
    /// Wall-clock elapsed divided by the trial count.
    pub time_per_trial: F,
}

/// Runs trials of one cascade and accumulates seed -> activated counts.
pub struct Accumulator<C: Cascade> {
    cascade: C,
}

/// Runs trials over several layers sharing one node set and counts a node
/// as activated when enough layers agree.
pub struct MultiLayerAccumulator<C: Cascade> {
    layers: Vec<C>,
    threshold: F,
}

impl TrialSpec {
    pub fn new(trials: usize, workers: usize, seed: u64) -> Self {
        Self { trials, workers, seed }
    }

    pub fn validate(&self) -> Result<()> {
        if self.trials == 0 {
            return Err(IacError::Configuration("trial count must be positive".into()));
        }
        if self.workers == 0 {
            return Err(IacError::Configuration("worker count must be positive".into()));
        }
        Ok(())
    }

    /// Contiguous trial ranges, one per worker. The first `trials % workers`
    /// workers take one extra trial; no range is empty.
    pub fn batches(&self) -> Vec<Range<usize>> {
        let workers = self.workers.min(self.trials).max(1);
        let base = self.trials / workers;
        let extra = self.trials % workers;

        let mut start = 0;
        (0..workers)
            .map(|w| {
                let len = base + usize::from(w < extra);
                let range = start..start + len;
                start += len;
                range
            })
            .filter(|r| !r.is_empty())
            .collect()
    }
}

impl Default for TrialSpec {
    fn default() -> Self {
        Self {
            trials: 10_000,
            workers: 8,
            seed: 42,
        }
    }
}

impl RunOutcome {
    fn finish(mut counts: IaMatrix, trials: usize, elapsed: Duration) -> Self {
        counts /= trials as F;
        Self {
            ia: counts,
            trials,
            elapsed,
            time_per_trial: elapsed.as_secs_f64() / trials as F,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.ia.nrows()
    }
}

impl<C: Cascade> Accumulator<C> {
    pub fn new(cascade: C) -> Self {
        Self { cascade }
    }

    pub fn cascade(&self) -> &C {
        &self.cascade
    }

    /// Run `spec.trials` trials split evenly over `spec.workers` workers.
    pub fn run(&self, spec: &TrialSpec) -> Result<RunOutcome> {
        spec.validate()?;
        self.run_batches(&spec.batches(), spec.workers, spec.seed)
    }

    /// Run the given trial ranges, one worker task per range.
    ///
    /// Trial `t` always draws from `TrialRng::from_trial_id(seed, t)`, so the
    /// result does not depend on how trials are split.
    pub fn run_batches(&self, batches: &[Range<usize>], workers: usize, seed: u64) -> Result<RunOutcome> {
        let trials = total_trials(batches)?;
        let n = self.cascade.num_nodes();
        if n == 0 {
            warn!("empty graph, returning empty information-access matrix");
        }
        info!(nodes = n, trials, workers = batches.len(), "single-layer run started");

        let start = Instant::now();
        let counts = fan_out(n, batches, workers, |worker, range| {
            self.run_batch(worker, range, seed)
        })?;
        let outcome = RunOutcome::finish(counts, trials, start.elapsed());

        info!(
            trials,
            time_per_trial = outcome.time_per_trial,
            "single-layer run finished"
        );
        Ok(outcome)
    }

    fn run_batch(&self, worker: usize, range: Range<usize>, seed: u64) -> Result<IaMatrix> {
        let n = self.cascade.num_nodes();
        let mut counts = IaMatrix::zeros(n, n);
        let mut trial = self.cascade.new_trial();
        debug!(worker, first = range.start, last = range.end, "worker batch started");

        for t in range {
            let mut rng = TrialRng::from_trial_id(seed, t as u64);
            self.cascade.realize(&mut trial, &mut rng)?;
            for s in 0..n {
                for &r in self.cascade.activated(&mut trial, s) {
                    counts[(r, s)] += 1.0;
                }
            }
        }

        Ok(counts)
    }
}

impl<C: Cascade> MultiLayerAccumulator<C> {
    /// Layers must be non-empty and agree on the node count; `threshold`
    /// must lie in `[0, 1]`.
    pub fn new(layers: Vec<C>, threshold: F) -> Result<Self> {
        let Some(first) = layers.first() else {
            return Err(IacError::Configuration("multi-layer run needs at least one layer".into()));
        };
        let n = first.num_nodes();
        if let Some((i, layer)) = layers.iter().enumerate().find(|(_, l)| l.num_nodes() != n) {
            return Err(IacError::Configuration(format!(
                "layer {i} has {} nodes, layer 0 has {n}",
                layer.num_nodes()
            )));
        }
        if !(0.0..=1.0).contains(&threshold) {
            return Err(IacError::Configuration(format!(
                "consensus threshold {threshold} outside [0, 1]"
            )));
        }
        Ok(Self { layers, threshold })
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn threshold(&self) -> F {
        self.threshold
    }

    pub fn layers(&self) -> &[C] {
        &self.layers
    }

    pub fn run(&self, spec: &TrialSpec) -> Result<RunOutcome> {
        spec.validate()?;
        self.run_batches(&spec.batches(), spec.workers, spec.seed)
    }

    /// See [`Accumulator::run_batches`]; layers are realized in order from
    /// the same per-trial stream.
    pub fn run_batches(&self, batches: &[Range<usize>], workers: usize, seed: u64) -> Result<RunOutcome> {
        let trials = total_trials(batches)?;
        let n = self.layers[0].num_nodes();
        if n == 0 {
            warn!("empty layers, returning empty information-access matrix");
        }
        info!(
            nodes = n,
            layers = self.layers.len(),
            threshold = self.threshold,
            trials,
            "multi-layer run started"
        );

        let start = Instant::now();
        let counts = fan_out(n, batches, workers, |worker, range| {
            self.run_batch(worker, range, seed)
        })?;
        let outcome = RunOutcome::finish(counts, trials, start.elapsed());

        info!(
            trials,
            time_per_trial = outcome.time_per_trial,
            "multi-layer run finished"
        );
        Ok(outcome)
    }

    fn run_batch(&self, worker: usize, range: Range<usize>, seed: u64) -> Result<IaMatrix> {
        let n = self.layers[0].num_nodes();
        let mut counts = IaMatrix::zeros(n, n);
        let mut trials: Vec<C::Trial> = self.layers.iter().map(Cascade::new_trial).collect();
        let mut counter = ConsensusCounter::new(n);
        debug!(worker, first = range.start, last = range.end, "worker batch started");

        for t in range {
            let mut rng = TrialRng::from_trial_id(seed, t as u64);
            for (layer, trial) in self.layers.iter().zip(trials.iter_mut()) {
                layer.realize(trial, &mut rng)?;
            }
            for s in 0..n {
                self.count_seed(s, &mut trials, &mut counter, &mut counts);
            }
        }

        Ok(counts)
    }

    fn count_seed(
        &self,
        seed: NodeId,
        trials: &mut [C::Trial],
        counter: &mut ConsensusCounter,
        counts: &mut IaMatrix,
    ) {
        for (layer, trial) in self.layers.iter().zip(trials.iter_mut()) {
            counter.add(layer.activated(trial, seed));
        }
        counter.drain_accepted(self.layers.len(), self.threshold, |i| {
            counts[(i, seed)] += 1.0;
        });
    }
}

fn total_trials(batches: &[Range<usize>]) -> Result<usize> {
    let trials: usize = batches.iter().map(ExactSizeIterator::len).sum();
    if trials == 0 {
        return Err(IacError::Configuration("trial count must be positive".into()));
    }
    Ok(trials)
}
