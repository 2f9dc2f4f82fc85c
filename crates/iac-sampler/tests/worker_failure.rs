use iac_core::{Cascade, Edge, Graph, IacError, LiveEdgeGraph, NodeId, Reachability, Result, TrialRng};
use iac_sampler::{Accumulator, MultiLayerAccumulator, TrialSpec};

/// Live-edge cascade that skips the activation check, so an overweight
/// graph only fails once a worker samples it.
struct Unchecked(Graph);

impl Cascade for Unchecked {
    type Trial = (LiveEdgeGraph, Reachability);

    fn num_nodes(&self) -> usize {
        self.0.num_nodes()
    }

    fn new_trial(&self) -> Self::Trial {
        (LiveEdgeGraph::default(), Reachability::new(self.0.num_nodes()))
    }

    fn realize(&self, trial: &mut Self::Trial, rng: &mut TrialRng) -> Result<()> {
        trial.0.resample(&self.0, rng)
    }

    fn activated<'t>(&self, trial: &'t mut Self::Trial, seed: NodeId) -> &'t [NodeId] {
        trial.1.reachable(&trial.0, seed)
    }
}

/// Panics on one chosen trial index.
struct Fragile {
    n: usize,
    bad_trial: u64,
}

impl Cascade for Fragile {
    type Trial = (u64, Vec<NodeId>);

    fn num_nodes(&self) -> usize {
        self.n
    }

    fn new_trial(&self) -> Self::Trial {
        (0, Vec::new())
    }

    fn realize(&self, trial: &mut Self::Trial, _rng: &mut TrialRng) -> Result<()> {
        if trial.0 == self.bad_trial {
            panic!("trial {} exploded", trial.0);
        }
        trial.0 += 1;
        Ok(())
    }

    fn activated<'t>(&self, trial: &'t mut Self::Trial, seed: NodeId) -> &'t [NodeId] {
        trial.1.clear();
        trial.1.push(seed);
        &trial.1
    }
}

fn overweight() -> Graph {
    Graph::new(3, vec![Edge::new(0, 2, 0.7), Edge::new(1, 2, 0.7)]).unwrap()
}

#[test]
fn test_sampling_violation_fails_run() {
    let err = Accumulator::new(Unchecked(overweight()))
        .run(&TrialSpec::new(100, 4, 1))
        .unwrap_err();
    assert!(matches!(err, IacError::WorkerFailure { .. }));
    assert!(err.is_policy_violation());
}

#[test]
fn test_multilayer_violation_fails_run() {
    let ok = Graph::new(3, vec![Edge::new(0, 1, 0.5)]).unwrap();
    let acc = MultiLayerAccumulator::new(vec![Unchecked(ok), Unchecked(overweight())], 0.5).unwrap();
    let err = acc.run(&TrialSpec::new(40, 2, 1)).unwrap_err();
    assert!(err.is_policy_violation());
}

#[test]
fn test_panicking_worker_fails_run() {
    // Every worker counts its own trials from zero, so the second trial of
    // any batch of two or more panics.
    let err = Accumulator::new(Fragile { n: 2, bad_trial: 1 })
        .run(&TrialSpec::new(20, 2, 0))
        .unwrap_err();
    match err {
        IacError::WorkerFailure { reason, .. } => assert!(reason.contains("exploded")),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_healthy_run_is_unaffected() {
    let outcome = Accumulator::new(Fragile { n: 2, bad_trial: u64::MAX })
        .run(&TrialSpec::new(20, 2, 0))
        .unwrap();
    assert_eq!(outcome.ia[(0, 0)], 1.0);
    assert_eq!(outcome.ia[(1, 0)], 0.0);
}
