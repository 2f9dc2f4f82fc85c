use iac_core::{Edge, Graph};
use iac_models::{LiveEdgeModel, ThresholdModel};
use iac_sampler::{Accumulator, IaMatrix, TrialSpec};
use proptest::prelude::*;

fn diamond() -> Graph {
    Graph::new(
        5,
        vec![
            Edge::new(0, 1, 0.6),
            Edge::new(0, 2, 0.3),
            Edge::new(1, 3, 0.5),
            Edge::new(2, 3, 0.4),
            Edge::new(3, 4, 0.9),
            Edge::new(4, 0, 0.2),
        ],
    )
    .unwrap()
}

fn run_live(trials: usize, workers: usize, seed: u64) -> IaMatrix {
    let model = LiveEdgeModel::new(diamond()).unwrap();
    Accumulator::new(model)
        .run(&TrialSpec::new(trials, workers, seed))
        .unwrap()
        .ia
}

#[test]
fn test_worker_split_does_not_change_result() {
    let one = run_live(1_000, 1, 42);
    let four = run_live(1_000, 4, 42);
    let seven = run_live(1_000, 7, 42);
    assert_eq!(one, four);
    assert_eq!(one, seven);
}

#[test]
fn test_explicit_uneven_batches() {
    let acc = Accumulator::new(LiveEdgeModel::new(diamond()).unwrap());
    let even = acc.run_batches(&[0..500, 500..1_000], 2, 3).unwrap();
    let uneven = acc.run_batches(&[0..1, 1..990, 990..1_000], 3, 3).unwrap();
    assert_eq!(even.ia, uneven.ia);
}

#[test]
fn test_threshold_backend_split_invariant() {
    let acc = Accumulator::new(ThresholdModel::new(diamond()));
    let a = acc.run(&TrialSpec::new(300, 1, 5)).unwrap();
    let b = acc.run(&TrialSpec::new(300, 6, 5)).unwrap();
    assert_eq!(a.ia, b.ia);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn prop_any_worker_count_agrees(workers in 1usize..12, seed in any::<u64>()) {
        let base = run_live(120, 1, seed);
        let split = run_live(120, workers, seed);
        prop_assert_eq!(base, split);
    }
}
