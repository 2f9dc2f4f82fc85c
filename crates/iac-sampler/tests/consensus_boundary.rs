use iac_core::{Edge, Graph, IacError};
use iac_models::LiveEdgeModel;
use iac_sampler::{MultiLayerAccumulator, TrialSpec};

/// Layer A: 0 -> 1 -> 2 with certain edges. Layer B: 0 -> 1 only.
/// Node 3 is isolated in both.
fn layers() -> Vec<LiveEdgeModel> {
    let a = Graph::new(4, vec![Edge::new(0, 1, 1.0), Edge::new(1, 2, 1.0)]).unwrap();
    let b = Graph::new(4, vec![Edge::new(0, 1, 1.0)]).unwrap();
    vec![LiveEdgeModel::new(a).unwrap(), LiveEdgeModel::new(b).unwrap()]
}

fn reached_from_zero(threshold: f64) -> Vec<usize> {
    let acc = MultiLayerAccumulator::new(layers(), threshold).unwrap();
    let outcome = acc.run(&TrialSpec::new(50, 2, 11)).unwrap();
    (0..4).filter(|&i| outcome.ia[(i, 0)] == 1.0).collect()
}

#[test]
fn test_zero_threshold_takes_union() {
    assert_eq!(reached_from_zero(0.0), vec![0, 1, 2]);
}

#[test]
fn test_full_threshold_takes_intersection() {
    assert_eq!(reached_from_zero(1.0), vec![0, 1]);
}

#[test]
fn test_half_threshold_is_inclusive() {
    assert_eq!(reached_from_zero(0.5), vec![0, 1, 2]);
}

#[test]
fn test_unreached_node_never_counted() {
    let acc = MultiLayerAccumulator::new(layers(), 0.0).unwrap();
    let outcome = acc.run(&TrialSpec::new(20, 1, 0)).unwrap();
    for s in [0, 1, 2] {
        assert_eq!(outcome.ia[(3, s)], 0.0);
    }
    assert_eq!(outcome.ia[(3, 3)], 1.0);
}

#[test]
fn test_rejects_bad_layer_sets() {
    let err = MultiLayerAccumulator::<LiveEdgeModel>::new(Vec::new(), 0.5).err().unwrap();
    assert!(matches!(err, IacError::Configuration(_)));

    let mut mixed = layers();
    mixed.push(LiveEdgeModel::new(Graph::empty(3)).unwrap());
    assert!(MultiLayerAccumulator::new(mixed, 0.5).is_err());

    assert!(MultiLayerAccumulator::new(layers(), 1.5).is_err());
    assert!(MultiLayerAccumulator::new(layers(), -0.1).is_err());
}

#[test]
fn test_single_layer_matches_plain_accumulator() {
    let g = Graph::new(3, vec![Edge::new(0, 1, 0.4), Edge::new(1, 2, 0.7)]).unwrap();
    let spec = TrialSpec::new(400, 3, 21);
    let single = iac_sampler::Accumulator::new(LiveEdgeModel::new(g.clone()).unwrap())
        .run(&spec)
        .unwrap();
    let multi = MultiLayerAccumulator::new(vec![LiveEdgeModel::new(g).unwrap()], 1.0)
        .unwrap()
        .run(&spec)
        .unwrap();
    assert_eq!(single.ia, multi.ia);
}
