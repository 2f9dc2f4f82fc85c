use iac_cluster::{cluster, ClusterAssignment, KMeans};
use nalgebra::DMatrix;
use proptest::prelude::*;

fn matrix_and_k() -> impl Strategy<Value = (DMatrix<f64>, usize, u64)> {
    (1usize..16).prop_flat_map(|n| {
        (
            prop::collection::vec(0.0f64..=1.0, n * n).prop_map(move |v| DMatrix::from_vec(n, n, v)),
            1..=n,
            any::<u64>(),
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_groups_partition_nodes((ia, k, seed) in matrix_and_k()) {
        let n = ia.nrows();
        let assignment = cluster(&ia, k, &KMeans::default(), seed).unwrap();

        let mut all: Vec<usize> = assignment.iter().flat_map(|(_, m)| m.to_vec()).collect();
        all.sort_unstable();
        prop_assert_eq!(all, (0..n).collect::<Vec<_>>());

        prop_assert!(assignment.num_clusters() >= 1);
        prop_assert!(assignment.num_clusters() <= k);
        let labels: Vec<usize> = assignment.iter().map(|(c, _)| c).collect();
        prop_assert_eq!(labels, (0..assignment.num_clusters()).collect::<Vec<_>>());
        for (_, members) in assignment.iter() {
            prop_assert!(members.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn prop_same_seed_same_clusters((ia, k, seed) in matrix_and_k()) {
        let a = cluster(&ia, k, &KMeans::default(), seed).unwrap();
        let b = cluster(&ia, k, &KMeans::default(), seed).unwrap();
        prop_assert_eq!(a, b);
    }
}

#[test]
fn test_label_round_trip() {
    let a = ClusterAssignment::from_labels(&[2, 2, 0, 1, 0]);
    let again = ClusterAssignment::from_labels(&a.to_labels().unwrap());
    assert_eq!(a, again);
}
