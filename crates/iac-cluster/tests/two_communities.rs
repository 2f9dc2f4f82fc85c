use iac_cluster::{adjusted_rand_index, cluster, normalized_mutual_info, KMeans, KMeansConfig};
use nalgebra::DMatrix;

/// Two groups of five nodes: strong access within a group, weak across.
fn block_ia() -> DMatrix<f64> {
    DMatrix::from_fn(10, 10, |i, j| {
        if i == j {
            1.0
        } else if (i < 5) == (j < 5) {
            0.6 + 0.01 * ((i + j) % 3) as f64
        } else {
            0.05 + 0.01 * ((i * j) % 2) as f64
        }
    })
}

#[test]
fn test_recovers_blocks() {
    let truth = vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1];
    let assignment = cluster(&block_ia(), 2, &KMeans::default(), 1).unwrap();
    let labels = assignment.to_labels().unwrap();
    assert!((adjusted_rand_index(&labels, &truth).unwrap() - 1.0).abs() < 1e-12);
    assert!((normalized_mutual_info(&labels, &truth).unwrap() - 1.0).abs() < 1e-12);
    assert!(assignment.iter().any(|(_, m)| m == &[0, 1, 2, 3, 4][..]));
}

#[test]
fn test_single_restart_is_deterministic() {
    let km = KMeans::new(KMeansConfig {
        n_init: 1,
        ..KMeansConfig::default()
    });
    let a = cluster(&block_ia(), 3, &km, 5).unwrap();
    let b = cluster(&block_ia(), 3, &km, 5).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.num_nodes(), 10);
}
