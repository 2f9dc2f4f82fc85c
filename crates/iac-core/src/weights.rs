//! Edge-weight policies that turn a directed graph into an activation graph.
//!
//! Every policy ends with [`validate_activation`]: a node whose incoming
//! weights sum above `1 + EPSILON` makes the policy fail for that graph.

use crate::{Graph, IacError, Result, EPSILON, F};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Open01};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::{debug, info};

/// Discrete weight classes drawn by [`WeightPolicy::Trivalency`].
pub const TRIVALENCY_CLASSES: [F; 3] = [0.1, 0.01, 0.001];

/// Reductions allowed per incoming edge while rebalancing a node.
///
/// Largest-first reduction only touches weights above `1 / indegree`, so an
/// edge starting at most one needs fewer than `log2(indegree) + 1` halvings.
pub const REBALANCE_STEPS_PER_EDGE: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightPolicy {
    /// `1 / indegree(v)` on every edge into `v`.
    Weighted,
    /// `1 / max indegree` on every edge.
    Uniform,
    /// Independent `U(0,1)` draws, halved largest-first where a node is overweight.
    Random,
    /// Draws from `{0.1, 0.01, 0.001}`, divided by ten largest-first where overweight.
    Trivalency,
}

impl WeightPolicy {
    pub const ALL: [WeightPolicy; 4] = [
        WeightPolicy::Weighted,
        WeightPolicy::Uniform,
        WeightPolicy::Random,
        WeightPolicy::Trivalency,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WeightPolicy::Weighted => "weighted",
            WeightPolicy::Uniform => "uniform",
            WeightPolicy::Random => "random",
            WeightPolicy::Trivalency => "trivalency",
        }
    }

    /// Apply the policy, returning a new weighted graph.
    pub fn apply<R: Rng + ?Sized>(self, graph: &Graph, rng: &mut R) -> Result<Graph> {
        let weights = match self {
            WeightPolicy::Weighted => weighted(graph),
            WeightPolicy::Uniform => uniform(graph),
            WeightPolicy::Random => random(graph, rng)?,
            WeightPolicy::Trivalency => trivalency(graph, rng)?,
        };

        let weighted = graph.with_weights(weights)?;
        validate_activation(&weighted).map_err(|err| match err {
            IacError::PolicyViolation(msg) => {
                IacError::PolicyViolation(format!("{} policy failed: {msg}", self.name()))
            }
            other => other,
        })?;

        info!(
            policy = self.name(),
            nodes = weighted.num_nodes(),
            edges = weighted.num_edges(),
            average_weight = weighted.average_edge_weight().unwrap_or(0.0),
            "edge weights assigned"
        );
        Ok(weighted)
    }
}

impl std::fmt::Display for WeightPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for WeightPolicy {
    type Err = IacError;

    fn from_str(s: &str) -> Result<Self> {
        WeightPolicy::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| IacError::Configuration(format!("unknown weight policy '{s}'")))
    }
}

pub fn assign_weights<R: Rng + ?Sized>(
    graph: &Graph,
    policy: WeightPolicy,
    rng: &mut R,
) -> Result<Graph> {
    policy.apply(graph, rng)
}

/// Check that every node's incoming weight sum is at most `1 + EPSILON`.
pub fn validate_activation(graph: &Graph) -> Result<()> {
    match graph.first_overweight() {
        None => Ok(()),
        Some((node, sum)) => Err(IacError::PolicyViolation(format!(
            "incoming weight {sum} at node {node} exceeds 1"
        ))),
    }
}

fn weighted(graph: &Graph) -> Vec<F> {
    graph
        .edges()
        .iter()
        .map(|e| 1.0 / graph.in_degree(e.v) as F)
        .collect()
}

fn uniform(graph: &Graph) -> Vec<F> {
    // Edges exist only when the max indegree is at least one.
    let w = 1.0 / graph.max_in_degree().max(1) as F;
    vec![w; graph.num_edges()]
}

fn random<R: Rng + ?Sized>(graph: &Graph, rng: &mut R) -> Result<Vec<F>> {
    let mut weights: Vec<F> = (0..graph.num_edges())
        .map(|_| Open01.sample(rng))
        .collect();
    let steps = rebalance(graph, &mut weights, 2.0, REBALANCE_STEPS_PER_EDGE)?;
    debug!(steps, "random weights rebalanced");
    Ok(weights)
}

fn trivalency<R: Rng + ?Sized>(graph: &Graph, rng: &mut R) -> Result<Vec<F>> {
    let max_in = graph.max_in_degree();
    let floor = TRIVALENCY_CLASSES[2];
    if max_in as F * floor > 1.0 {
        return Err(IacError::PolicyViolation(format!(
            "trivalency impossible: max indegree {max_in} times floor {floor} exceeds 1"
        )));
    }

    let mut weights: Vec<F> = (0..graph.num_edges())
        .map(|_| *TRIVALENCY_CLASSES.choose(rng).unwrap_or(&floor))
        .collect();
    let steps = rebalance(graph, &mut weights, 10.0, REBALANCE_STEPS_PER_EDGE)?;
    debug!(steps, "trivalency weights rebalanced");
    Ok(weights)
}

/// Heap entry ordered by weight, ties broken by edge index.
#[derive(Clone, Copy, Debug)]
struct Pending {
    w: F,
    edge: usize,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.w
            .total_cmp(&other.w)
            .then_with(|| other.edge.cmp(&self.edge))
    }
}

/// Divide the largest incoming weight at each overweight node by `divisor`
/// until the node's sum is at most one. A node may take at most
/// `steps_per_edge` reductions per incoming edge. Returns the total number of
/// steps.
fn rebalance(
    graph: &Graph,
    weights: &mut [F],
    divisor: F,
    steps_per_edge: usize,
) -> Result<usize> {
    let mut total_steps = 0;

    for v in 0..graph.num_nodes() {
        let incoming = graph.incoming(v);
        let mut sum: F = incoming.iter().map(|&e| weights[e]).sum();
        if sum <= 1.0 {
            continue;
        }

        let mut heap: BinaryHeap<Pending> = incoming
            .iter()
            .map(|&edge| Pending { w: weights[edge], edge })
            .collect();

        let limit = incoming.len().saturating_mul(steps_per_edge);
        let mut steps = 0;
        while sum > 1.0 {
            if steps == limit {
                return Err(IacError::PolicyViolation(format!(
                    "rebalancing node {v} did not converge after {steps} steps (sum {sum})"
                )));
            }
            let Some(mut top) = heap.pop() else { break };
            let reduced = top.w / divisor;
            sum -= top.w - reduced;
            top.w = reduced;
            weights[top.edge] = reduced;
            heap.push(top);
            steps += 1;
        }
        total_steps += steps;
    }

    Ok(total_steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Edge;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn star(k: usize) -> Graph {
        let edges = (1..=k).map(|u| Edge::unweighted(u, 0)).collect();
        Graph::new(k + 1, edges).unwrap()
    }

    #[test]
    fn test_weighted_is_inverse_indegree() {
        let g = Graph::new(
            3,
            vec![Edge::unweighted(0, 2), Edge::unweighted(1, 2), Edge::unweighted(0, 1)],
        )
        .unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let w = WeightPolicy::Weighted.apply(&g, &mut rng).unwrap();
        assert_eq!(w.edge(0).w, 0.5);
        assert_eq!(w.edge(1).w, 0.5);
        assert_eq!(w.edge(2).w, 1.0);
    }

    #[test]
    fn test_uniform_is_global_constant() {
        let mut edges: Vec<Edge> = (1..=4).map(|u| Edge::unweighted(u, 0)).collect();
        edges.push(Edge::unweighted(0, 1));
        let g = Graph::new(5, edges).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let w = WeightPolicy::Uniform.apply(&g, &mut rng).unwrap();
        assert!(w.edges().iter().all(|e| e.w == 0.25));
    }

    #[test]
    fn test_random_rebalances_overweight_nodes() {
        let g = star(50);
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let w = WeightPolicy::Random.apply(&g, &mut rng).unwrap();
        let sum = w.in_weight(0);
        assert!(sum <= 1.0 + EPSILON);
        assert!(w.edges().iter().all(|e| e.w > 0.0 && e.w < 1.0));
    }

    #[test]
    fn test_rebalance_halves_largest_first() {
        let g = star(3);
        let mut weights = vec![0.75, 0.5, 0.25];
        rebalance(&g, &mut weights, 2.0, REBALANCE_STEPS_PER_EDGE).unwrap();
        // 0.75 -> 0.375 (sum 1.125), 0.5 -> 0.25 (sum 0.875)
        assert_eq!(weights, vec![0.375, 0.25, 0.25]);
    }

    #[test]
    fn test_trivalency_divides_by_ten() {
        let g = star(3);
        let mut weights = vec![0.1, 0.001, 0.01];
        let steps = rebalance(&g, &mut weights, 10.0, REBALANCE_STEPS_PER_EDGE).unwrap();
        assert_eq!(steps, 0);

        let g = star(12);
        let mut weights = vec![0.1; 12];
        rebalance(&g, &mut weights, 10.0, REBALANCE_STEPS_PER_EDGE).unwrap();
        let sum: F = weights.iter().sum();
        assert!(sum <= 1.0);
        assert!(weights.iter().all(|&w| w == 0.1 || w == 0.01));
        assert!(weights.iter().filter(|&&w| w == 0.01).count() >= 2);
    }

    #[test]
    fn test_rebalance_gives_up_at_step_limit() {
        let g = star(4);
        let mut weights = vec![0.9; 4];
        let err = rebalance(&g, &mut weights, 2.0, 1).unwrap_err();
        assert!(matches!(err, IacError::PolicyViolation(_)));
        let msg = err.to_string();
        assert!(msg.contains("node 0"), "{msg}");
        assert!(msg.contains("after 4 steps"), "{msg}");
    }

    #[test]
    fn test_random_converges_on_large_hub() {
        let g = star(100_000);
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let w = WeightPolicy::Random.apply(&g, &mut rng).unwrap();
        assert!(w.in_weight(0) <= 1.0 + EPSILON);
        assert!(w.edges().iter().all(|e| e.w > 0.0));
    }

    #[test]
    fn test_trivalency_precheck() {
        let g = star(1001);
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let err = WeightPolicy::Trivalency.apply(&g, &mut rng).unwrap_err();
        assert!(matches!(err, IacError::PolicyViolation(_)));

        let g = star(1000);
        let w = WeightPolicy::Trivalency.apply(&g, &mut rng).unwrap();
        assert!(w.in_weight(0) <= 1.0 + EPSILON);
    }

    #[test]
    fn test_validation_reports_node() {
        let g = Graph::new(3, vec![Edge::new(0, 2, 0.7), Edge::new(1, 2, 0.7)]).unwrap();
        let err = validate_activation(&g).unwrap_err();
        assert!(err.to_string().contains("node 2"));
    }

    #[test]
    fn test_policy_names_round_trip() {
        for policy in WeightPolicy::ALL {
            assert_eq!(policy.name().parse::<WeightPolicy>().unwrap(), policy);
        }
        assert!("ndlib".parse::<WeightPolicy>().is_err());
    }

    #[test]
    fn test_empty_graph() {
        let g = Graph::empty(0);
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        for policy in WeightPolicy::ALL {
            let w = policy.apply(&g, &mut rng).unwrap();
            assert_eq!(w.num_nodes(), 0);
        }
    }
}
