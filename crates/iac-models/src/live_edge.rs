use iac_core::{
    validate_activation, Cascade, Graph, LiveEdgeGraph, NodeId, Reachability, Result, TrialRng, F,
    WeightPolicy,
};
use rand::Rng;
use tracing::debug;

/// Independent live-edge cascade over a weighted activation graph.
#[derive(Clone, Debug)]
pub struct LiveEdgeModel {
    graph: Graph,
}

/// Per-trial state: the realized subgraph plus BFS scratch.
#[derive(Clone, Debug)]
pub struct LiveEdgeTrial {
    live: LiveEdgeGraph,
    reach: Reachability,
}

impl LiveEdgeModel {
    /// Wrap an already weighted graph, checking the activation invariant.
    pub fn new(graph: Graph) -> Result<Self> {
        validate_activation(&graph)?;
        debug!(nodes = graph.num_nodes(), edges = graph.num_edges(), "live-edge model ready");
        Ok(Self { graph })
    }

    /// Weight `graph` with `policy` and wrap the result.
    pub fn with_policy<R: Rng + ?Sized>(graph: &Graph, policy: WeightPolicy, rng: &mut R) -> Result<Self> {
        let weighted = policy.apply(graph, rng)?;
        Ok(Self { graph: weighted })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn average_edge_weight(&self) -> Option<F> {
        self.graph.average_edge_weight()
    }
}

impl Cascade for LiveEdgeModel {
    type Trial = LiveEdgeTrial;

    fn num_nodes(&self) -> usize {
        self.graph.num_nodes()
    }

    fn new_trial(&self) -> LiveEdgeTrial {
        let n = self.graph.num_nodes();
        LiveEdgeTrial {
            live: LiveEdgeGraph::isolated(n),
            reach: Reachability::new(n),
        }
    }

    fn realize(&self, trial: &mut LiveEdgeTrial, rng: &mut TrialRng) -> Result<()> {
        trial.live.resample(&self.graph, rng)
    }

    fn activated<'t>(&self, trial: &'t mut LiveEdgeTrial, seed: NodeId) -> &'t [NodeId] {
        trial.reach.reachable(&trial.live, seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iac_core::Edge;

    #[test]
    fn test_rejects_overweight_graph() {
        let g = Graph::new(3, vec![Edge::new(0, 2, 0.9), Edge::new(1, 2, 0.9)]).unwrap();
        assert!(LiveEdgeModel::new(g).unwrap_err().is_policy_violation());
    }

    #[test]
    fn test_certain_chain() {
        let g = Graph::new(3, vec![Edge::new(0, 1, 1.0), Edge::new(1, 2, 1.0)]).unwrap();
        let model = LiveEdgeModel::new(g).unwrap();
        let mut trial = model.new_trial();
        let mut rng = TrialRng::new(3);
        model.realize(&mut trial, &mut rng).unwrap();

        let mut from0 = model.activated(&mut trial, 0).to_vec();
        from0.sort_unstable();
        assert_eq!(from0, vec![0, 1, 2]);
        assert_eq!(model.activated(&mut trial, 2), &[2]);
    }

    #[test]
    fn test_with_policy_weights_graph() {
        let g = Graph::new(3, vec![Edge::unweighted(0, 2), Edge::unweighted(1, 2)]).unwrap();
        let mut rng = TrialRng::new(0);
        let model = LiveEdgeModel::with_policy(&g, WeightPolicy::Weighted, &mut rng).unwrap();
        assert_eq!(model.average_edge_weight(), Some(0.5));
    }
}
