use crate::{Graph, IacError, NodeId, Result, EPSILON, F};
use rand::Rng;

/// One realized subgraph of a cascade trial.
///
/// Each node keeps at most one live incoming edge. The edges are stored as
/// successor lists so reachability can walk forward from a seed.
#[derive(Clone, Debug, Default)]
pub struct LiveEdgeGraph {
    successors: Vec<Vec<NodeId>>,
    live_edges: usize,
}

impl LiveEdgeGraph {
    /// `n` isolated nodes.
    pub fn isolated(n: usize) -> Self {
        Self {
            successors: vec![Vec::new(); n],
            live_edges: 0,
        }
    }

    /// Build from explicit successor lists. Used for fixtures; any topology,
    /// including cycles, is accepted.
    pub fn from_successors(successors: Vec<Vec<NodeId>>) -> Result<Self> {
        let n = successors.len();
        let mut live_edges = 0;
        for (u, succ) in successors.iter().enumerate() {
            if let Some(&v) = succ.iter().find(|&&v| v >= n) {
                return Err(IacError::InvalidGraph(format!(
                    "live edge {u} -> {v} outside node range [0, {n})"
                )));
            }
            live_edges += succ.len();
        }
        Ok(Self {
            successors,
            live_edges,
        })
    }

    /// Build from the live predecessor chosen by each node.
    pub fn from_choices(choices: &[Option<NodeId>]) -> Result<Self> {
        let mut g = Self::isolated(choices.len());
        for (v, choice) in choices.iter().enumerate() {
            if let Some(u) = *choice {
                if u >= choices.len() {
                    return Err(IacError::InvalidGraph(format!(
                        "live predecessor {u} of node {v} out of range"
                    )));
                }
                g.successors[u].push(v);
                g.live_edges += 1;
            }
        }
        Ok(g)
    }

    pub fn num_nodes(&self) -> usize {
        self.successors.len()
    }

    pub fn num_live_edges(&self) -> usize {
        self.live_edges
    }

    pub fn successors(&self, u: NodeId) -> &[NodeId] {
        self.successors.get(u).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Redraw this realization from `graph`, reusing the allocation.
    ///
    /// For each node `v` with incoming edges `(u_i, w_i)`, edge `i` goes live
    /// with probability `w_i` and no edge with probability `1 - Σ w_i`.
    pub fn resample<R: Rng + ?Sized>(&mut self, graph: &Graph, rng: &mut R) -> Result<()> {
        let n = graph.num_nodes();
        if self.successors.len() != n {
            self.successors = vec![Vec::new(); n];
        } else {
            self.successors.iter_mut().for_each(Vec::clear);
        }
        self.live_edges = 0;

        for v in 0..n {
            let incoming = graph.incoming(v);
            if incoming.is_empty() {
                continue;
            }

            let r: F = rng.gen();
            let mut cumulative = 0.0;
            let mut chosen = None;
            for &e in incoming {
                let edge = graph.edge(e);
                cumulative += edge.w;
                if chosen.is_none() && r < cumulative {
                    chosen = Some(edge.u);
                }
            }

            // The "no edge" outcome would need negative probability.
            if cumulative > 1.0 + EPSILON {
                return Err(IacError::PolicyViolation(format!(
                    "incoming weight {cumulative} at node {v} exceeds 1 during sampling"
                )));
            }

            if let Some(u) = chosen {
                self.successors[u].push(v);
                self.live_edges += 1;
            }
        }
        Ok(())
    }
}

/// Draw one live-edge graph from a weighted activation graph.
pub fn sample_live_edges<R: Rng + ?Sized>(graph: &Graph, rng: &mut R) -> Result<LiveEdgeGraph> {
    let mut live = LiveEdgeGraph::isolated(graph.num_nodes());
    live.resample(graph, rng)?;
    Ok(live)
}
