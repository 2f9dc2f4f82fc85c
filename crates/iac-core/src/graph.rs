use crate::{IacError, NodeId, Result, EPSILON, F};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Directed edge `u -> v` with activation probability `w`.
///
/// Unweighted graphs carry `w = 0.0` until a weight policy is applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub u: NodeId, // source node id
    pub v: NodeId, // target node id
    pub w: F,      // probability that this edge is the one firing into v
}

impl Edge {
    pub fn new(u: NodeId, v: NodeId, w: F) -> Self {
        Self { u, v, w }
    }

    pub fn unweighted(u: NodeId, v: NodeId) -> Self {
        Self { u, v, w: 0.0 }
    }
}

/// Node attributes kept column-wise and indexed by dense node id.
///
/// Nothing on the simulation path reads this table; it travels with the graph
/// so reports can summarise clusters by attribute.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeTable {
    #[serde(default)]
    pub numeric: BTreeMap<String, Vec<F>>,
    #[serde(default)]
    pub text: BTreeMap<String, Vec<String>>,
}

impl NodeTable {
    pub fn numeric(&self, name: &str, node: NodeId) -> Option<F> {
        self.numeric.get(name).and_then(|col| col.get(node)).copied()
    }

    pub fn text(&self, name: &str, node: NodeId) -> Option<&str> {
        self.text
            .get(name)
            .and_then(|col| col.get(node))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.numeric.is_empty() && self.text.is_empty()
    }

    fn check_len(&self, n: usize) -> Result<()> {
        let numeric = self.numeric.iter().map(|(k, c)| (k, c.len()));
        let text = self.text.iter().map(|(k, c)| (k, c.len()));
        for (name, len) in numeric.chain(text) {
            if len != n {
                return Err(IacError::InvalidGraph(format!(
                    "attribute column '{name}' has {len} entries for {n} nodes"
                )));
            }
        }
        Ok(())
    }
}

/// Summary figures for a graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub num_nodes: usize,
    pub num_edges: usize,
    pub density: F,
    pub max_in_degree: usize,
    pub mean_in_degree: F,
    pub average_edge_weight: Option<F>,
}

/// Directed graph over the dense node range `[0, n)`.
///
/// Edges are stored once; per-node incoming and outgoing lists hold edge
/// indices so weights can be replaced without rebuilding adjacency.
#[derive(Clone, Debug)]
pub struct Graph {
    num_nodes: usize,
    edges: Vec<Edge>,
    directed: bool,
    attrs: NodeTable,
    incoming: Vec<Vec<usize>>,
    outgoing: Vec<Vec<usize>>,
}

impl Graph {
    /// Build a directed graph, rejecting out-of-range endpoints, duplicate
    /// edges and weights outside `[0, 1]`.
    pub fn new(num_nodes: usize, edges: Vec<Edge>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(edges.len());
        for edge in &edges {
            if edge.u >= num_nodes || edge.v >= num_nodes {
                return Err(IacError::InvalidGraph(format!(
                    "edge {} -> {} outside node range [0, {})",
                    edge.u, edge.v, num_nodes
                )));
            }
            if !seen.insert((edge.u, edge.v)) {
                return Err(IacError::InvalidGraph(format!(
                    "duplicate edge {} -> {}",
                    edge.u, edge.v
                )));
            }
            check_weight(edge)?;
        }

        let mut g = Self {
            num_nodes,
            edges,
            directed: true,
            attrs: NodeTable::default(),
            incoming: Vec::new(),
            outgoing: Vec::new(),
        };
        g.build_adjacency();
        Ok(g)
    }

    /// Graph with no edges.
    pub fn empty(num_nodes: usize) -> Self {
        Self {
            num_nodes,
            edges: Vec::new(),
            directed: true,
            attrs: NodeTable::default(),
            incoming: vec![Vec::new(); num_nodes],
            outgoing: vec![Vec::new(); num_nodes],
        }
    }

    /// Attach the node attribute table; every column must have `n` entries.
    pub fn with_attrs(mut self, attrs: NodeTable) -> Result<Self> {
        attrs.check_len(self.num_nodes)?;
        self.attrs = attrs;
        Ok(self)
    }

    /// Record whether the provider delivered this graph as directed.
    pub fn with_directed(mut self, directed: bool) -> Self {
        self.directed = directed;
        self
    }

    /// Same topology with one weight per edge, in edge order.
    pub fn with_weights(&self, weights: Vec<F>) -> Result<Self> {
        if weights.len() != self.edges.len() {
            return Err(IacError::InvalidGraph(format!(
                "{} weights for {} edges",
                weights.len(),
                self.edges.len()
            )));
        }
        let mut g = self.clone();
        for (edge, w) in g.edges.iter_mut().zip(weights) {
            edge.w = w;
            check_weight(edge)?;
        }
        Ok(g)
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_nodes == 0
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge(&self, index: usize) -> &Edge {
        &self.edges[index]
    }

    pub fn attrs(&self) -> &NodeTable {
        &self.attrs
    }

    /// Indices of edges entering `v`.
    pub fn incoming(&self, v: NodeId) -> &[usize] {
        self.incoming.get(v).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Indices of edges leaving `u`.
    pub fn outgoing(&self, u: NodeId) -> &[usize] {
        self.outgoing.get(u).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Predecessors of `v` with the weight of the connecting edge.
    pub fn predecessors(&self, v: NodeId) -> impl Iterator<Item = (NodeId, F)> + '_ {
        self.incoming(v).iter().map(move |&e| {
            let edge = &self.edges[e];
            (edge.u, edge.w)
        })
    }

    pub fn successors(&self, u: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.outgoing(u).iter().map(move |&e| self.edges[e].v)
    }

    pub fn in_degree(&self, v: NodeId) -> usize {
        self.incoming(v).len()
    }

    pub fn out_degree(&self, u: NodeId) -> usize {
        self.outgoing(u).len()
    }

    pub fn max_in_degree(&self) -> usize {
        self.incoming.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn in_weight(&self, v: NodeId) -> F {
        self.predecessors(v).map(|(_, w)| w).sum()
    }

    /// First node whose incoming weight exceeds `1 + EPSILON`, with its sum.
    pub fn first_overweight(&self) -> Option<(NodeId, F)> {
        (0..self.num_nodes)
            .map(|v| (v, self.in_weight(v)))
            .find(|&(_, sum)| sum > 1.0 + EPSILON)
    }

    pub fn average_edge_weight(&self) -> Option<F> {
        if self.edges.is_empty() {
            return None;
        }
        let total: F = self.edges.iter().map(|e| e.w).sum();
        Some(total / self.edges.len() as F)
    }

    pub fn stats(&self) -> GraphStats {
        let n = self.num_nodes;
        let max_edges = n.saturating_mul(n.saturating_sub(1));
        GraphStats {
            num_nodes: n,
            num_edges: self.edges.len(),
            density: if max_edges > 0 {
                self.edges.len() as F / max_edges as F
            } else {
                0.0
            },
            max_in_degree: self.max_in_degree(),
            mean_in_degree: if n > 0 {
                self.edges.len() as F / n as F
            } else {
                0.0
            },
            average_edge_weight: self.average_edge_weight(),
        }
    }

    fn build_adjacency(&mut self) {
        let n = self.num_nodes;
        let mut incoming = vec![Vec::new(); n];
        let mut outgoing = vec![Vec::new(); n];

        for (index, edge) in self.edges.iter().enumerate() {
            incoming[edge.v].push(index);
            outgoing[edge.u].push(index);
        }

        self.incoming = incoming;
        self.outgoing = outgoing;
    }
}

fn check_weight(edge: &Edge) -> Result<()> {
    if !edge.w.is_finite() || edge.w < 0.0 || edge.w > 1.0 {
        return Err(IacError::InvalidGraph(format!(
            "edge {} -> {} has weight {} outside [0, 1]",
            edge.u, edge.v, edge.w
        )));
    }
    Ok(())
}
