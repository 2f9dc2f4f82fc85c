use crate::{LiveEdgeGraph, NodeId};
use std::collections::VecDeque;

/// Reusable breadth-first search state.
///
/// Visited marks are epoch stamps, so starting a new query costs nothing
/// proportional to the node count.
#[derive(Clone, Debug, Default)]
pub struct Reachability {
    stamps: Vec<u32>,
    epoch: u32,
    queue: VecDeque<NodeId>,
    reached: Vec<NodeId>,
}

impl Reachability {
    pub fn new(n: usize) -> Self {
        Self {
            stamps: vec![0; n],
            epoch: 0,
            queue: VecDeque::new(),
            reached: Vec::with_capacity(n),
        }
    }

    /// Nodes reachable from `seed` along live edges, seed first.
    ///
    /// # Panics
    /// If `seed` is not a node of `graph`.
    pub fn reachable(&mut self, graph: &LiveEdgeGraph, seed: NodeId) -> &[NodeId] {
        assert!(
            seed < graph.num_nodes(),
            "seed {seed} outside node range [0, {})",
            graph.num_nodes()
        );
        self.begin(graph.num_nodes());

        self.mark(seed);
        self.queue.push_back(seed);
        while let Some(u) = self.queue.pop_front() {
            self.reached.push(u);
            for &v in graph.successors(u) {
                if self.stamps[v] != self.epoch {
                    self.mark(v);
                    self.queue.push_back(v);
                }
            }
        }

        &self.reached
    }

    fn begin(&mut self, n: usize) {
        if self.stamps.len() != n {
            self.stamps = vec![0; n];
            self.epoch = 0;
        }
        if self.epoch == u32::MAX {
            self.stamps.iter_mut().for_each(|s| *s = 0);
            self.epoch = 0;
        }
        self.epoch += 1;
        self.queue.clear();
        self.reached.clear();
    }

    fn mark(&mut self, v: NodeId) {
        self.stamps[v] = self.epoch;
    }
}

/// One-shot reachability query.
pub fn reachable_set(graph: &LiveEdgeGraph, seed: NodeId) -> Vec<NodeId> {
    Reachability::new(graph.num_nodes())
        .reachable(graph, seed)
        .to_vec()
}
