use crate::{NodeId, F};

/// Per-seed tally of how many layers reach each node.
///
/// Only touched nodes are reset between seeds.
#[derive(Clone, Debug, Default)]
pub struct ConsensusCounter {
    counts: Vec<u32>,
    touched: Vec<NodeId>,
}

impl ConsensusCounter {
    pub fn new(n: usize) -> Self {
        Self {
            counts: vec![0; n],
            touched: Vec::new(),
        }
    }

    /// Record the nodes reached in one layer. `reached` must not repeat a node.
    pub fn add(&mut self, reached: &[NodeId]) {
        for &v in reached {
            if self.counts[v] == 0 {
                self.touched.push(v);
            }
            self.counts[v] += 1;
        }
    }

    /// Emit every node reached in at least `threshold` of `layers` layers,
    /// then clear the tally. Nodes reached in no layer are never emitted.
    pub fn drain_accepted(&mut self, layers: usize, threshold: F, mut accept: impl FnMut(NodeId)) {
        let layers = layers.max(1) as F;
        for v in self.touched.drain(..) {
            if self.counts[v] as F / layers >= threshold {
                accept(v);
            }
            self.counts[v] = 0;
        }
    }
}
