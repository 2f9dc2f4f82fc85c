//! Linear threshold cascade.
//!
//! Each trial draws a threshold `θ_v ~ U(0,1)` for every node. Seeding `s`
//! activates it; an inactive node activates once the fraction of its
//! in-neighbours that are active reaches `θ_v`. Edge weights are ignored.

use iac_core::{Cascade, Graph, NodeId, Result, TrialRng, F};
use rand::Rng;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct ThresholdModel {
    graph: Graph,
}

/// Per-trial thresholds and propagation scratch.
#[derive(Clone, Debug)]
pub struct ThresholdTrial {
    thresholds: Vec<F>,
    active_in: Vec<u32>,
    active: Vec<bool>,
    touched: Vec<NodeId>,
    activated: Vec<NodeId>,
}

impl ThresholdModel {
    pub fn new(graph: Graph) -> Self {
        debug!(nodes = graph.num_nodes(), edges = graph.num_edges(), "threshold model ready");
        Self { graph }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Threshold for `v` in the current realization.
    pub fn threshold(trial: &ThresholdTrial, v: NodeId) -> F {
        trial.thresholds[v]
    }
}

impl ThresholdTrial {
    /// Fix the thresholds instead of drawing them.
    pub fn set_thresholds(&mut self, thresholds: &[F]) {
        self.thresholds.copy_from_slice(thresholds);
    }

    fn reset(&mut self) {
        for &v in &self.touched {
            self.active_in[v] = 0;
        }
        for &v in &self.activated {
            self.active[v] = false;
        }
        self.touched.clear();
        self.activated.clear();
    }
}

impl Cascade for ThresholdModel {
    type Trial = ThresholdTrial;

    fn num_nodes(&self) -> usize {
        self.graph.num_nodes()
    }

    fn new_trial(&self) -> ThresholdTrial {
        let n = self.graph.num_nodes();
        ThresholdTrial {
            thresholds: vec![0.0; n],
            active_in: vec![0; n],
            active: vec![false; n],
            touched: Vec::new(),
            activated: Vec::with_capacity(n),
        }
    }

    fn realize(&self, trial: &mut ThresholdTrial, rng: &mut TrialRng) -> Result<()> {
        for theta in trial.thresholds.iter_mut() {
            *theta = rng.gen();
        }
        Ok(())
    }

    fn activated<'t>(&self, trial: &'t mut ThresholdTrial, seed: NodeId) -> &'t [NodeId] {
        trial.reset();
        trial.active[seed] = true;
        trial.activated.push(seed);

        // Activation is monotone, so processing newly active nodes in any
        // order reaches the same fixed point as synchronous rounds.
        let mut next = 0;
        while next < trial.activated.len() {
            let u = trial.activated[next];
            next += 1;
            for w in self.graph.successors(u) {
                if trial.active[w] {
                    continue;
                }
                if trial.active_in[w] == 0 {
                    trial.touched.push(w);
                }
                trial.active_in[w] += 1;
                let fraction = trial.active_in[w] as F / self.graph.in_degree(w) as F;
                if fraction >= trial.thresholds[w] {
                    trial.active[w] = true;
                    trial.activated.push(w);
                }
            }
        }

        &trial.activated
    }
}
