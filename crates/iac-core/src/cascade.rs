use crate::{NodeId, Result, TrialRng};

/// A stochastic activation model realized once per cascade trial.
///
/// Accumulators drive any backend through this trait: draw a realization
/// with [`Cascade::realize`], then ask which nodes each seed activates in it.
/// A trial value owns all per-trial scratch so it can be reused across
/// trials within one worker.
pub trait Cascade: Send + Sync {
    type Trial: Send;

    fn num_nodes(&self) -> usize;

    /// Fresh per-trial state sized for this model.
    fn new_trial(&self) -> Self::Trial;

    /// Draw the random part of one trial into `trial`.
    fn realize(&self, trial: &mut Self::Trial, rng: &mut TrialRng) -> Result<()>;

    /// Nodes activated by seeding `seed` in the current realization.
    /// Always contains `seed`, and no node twice.
    fn activated<'t>(&self, trial: &'t mut Self::Trial, seed: NodeId) -> &'t [NodeId];
}
