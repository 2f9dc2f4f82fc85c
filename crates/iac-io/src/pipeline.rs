//! Graph(s) in, IA matrix and clusters out.

use crate::config::{PolicyKind, RunConfig};
use crate::report::{write_clusters, RunReport};
use crate::{write_ia_parquet, RunManifest};
use anyhow::Context;
use iac_cluster::{cluster, ClusterAssignment, KMeans};
use iac_core::{Graph, GraphStats, IacError, TrialRng, F};
use iac_models::{LiveEdgeModel, ThresholdModel};
use iac_sampler::{Accumulator, IaMatrix, MultiLayerAccumulator, RunOutcome};
use std::path::{Path, PathBuf};
use tracing::info;

/// Offset separating the weight-drawing stream from trial streams.
const WEIGHT_STREAM: u64 = 0x5745_4947_4854_5321;

/// Everything a run produces.
#[derive(Clone, Debug)]
pub struct RunArtifacts {
    pub ia: IaMatrix,
    pub clusters: ClusterAssignment,
    pub trials: usize,
    pub time_per_trial: F,
    /// Mean activation weight over all edges; `None` for the threshold
    /// backend or graphs without edges.
    pub average_edge_weight: Option<F>,
    /// Per-layer statistics of the graphs actually simulated.
    pub graphs: Vec<GraphStats>,
}

fn weight_rng(seed: u64, layer: usize) -> TrialRng {
    TrialRng::from_trial_id(seed ^ WEIGHT_STREAM, layer as u64)
}

fn live_edge_model(
    graph: &Graph,
    policy: PolicyKind,
    rng: &mut TrialRng,
) -> iac_core::Result<LiveEdgeModel> {
    match policy.weight_policy() {
        Some(p) => LiveEdgeModel::with_policy(graph, p, rng),
        None => LiveEdgeModel::new(graph.clone()),
    }
}

fn partition(ia: &IaMatrix, config: &RunConfig) -> iac_core::Result<ClusterAssignment> {
    let kmeans = KMeans::new(config.kmeans.clone());
    cluster(ia, config.clusters, &kmeans, config.kmeans.seed)
}

fn finish(
    outcome: RunOutcome,
    config: &RunConfig,
    average_edge_weight: Option<F>,
    graphs: Vec<GraphStats>,
) -> anyhow::Result<RunArtifacts> {
    let clusters = partition(&outcome.ia, config).context("clustering the IA matrix")?;
    Ok(RunArtifacts {
        ia: outcome.ia,
        clusters,
        trials: outcome.trials,
        time_per_trial: outcome.time_per_trial,
        average_edge_weight,
        graphs,
    })
}

/// Estimate the IA matrix of one graph and cluster it.
pub fn run_single(config: &RunConfig, graph: &Graph) -> anyhow::Result<RunArtifacts> {
    config.validate()?;
    let spec = config.trial_spec();
    info!(dataset = %config.dataset, policy = %config.policy, "single-layer pipeline");

    match config.policy {
        PolicyKind::Threshold => {
            let stats = graph.stats();
            let outcome = Accumulator::new(ThresholdModel::new(graph.clone())).run(&spec)?;
            finish(outcome, config, None, vec![stats])
        }
        policy => {
            let model = live_edge_model(graph, policy, &mut weight_rng(config.seed, 0))?;
            let average = model.average_edge_weight();
            let stats = model.graph().stats();
            let outcome = Accumulator::new(model).run(&spec)?;
            finish(outcome, config, average, vec![stats])
        }
    }
}

/// Estimate the consensus IA matrix over layers sharing one node set and
/// cluster it. Needs `config.threshold`.
pub fn run_multiplex(config: &RunConfig, layers: &[Graph]) -> anyhow::Result<RunArtifacts> {
    config.validate()?;
    let threshold = config.threshold.ok_or_else(|| {
        IacError::Configuration("multiplex runs need a consensus threshold".into())
    })?;
    let spec = config.trial_spec();
    info!(
        dataset = %config.dataset,
        policy = %config.policy,
        layers = layers.len(),
        threshold,
        "multi-layer pipeline"
    );

    match config.policy {
        PolicyKind::Threshold => {
            let stats = layers.iter().map(Graph::stats).collect();
            let models: Vec<ThresholdModel> =
                layers.iter().cloned().map(ThresholdModel::new).collect();
            let outcome = MultiLayerAccumulator::new(models, threshold)?.run(&spec)?;
            finish(outcome, config, None, stats)
        }
        policy => {
            let models = layers
                .iter()
                .enumerate()
                .map(|(i, g)| live_edge_model(g, policy, &mut weight_rng(config.seed, i)))
                .collect::<iac_core::Result<Vec<_>>>()?;
            let stats = models.iter().map(|m| m.graph().stats()).collect();
            let average = pooled_average_weight(&models);
            let outcome = MultiLayerAccumulator::new(models, threshold)?.run(&spec)?;
            finish(outcome, config, average, stats)
        }
    }
}

fn pooled_average_weight(models: &[LiveEdgeModel]) -> Option<F> {
    let (sum, count) = models
        .iter()
        .flat_map(|m| m.graph().edges())
        .fold((0.0, 0usize), |(s, c), e| (s + e.w, c + 1));
    (count > 0).then(|| sum / count as F)
}

/// Paths of the files [`save_run`] writes.
#[derive(Clone, Debug)]
pub struct RunFiles {
    pub dir: PathBuf,
    pub manifest: PathBuf,
    pub matrix: PathBuf,
    pub clusters: PathBuf,
    pub report: PathBuf,
}

impl RunFiles {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            manifest: dir.join("manifest.json"),
            matrix: dir.join("ia.parquet"),
            clusters: dir.join("clusters.json"),
            report: dir.join("report.json"),
        }
    }
}

/// Write manifest, matrix, clusters and report into `dir`.
pub fn save_run(
    dir: &Path,
    manifest: &RunManifest,
    artifacts: &RunArtifacts,
    report: &RunReport,
) -> anyhow::Result<RunFiles> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let files = RunFiles::in_dir(dir);

    manifest.save_to_file(&files.manifest)?;
    write_ia_parquet(&artifacts.ia, &files.matrix)?;
    write_clusters(&artifacts.clusters, &files.clusters)?;
    report.save_to_file(&files.report)?;

    info!(dir = %dir.display(), "run artifacts written");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use iac_core::Edge;

    fn two_triangles() -> Graph {
        let mut edges = Vec::new();
        for base in [0, 3] {
            for (a, b) in [(0, 1), (1, 2), (2, 0)] {
                edges.push(Edge::unweighted(base + a, base + b));
                edges.push(Edge::unweighted(base + b, base + a));
            }
        }
        Graph::new(6, edges).unwrap()
    }

    fn config(policy: PolicyKind) -> RunConfig {
        RunConfig {
            dataset: "triangles".into(),
            policy,
            trials: 200,
            workers: 2,
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_single_run_separates_components() {
        let artifacts = run_single(&config(PolicyKind::Weighted), &two_triangles()).unwrap();
        assert_eq!(artifacts.ia.shape(), (6, 6));
        assert_eq!(artifacts.clusters.num_clusters(), 2);
        let labels = artifacts.clusters.to_labels().unwrap();
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_ne!(labels[0], labels[3]);
        assert_eq!(artifacts.average_edge_weight, Some(0.5));
    }

    #[test]
    fn test_threshold_backend_has_no_weight() {
        let artifacts = run_single(&config(PolicyKind::Threshold), &two_triangles()).unwrap();
        assert_eq!(artifacts.average_edge_weight, None);
        assert_eq!(artifacts.ia[(4, 0)], 0.0);
    }

    #[test]
    fn test_preset_rejects_overweight_graph() {
        let g = Graph::new(3, vec![Edge::new(0, 2, 0.9), Edge::new(1, 2, 0.9)]).unwrap();
        let err = run_single(&config(PolicyKind::Preset), &g).unwrap_err();
        let core = err.downcast_ref::<IacError>().unwrap();
        assert!(core.is_policy_violation());
    }

    #[test]
    fn test_multiplex_needs_threshold() {
        let layers = vec![two_triangles(), two_triangles()];
        assert!(run_multiplex(&config(PolicyKind::Uniform), &layers).is_err());

        let cfg = RunConfig {
            threshold: Some(0.5),
            ..config(PolicyKind::Uniform)
        };
        let artifacts = run_multiplex(&cfg, &layers).unwrap();
        assert_eq!(artifacts.graphs.len(), 2);
        assert_eq!(artifacts.ia[(0, 0)], 1.0);
    }
}
