use crate::pipeline::RunArtifacts;
use anyhow::Context;
use iac_cluster::ClusterAssignment;
use iac_core::{GraphStats, F};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Summary handed to report consumers alongside the raw IA matrix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub dataset: String,
    pub policy: String,
    pub clusters: ClusterAssignment,
    pub cluster_sizes: BTreeMap<usize, usize>,
    /// Percent of nodes per cluster.
    pub cluster_percentages: BTreeMap<usize, F>,
    pub time_per_trial: F,
    pub average_edge_weight: Option<F>,
    #[serde(default)]
    pub graphs: Vec<GraphStats>,
    /// ARI and NMI against the dataset's ground truth, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_truth: Option<Agreement>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Agreement {
    pub adjusted_rand_index: F,
    pub normalized_mutual_info: F,
}

impl Agreement {
    pub fn between(a: &[usize], b: &[usize]) -> iac_core::Result<Self> {
        Ok(Self {
            adjusted_rand_index: iac_cluster::adjusted_rand_index(a, b)?,
            normalized_mutual_info: iac_cluster::normalized_mutual_info(a, b)?,
        })
    }
}

impl RunReport {
    pub fn new(dataset: &str, policy: &str, artifacts: &RunArtifacts) -> Self {
        Self {
            dataset: dataset.to_string(),
            policy: policy.to_string(),
            cluster_sizes: artifacts.clusters.sizes(),
            cluster_percentages: artifacts.clusters.percentages(),
            clusters: artifacts.clusters.clone(),
            time_per_trial: artifacts.time_per_trial,
            average_edge_weight: artifacts.average_edge_weight,
            graphs: artifacts.graphs.clone(),
            ground_truth: None,
        }
    }

    /// Score the clusters against ground-truth labels.
    pub fn with_ground_truth(mut self, truth: &[usize]) -> anyhow::Result<Self> {
        let labels = self.clusters.to_labels()?;
        self.ground_truth = Some(Agreement::between(&labels, truth)?);
        Ok(self)
    }

    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }
}

pub fn write_clusters(clusters: &ClusterAssignment, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(clusters)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Read and check a `{"0": [..], "1": [..]}` cluster document.
pub fn read_clusters(path: &Path) -> anyhow::Result<ClusterAssignment> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let groups: BTreeMap<usize, Vec<usize>> = serde_json::from_str(&json)
        .with_context(|| format!("parsing {}", path.display()))?;
    let clusters = ClusterAssignment::from_groups(groups)
        .with_context(|| format!("{} is not a partition", path.display()))?;
    Ok(clusters)
}
