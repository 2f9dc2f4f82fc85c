//! Loading graphs, layer sets and ground truth from disk.
//!
//! A dataset named `karate` inside the data directory is made of
//!
//! - `karate.json`: a [`GraphDocument`],
//! - `karate.layers.json`: optional [`LayerManifest`] for multiplex runs,
//! - `karate.truth`: optional ground-truth labels, one integer per line.

use anyhow::{bail, Context};
use iac_core::{Edge, Graph, IacError, NodeId, NodeTable, F};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// On-disk graph description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub num_nodes: usize,
    #[serde(default = "default_directed")]
    pub directed: bool,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
    #[serde(default)]
    pub attributes: NodeTable,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<F>,
}

/// Layer documents of a multiplex dataset, relative to the manifest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerManifest {
    pub layers: Vec<PathBuf>,
}

fn default_directed() -> bool {
    true
}

impl GraphDocument {
    /// Build the directed graph.
    ///
    /// Undirected documents get each edge oriented by a fair coin drawn from
    /// `orientation_seed`; a pair listed in both directions counts once.
    /// Weights are kept only when every edge carries one.
    pub fn into_graph(self, orientation_seed: u64) -> iac_core::Result<Graph> {
        let weighted = self.edges.iter().filter(|e| e.weight.is_some()).count();
        if weighted != 0 && weighted != self.edges.len() {
            return Err(IacError::InvalidGraph(format!(
                "{weighted} of {} edges carry a weight; give all or none",
                self.edges.len()
            )));
        }

        let edges = if self.directed {
            self.edges.iter().map(to_edge).collect()
        } else {
            orient(&self.edges, orientation_seed)
        };

        debug!(
            nodes = self.num_nodes,
            edges = self.edges.len(),
            directed = self.directed,
            "graph document converted"
        );
        Graph::new(self.num_nodes, edges)?
            .with_directed(self.directed)
            .with_attrs(self.attributes)
    }
}

fn to_edge(record: &EdgeRecord) -> Edge {
    Edge::new(record.source, record.target, record.weight.unwrap_or(0.0))
}

fn orient(records: &[EdgeRecord], seed: u64) -> Vec<Edge> {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut seen = HashSet::with_capacity(records.len());
    let mut edges = Vec::with_capacity(records.len());
    for record in records {
        let key = (record.source.min(record.target), record.source.max(record.target));
        if !seen.insert(key) {
            continue;
        }
        let mut edge = to_edge(record);
        if rng.gen_bool(0.5) {
            std::mem::swap(&mut edge.u, &mut edge.v);
        }
        edges.push(edge);
    }
    edges
}

/// Source of graphs for a named dataset.
pub trait GraphProvider {
    fn load(&self, dataset: &str) -> anyhow::Result<Graph>;

    /// Layers of a multiplex dataset, all over the same node set.
    fn load_layers(&self, dataset: &str) -> anyhow::Result<Vec<Graph>>;

    fn ground_truth(&self, dataset: &str) -> anyhow::Result<Option<Vec<usize>>>;
}

/// Reads JSON graph documents from a directory.
#[derive(Clone, Debug)]
pub struct JsonGraphProvider {
    root: PathBuf,
    orientation_seed: u64,
}

impl JsonGraphProvider {
    pub fn new(root: impl Into<PathBuf>, orientation_seed: u64) -> Self {
        Self {
            root: root.into(),
            orientation_seed,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_document(&self, path: &Path, seed: u64) -> anyhow::Result<Graph> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading graph {}", path.display()))?;
        let doc: GraphDocument = serde_json::from_str(&json)
            .with_context(|| format!("parsing graph {}", path.display()))?;
        let graph = doc
            .into_graph(seed)
            .with_context(|| format!("building graph {}", path.display()))?;
        Ok(graph)
    }
}

impl GraphProvider for JsonGraphProvider {
    fn load(&self, dataset: &str) -> anyhow::Result<Graph> {
        let path = self.root.join(format!("{dataset}.json"));
        let graph = self.read_document(&path, self.orientation_seed)?;
        info!(
            dataset,
            nodes = graph.num_nodes(),
            edges = graph.num_edges(),
            "graph loaded"
        );
        Ok(graph)
    }

    fn load_layers(&self, dataset: &str) -> anyhow::Result<Vec<Graph>> {
        let path = self.root.join(format!("{dataset}.layers.json"));
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("reading layer manifest {}", path.display()))?;
        let manifest: LayerManifest = serde_json::from_str(&json)
            .with_context(|| format!("parsing layer manifest {}", path.display()))?;
        if manifest.layers.is_empty() {
            bail!("layer manifest {} lists no layers", path.display());
        }

        let base = path.parent().unwrap_or(&self.root);
        let layers = manifest
            .layers
            .iter()
            .enumerate()
            .map(|(i, rel)| {
                let seed = self.orientation_seed.wrapping_add(i as u64);
                self.read_document(&base.join(rel), seed)
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        info!(dataset, layers = layers.len(), "layers loaded");
        Ok(layers)
    }

    fn ground_truth(&self, dataset: &str) -> anyhow::Result<Option<Vec<usize>>> {
        let path = self.root.join(format!("{dataset}.truth"));
        if !path.exists() {
            return Ok(None);
        }
        load_ground_truth(&path).map(Some)
    }
}

/// Labels, one non-negative integer per line; blank lines are skipped.
pub fn load_ground_truth(path: &Path) -> anyhow::Result<Vec<usize>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading ground truth {}", path.display()))?;
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            line.trim()
                .parse::<usize>()
                .with_context(|| format!("{}:{}: bad label {line:?}", path.display(), i + 1))
        })
        .collect()
}
